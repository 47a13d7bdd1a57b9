//! Busy-wait delays at 16 MHz, with an elapsed-time counter.
//!
//! The poll loop never sleeps anywhere else, so the time spent in here is a
//! good enough millisecond clock for the status LED.

use embedded_hal::delay::DelayNs;

/// Loop iterations per microsecond (about 4 cycles each).
const SPINS_PER_US: u16 = 4;

#[derive(Default)]
pub struct BusyDelay {
    elapsed_ms: u32,
    elapsed_ns: u32,
}

impl BusyDelay {
    pub const fn new() -> Self {
        Self {
            elapsed_ms: 0,
            elapsed_ns: 0,
        }
    }

    /// Milliseconds spent in this delay since boot, wrapping.
    pub fn millis(&self) -> u32 {
        self.elapsed_ms
    }
}

impl DelayNs for BusyDelay {
    fn delay_ns(&mut self, ns: u32) {
        for _ in 0..ns.div_ceil(1000) {
            spin(SPINS_PER_US);
        }

        self.elapsed_ns += ns % 1_000_000;
        self.elapsed_ms = self
            .elapsed_ms
            .wrapping_add(ns / 1_000_000 + self.elapsed_ns / 1_000_000);
        self.elapsed_ns %= 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            spin(1000 * SPINS_PER_US);
        }
        self.elapsed_ms = self.elapsed_ms.wrapping_add(ms);
    }
}

#[inline(always)]
fn spin(iterations: u16) {
    for _ in 0..iterations {
        unsafe { core::arch::asm!("nop") };
    }
}
