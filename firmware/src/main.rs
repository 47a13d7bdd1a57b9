//! Kibo split keyboard firmware for ATmega32U4 (Teensy 2.0).
//!
//! Build with the `primary` feature (default) for the left half, which
//! enumerates as a USB boot keyboard and receives the right half's
//! keypresses over USART1. Build with `--no-default-features --features
//! secondary` for the right half, which only forwards its keypresses.

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

#[cfg(all(feature = "primary", feature = "secondary"))]
compile_error!("enable exactly one of the `primary` and `secondary` features");

#[cfg(not(any(feature = "primary", feature = "secondary")))]
compile_error!("no role selected: enable the `primary` or `secondary` feature");

mod delay;
#[cfg(not(feature = "secondary"))]
mod hid;
mod pins;
mod uart;

use avr_device::atmega32u4::Peripherals;
use embedded_hal::delay::DelayNs;
use kibo_core::config::FRAME_DELAY_MS;
use kibo_core::{Half, KeyMap, KeyboardState, SplitLink};

use delay::BusyDelay;
use pins::{DirectPins, StatusLed};
use uart::Uart;

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Fuses already select 16 MHz; make sure the prescaler is 1.
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    let mut led = StatusLed::new(&dp.PORTD);
    let link = SplitLink::new(Uart::new(&dp.USART1));

    #[cfg(feature = "secondary")]
    run_secondary(&dp, link, &mut led);

    #[cfg(not(feature = "secondary"))]
    run_primary(&dp, link, &mut led);
}

#[cfg(not(feature = "secondary"))]
fn run_primary(dp: &Peripherals, mut link: SplitLink<Uart<'_>>, led: &mut StatusLed<'_>) -> ! {
    use embedded_hal::digital::StatefulOutputPin;
    use kibo_core::config::BLINK_NOT_MOUNTED_MS;
    use kibo_core::timer::Cooldown;
    use kibo_core::ReportEmitter;

    let mut inputs = DirectPins::new(dp, Half::Left);
    let mut keyboard = KeyboardState::new(Half::Left, &KeyMap::DEFAULT);

    let mut usb = hid::UsbKeyboard::new(&dp.USB_DEVICE);
    usb.init(&dp.PLL);
    let mut emitter = ReportEmitter::new(usb, BusyDelay::new());
    let mut blink = Cooldown::new(BLINK_NOT_MOUNTED_MS);

    loop {
        keyboard.tick_primary(&mut inputs, &mut emitter, &mut link, led);

        if !emitter.hid().is_configured() && blink.update(emitter.delay_mut().millis()) {
            led.toggle().ok();
        }

        emitter.delay_mut().delay_ms(FRAME_DELAY_MS);
    }
}

#[cfg(feature = "secondary")]
fn run_secondary(dp: &Peripherals, mut link: SplitLink<Uart<'_>>, led: &mut StatusLed<'_>) -> ! {
    let mut inputs = DirectPins::new(dp, Half::Right);
    let mut keyboard = KeyboardState::new(Half::Right, &KeyMap::DEFAULT);
    let mut delay = BusyDelay::new();

    loop {
        keyboard.tick_secondary(&mut inputs, &mut link, led);
        delay.delay_ms(FRAME_DELAY_MS);
    }
}
