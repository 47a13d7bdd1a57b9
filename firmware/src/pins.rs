//! Direct-wired switches and the status LED.
//!
//! Every switch has its own GPIO with the internal pull-up enabled and
//! connects it to ground when closed, so a low pin reads as asserted.
//! PD2/PD3 are reserved for the split link (USART1) and PD6 drives the
//! Teensy's on-board LED.

use avr_device::atmega32u4::{Peripherals, PORTD};
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use kibo_core::config::SWITCH_COUNT;
use kibo_core::{Half, SwitchIndex, SwitchInputs};

#[derive(Copy, Clone)]
enum Port {
    B,
    C,
    D,
    E,
    F,
}

#[derive(Copy, Clone)]
struct Pin {
    port: Port,
    bit: u8,
}

const fn pin(port: Port, bit: u8) -> Pin {
    Pin { port, bit }
}

use Port::{B, C, D, E, F};

/// Left half, in switch index order (see the keymap for the physical layout).
#[rustfmt::skip]
const LEFT_PINS: [Pin; SWITCH_COUNT] = [
    pin(B, 0), pin(B, 1), pin(B, 2), pin(B, 3), pin(B, 7), pin(D, 0),
    pin(F, 0), pin(F, 1), pin(F, 4), pin(F, 5), pin(F, 6), pin(F, 7),
    pin(B, 6), pin(B, 5), pin(B, 4), pin(D, 7), pin(D, 4),
    pin(C, 6), pin(C, 7), pin(D, 1),
];

/// Right half. The PCB is mirrored, so rows run inner to outer.
#[rustfmt::skip]
const RIGHT_PINS: [Pin; SWITCH_COUNT] = [
    pin(D, 0), pin(B, 7), pin(B, 3), pin(B, 2), pin(B, 1), pin(B, 0),
    pin(F, 7), pin(F, 6), pin(F, 5), pin(F, 4), pin(F, 1), pin(F, 0),
    pin(D, 4), pin(D, 7), pin(B, 4), pin(B, 5), pin(B, 6),
    pin(D, 1), pin(C, 7), pin(E, 6),
];

pub struct DirectPins<'a> {
    dp: &'a Peripherals,
    pins: &'static [Pin; SWITCH_COUNT],
}

impl<'a> DirectPins<'a> {
    /// Configure every switch pin of `half` as an input with pull-up.
    pub fn new(dp: &'a Peripherals, half: Half) -> Self {
        let pins = match half {
            Half::Left => &LEFT_PINS,
            Half::Right => &RIGHT_PINS,
        };

        for p in pins {
            let mask = 1u8 << p.bit;
            match p.port {
                Port::B => {
                    dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
                    dp.PORTB.portb.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
                }
                Port::C => {
                    dp.PORTC.ddrc.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
                    dp.PORTC.portc.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
                }
                Port::D => {
                    dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
                    dp.PORTD.portd.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
                }
                Port::E => {
                    dp.PORTE.ddre.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
                    dp.PORTE.porte.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
                }
                Port::F => {
                    dp.PORTF.ddrf.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
                    dp.PORTF.portf.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
                }
            }
        }

        Self { dp, pins }
    }

    fn read_port(&self, port: Port) -> u8 {
        match port {
            Port::B => self.dp.PORTB.pinb.read().bits(),
            Port::C => self.dp.PORTC.pinc.read().bits(),
            Port::D => self.dp.PORTD.pind.read().bits(),
            Port::E => self.dp.PORTE.pine.read().bits(),
            Port::F => self.dp.PORTF.pinf.read().bits(),
        }
    }
}

impl SwitchInputs for DirectPins<'_> {
    fn is_asserted(&mut self, switch: SwitchIndex) -> bool {
        let p = self.pins[switch.as_usize()];
        self.read_port(p.port) & (1 << p.bit) == 0
    }
}

const LED_MASK: u8 = 1 << 6;

/// On-board LED on PD6, active high.
pub struct StatusLed<'a> {
    port: &'a PORTD,
}

impl<'a> StatusLed<'a> {
    pub fn new(port: &'a PORTD) -> Self {
        port.ddrd.modify(|r, w| unsafe { w.bits(r.bits() | LED_MASK) });
        port.portd.modify(|r, w| unsafe { w.bits(r.bits() & !LED_MASK) });
        Self { port }
    }
}

impl ErrorType for StatusLed<'_> {
    type Error = core::convert::Infallible;
}

impl OutputPin for StatusLed<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.port
            .portd
            .modify(|r, w| unsafe { w.bits(r.bits() & !LED_MASK) });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.port
            .portd
            .modify(|r, w| unsafe { w.bits(r.bits() | LED_MASK) });
        Ok(())
    }
}

impl StatefulOutputPin for StatusLed<'_> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.port.portd.read().bits() & LED_MASK != 0)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.port.portd.read().bits() & LED_MASK == 0)
    }
}
