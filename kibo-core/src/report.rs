//! HID keyboard reports and the tap emitter.
//!
//! Every activation is sent as a discrete tap: a report with the chord's keys,
//! a cooldown, an empty report, and another cooldown. The host never sees a
//! key held down across frames, so holding a switch does not auto-repeat.

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::config::KEY_SEND_COOLDOWN_MS;
use crate::keymap::{Chord, MAX_CHORD};

/// Standard boot keyboard report (8 bytes).
/// Byte 0: modifier keys bitmask
/// Byte 1: reserved (0x00)
/// Bytes 2-7: up to 6 simultaneous keycodes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub reserved: u8,
    pub keys: [u8; MAX_CHORD],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            reserved: 0,
            keys: [0; MAX_CHORD],
        }
    }

    /// Modifiers go to the bitmask; other keys fill the slots in chord order.
    pub fn from_chord(chord: &Chord) -> Self {
        let mut report = Self::empty();
        let mut slot = 0;

        for &kc in chord.keys() {
            if kc.is_modifier() {
                report.modifiers |= kc.modifier_bit();
            } else {
                report.keys[slot] = kc.code();
                slot += 1;
            }
        }

        report
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers == 0 && self.keys.iter().all(|&k| k == 0)
    }

    pub fn as_bytes(&self) -> [u8; 8] {
        let mut bytes = [0; 8];
        bytes[0] = self.modifiers;
        bytes[1] = self.reserved;
        bytes[2..].copy_from_slice(&self.keys);
        bytes
    }
}

/// Device side of the USB HID keyboard endpoint.
pub trait HidTransport {
    /// Run the USB stack's housekeeping (enumeration, control requests).
    /// Must have run since the previous report before the next one is sent.
    fn service(&mut self);

    /// Queue one keyboard report. Successive calls must be at least
    /// `KEY_SEND_COOLDOWN_MS` apart.
    fn send_keyboard_report(&mut self, report: &KeyboardReport);
}

/// Sends chords to the host as press/release report pairs.
pub struct ReportEmitter<H, D> {
    hid: H,
    delay: D,
}

impl<H: HidTransport, D: DelayNs> ReportEmitter<H, D> {
    pub fn new(hid: H, delay: D) -> Self {
        Self { hid, delay }
    }

    /// Blocks for about `2 * KEY_SEND_COOLDOWN_MS`; nothing else runs
    /// between the two reports.
    pub fn emit(&mut self, chord: &Chord) {
        let report = KeyboardReport::from_chord(chord);
        debug!("tap {:02x?} mods {:#04x}", report.keys, report.modifiers);

        self.hid.send_keyboard_report(&report);
        self.delay.delay_ms(KEY_SEND_COOLDOWN_MS);
        self.hid.service();

        self.hid.send_keyboard_report(&KeyboardReport::empty());
        self.delay.delay_ms(KEY_SEND_COOLDOWN_MS);
        self.hid.service();
    }

    pub fn hid(&self) -> &H {
        &self.hid
    }

    pub fn hid_mut(&mut self) -> &mut H {
        &mut self.hid
    }

    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }
}
