//! Input-processing core of the Kibo split keyboard.
//!
//! This crate is `no_std` so the same code runs on the firmware and in the
//! host tools:
//! - per-switch debouncing into level states and one-shot edges
//! - a two-layer keymap with a toggle key
//! - HID taps (press report, cooldown, empty report, cooldown)
//! - the one-byte-per-keypress link between the two halves

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod debounce;
pub mod keyboard;
pub mod keycode;
pub mod keymap;
pub mod link;
pub mod report;
pub mod switch;
pub mod timer;

#[cfg(test)]
mod testing;

pub use keyboard::{KeyboardState, SwitchInputs};
pub use keycode::Keycode;
pub use keymap::{Chord, KeyBinding, KeyMap, Layer};
pub use link::SplitLink;
pub use report::{HidTransport, KeyboardReport, ReportEmitter};
pub use switch::{Half, SwitchIndex};
