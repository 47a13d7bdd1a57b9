//! Compile-time configuration shared by the firmware and the host tools.
//!
//! The debounce engine counts frames, not milliseconds: every call to
//! [`Debouncer::update`](crate::debounce::Debouncer::update) moves a switch's
//! activation level by exactly one step. With the 1 ms poll loop a frame is
//! roughly a millisecond, but a frame that emits a report lasts about
//! `2 * KEY_SEND_COOLDOWN_MS` longer, so absolute latency stretches while
//! reports are being sent.

/// Number of switches on one half.
pub const SWITCH_COUNT: usize = 20;

/// Number of keymap layers.
pub const LAYER_COUNT: usize = 2;

/// Activation level (frames) at which a falling switch is fully released.
pub const RELEASED_THRESHOLD: u8 = 0;
/// Activation level (frames) at which a falling switch reports `Up`.
pub const UP_THRESHOLD: u8 = 10;
/// Activation level (frames) at which a rising switch reports `Down`.
pub const DOWN_THRESHOLD: u8 = 20;
/// Activation level (frames) at which a rising switch is held, and the
/// ceiling of the level counter.
pub const PRESSED_THRESHOLD: u8 = 30;

/// Minimum gap between two HID reports, in milliseconds.
pub const KEY_SEND_COOLDOWN_MS: u32 = 4;

/// Delay at the end of every poll loop frame, in milliseconds.
pub const FRAME_DELAY_MS: u32 = 1;

/// Split link serial speed.
pub const LINK_BAUD_RATE: u32 = 115_200;

/// Status LED blink interval while the USB device is not configured.
pub const BLINK_NOT_MOUNTED_MS: u32 = 250;

const _: () = assert!(RELEASED_THRESHOLD < UP_THRESHOLD);
const _: () = assert!(UP_THRESHOLD < DOWN_THRESHOLD);
const _: () = assert!(DOWN_THRESHOLD < PRESSED_THRESHOLD);
// Link messages carry the switch index in one byte.
const _: () = assert!(SWITCH_COUNT <= u8::MAX as usize + 1);
