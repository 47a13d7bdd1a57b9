//! Per-switch debounce logic.
//!
//! Each switch has an activation level that climbs by one per frame while the
//! raw input is asserted and falls by one per frame while it is not, clamped
//! to `[RELEASED_THRESHOLD, PRESSED_THRESHOLD]`. The level is compared against
//! four ordered thresholds to drive a small state machine:
//!
//! ```text
//!   Released --(level >= DOWN)--> Down --(level >= PRESSED)--> Pressed
//!      ^                                                         |
//!      +--(level <= RELEASED)-- Up <--------(level <= UP)--------+
//! ```
//!
//! `Down` and `Up` are edges: each is handed out once through
//! [`Debouncer::is_down_edge`] / [`Debouncer::is_up_edge`].

use crate::config::{
    DOWN_THRESHOLD, PRESSED_THRESHOLD, RELEASED_THRESHOLD, SWITCH_COUNT, UP_THRESHOLD,
};
use crate::switch::SwitchIndex;

/// Debounced state of one switch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SwitchState {
    /// Release held.
    Released,
    /// Release detected.
    Up,
    /// Press detected.
    Down,
    /// Press held.
    Pressed,
}

#[derive(Copy, Clone)]
struct Switch {
    level: u8,
    state: SwitchState,
    /// Set once the current `Down`/`Up` edge has been handed out.
    consumed: bool,
}

impl Switch {
    const fn new() -> Self {
        Self {
            level: RELEASED_THRESHOLD,
            state: SwitchState::Released,
            consumed: false,
        }
    }

    fn step(&mut self, raw_pressed: bool) {
        self.level = if raw_pressed {
            self.level.saturating_add(1).min(PRESSED_THRESHOLD)
        } else {
            self.level.saturating_sub(1).max(RELEASED_THRESHOLD)
        };
    }

    fn transition(&mut self) {
        use SwitchState::*;

        let next = match self.state {
            Released | Up if self.level >= DOWN_THRESHOLD => Down,
            Down if self.level >= PRESSED_THRESHOLD => Pressed,
            Down | Pressed if self.level <= UP_THRESHOLD => Up,
            Up if self.level <= RELEASED_THRESHOLD => Released,
            _ => return,
        };

        self.state = next;
        self.consumed = false;
    }

    fn take_edge(&mut self, edge: SwitchState) -> bool {
        if self.state == edge && !self.consumed {
            self.consumed = true;
            true
        } else {
            false
        }
    }
}

pub struct Debouncer {
    switches: [Switch; SWITCH_COUNT],
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            switches: [Switch::new(); SWITCH_COUNT],
        }
    }

    /// Feed one raw sample. Call exactly once per switch per frame.
    pub fn update(&mut self, switch: SwitchIndex, raw_pressed: bool) {
        let s = &mut self.switches[switch.as_usize()];
        s.step(raw_pressed);
        s.transition();
    }

    /// True once per `Down` transition; the first caller consumes it.
    pub fn is_down_edge(&mut self, switch: SwitchIndex) -> bool {
        self.switches[switch.as_usize()].take_edge(SwitchState::Down)
    }

    /// True once per `Up` transition; the first caller consumes it.
    pub fn is_up_edge(&mut self, switch: SwitchIndex) -> bool {
        self.switches[switch.as_usize()].take_edge(SwitchState::Up)
    }

    pub fn is_held(&self, switch: SwitchIndex) -> bool {
        self.state(switch) == SwitchState::Pressed
    }

    pub fn is_released_level(&self, switch: SwitchIndex) -> bool {
        self.state(switch) == SwitchState::Released
    }

    pub fn state(&self, switch: SwitchIndex) -> SwitchState {
        self.switches[switch.as_usize()].state
    }

    pub fn level(&self, switch: SwitchIndex) -> u8 {
        self.switches[switch.as_usize()].level
    }
}
