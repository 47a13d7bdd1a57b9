//! Keymap definitions and layer management.
//!
//! Every switch has a binding on every layer of both halves, so lookup is a
//! plain table index. A binding is either a short chord of HID keycodes
//! (modifier plus key, for example) or the layer toggle.

use crate::config::{LAYER_COUNT, SWITCH_COUNT};
use crate::keycode::Keycode;
use crate::keycode::Keycode as K;
use crate::switch::{Half, SwitchIndex};

/// Maximum number of keycodes in one binding, the report's key slot count.
pub const MAX_CHORD: usize = 6;

/// Index of a keymap layer, always `< LAYER_COUNT`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Layer(u8);

impl Layer {
    pub const BASE: Layer = Layer(0);

    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < LAYER_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// The layer the toggle key switches to from this one.
    pub const fn next(self) -> Self {
        Self((self.0 + 1) % LAYER_COUNT as u8)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An ordered set of 1 to `MAX_CHORD` keycodes sent in a single report.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Chord {
    codes: [Keycode; MAX_CHORD],
    len: u8,
}

impl Chord {
    /// Panics (at compile time for keymap tables) on an empty or oversized
    /// chord.
    pub const fn new(keys: &[Keycode]) -> Self {
        assert!(!keys.is_empty() && keys.len() <= MAX_CHORD);

        let mut codes = [keys[0]; MAX_CHORD];
        let mut i = 0;
        while i < keys.len() {
            codes[i] = keys[i];
            i += 1;
        }

        Self {
            codes,
            len: keys.len() as u8,
        }
    }

    pub fn keys(&self) -> &[Keycode] {
        &self.codes[..self.len as usize]
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyBinding {
    Chord(Chord),
    /// Advance to the next layer. Never sent to the host.
    LayerToggle,
}

impl KeyBinding {
    pub const fn key(keycode: Keycode) -> Self {
        Self::Chord(Chord::new(&[keycode]))
    }

    pub const fn shifted(keycode: Keycode) -> Self {
        Self::Chord(Chord::new(&[Keycode::LShift, keycode]))
    }

    pub const fn chord(keys: &[Keycode]) -> Self {
        Self::Chord(Chord::new(keys))
    }
}

/// Bindings of one half: `[layer][switch]`.
pub type HalfMap = [[KeyBinding; SWITCH_COUNT]; LAYER_COUNT];

pub struct KeyMap {
    left: HalfMap,
    right: HalfMap,
}

impl KeyMap {
    pub const fn new(left: HalfMap, right: HalfMap) -> Self {
        Self { left, right }
    }

    pub fn resolve(&self, half: Half, layer: Layer, switch: SwitchIndex) -> KeyBinding {
        let table = match half {
            Half::Left => &self.left,
            Half::Right => &self.right,
        };
        table[layer.index()][switch.as_usize()]
    }

    pub const DEFAULT: KeyMap = KeyMap::new(LEFT, RIGHT);
}

// Shorthand for the tables below.
const fn k(keycode: Keycode) -> KeyBinding {
    KeyBinding::key(keycode)
}

const fn s(keycode: Keycode) -> KeyBinding {
    KeyBinding::shifted(keycode)
}

const LT: KeyBinding = KeyBinding::LayerToggle;

/// Left half, Colemak. Switch order follows the wiring:
///   0-5 top row (outer to inner), 6-11 home row, 12-16 bottom row,
///   17-19 thumb cluster.
/// Indices keep the RP2040 hand-wired numbering, GPIO minus 2 (GP0/GP1
/// carry the link), so Q on GP3 is switch 1, not 3. `firmware/src/pins.rs`
/// maps the same indices onto Teensy pins.
///
/// Layer 0: base
/// Layer 1: shifted
#[rustfmt::skip]
const LEFT: HalfMap = [
    [
        k(K::Tab), k(K::Q), k(K::W), k(K::F), k(K::P), k(K::B),
        k(K::Escape), k(K::A), k(K::R), k(K::S), k(K::T), k(K::G),
        k(K::Z), k(K::X), k(K::C), k(K::D), k(K::V),
        LT, k(K::Backspace), k(K::Space),
    ],
    [
        s(K::Tab), s(K::Q), s(K::W), s(K::F), s(K::P), s(K::B),
        k(K::Escape), s(K::A), s(K::R), s(K::S), s(K::T), s(K::G),
        s(K::Z), s(K::X), s(K::C), s(K::D), s(K::V),
        LT, k(K::Delete), k(K::Space),
    ],
];

/// Right half, Colemak. Switch order mirrors the left half:
///   0-5 top row (inner to outer), 6-11 home row, 12-16 bottom row,
///   17-19 thumb cluster.
#[rustfmt::skip]
const RIGHT: HalfMap = [
    [
        k(K::J), k(K::L), k(K::U), k(K::Y), k(K::Semicolon), k(K::Minus),
        k(K::M), k(K::N), k(K::E), k(K::I), k(K::O), k(K::Quote),
        k(K::K), k(K::H), k(K::Comma), k(K::Dot), k(K::Slash),
        k(K::Space), k(K::Enter), LT,
    ],
    [
        s(K::J), s(K::L), s(K::U), s(K::Y), s(K::Semicolon), s(K::Minus),
        s(K::M), s(K::N), s(K::E), s(K::I), s(K::O), s(K::Quote),
        s(K::K), s(K::H), s(K::Comma), s(K::Dot), s(K::Slash),
        k(K::Space), KeyBinding::chord(&[K::LCtrl, K::Enter]), LT,
    ],
];
