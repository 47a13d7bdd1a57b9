//! Switch identity and keyboard halves.

use crate::config::SWITCH_COUNT;

/// Index of a physical switch on one half, always `< SWITCH_COUNT`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwitchIndex(u8);

impl SwitchIndex {
    /// Returns `None` when `index` does not name a switch.
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < SWITCH_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// All switches in scan order.
    pub fn all() -> impl Iterator<Item = SwitchIndex> {
        (0..SWITCH_COUNT as u8).map(SwitchIndex)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// One physical piece of the keyboard.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Half {
    /// Primary half: owns the USB HID endpoint.
    Left,
    /// Secondary half: forwards its activations over the split link.
    Right,
}

impl Half {
    pub const fn other(self) -> Self {
        match self {
            Half::Left => Half::Right,
            Half::Right => Half::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_bounds() {
        assert_eq!(SwitchIndex::new(0).map(SwitchIndex::get), Some(0));
        assert_eq!(
            SwitchIndex::new(SWITCH_COUNT as u8 - 1).map(SwitchIndex::as_usize),
            Some(SWITCH_COUNT - 1)
        );
        assert_eq!(SwitchIndex::new(SWITCH_COUNT as u8), None);
        assert_eq!(SwitchIndex::new(u8::MAX), None);
    }

    #[test]
    fn test_all_in_order() {
        let all: Vec<usize> = SwitchIndex::all().map(SwitchIndex::as_usize).collect();
        assert_eq!(all, (0..SWITCH_COUNT).collect::<Vec<_>>());
    }
}
