//! USB HID keycodes.
//! See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07).

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Keycode {
    // Letters
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    // Numbers
    N1 = 0x1E,
    N2 = 0x1F,
    N3 = 0x20,
    N4 = 0x21,
    N5 = 0x22,
    N6 = 0x23,
    N7 = 0x24,
    N8 = 0x25,
    N9 = 0x26,
    N0 = 0x27,

    // Control and punctuation
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    LBracket = 0x2F,
    RBracket = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Grave = 0x35,
    Comma = 0x36,
    Dot = 0x37,
    Slash = 0x38,

    // Navigation
    Delete = 0x4C,
    Home = 0x4A,
    End = 0x4D,
    PageUp = 0x4B,
    PageDown = 0x4E,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    // Modifiers. These travel in the report's modifier byte.
    LCtrl = 0xE0,
    LShift = 0xE1,
    LAlt = 0xE2,
    LGui = 0xE3,
    RCtrl = 0xE4,
    RShift = 0xE5,
    RAlt = 0xE6,
    RGui = 0xE7,
}

impl Keycode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn is_modifier(self) -> bool {
        matches!(self as u8, 0xE0..=0xE7)
    }

    /// Bit in the report's modifier byte (bit 0 = LCtrl, bit 7 = RGui), or 0.
    pub const fn modifier_bit(self) -> u8 {
        if self.is_modifier() {
            1 << (self as u8 - 0xE0)
        } else {
            0
        }
    }

    /// Short label for layout renderings.
    pub fn display_name(self) -> &'static str {
        use Keycode::*;

        match self {
            A => "A",
            B => "B",
            C => "C",
            D => "D",
            E => "E",
            F => "F",
            G => "G",
            H => "H",
            I => "I",
            J => "J",
            K => "K",
            L => "L",
            M => "M",
            N => "N",
            O => "O",
            P => "P",
            Q => "Q",
            R => "R",
            S => "S",
            T => "T",
            U => "U",
            V => "V",
            W => "W",
            X => "X",
            Y => "Y",
            Z => "Z",
            N1 => "1",
            N2 => "2",
            N3 => "3",
            N4 => "4",
            N5 => "5",
            N6 => "6",
            N7 => "7",
            N8 => "8",
            N9 => "9",
            N0 => "0",
            Enter => "Ent",
            Escape => "Esc",
            Backspace => "Bksp",
            Tab => "Tab",
            Space => "Spc",
            Minus => "-",
            Equal => "=",
            LBracket => "[",
            RBracket => "]",
            Backslash => "\\",
            Semicolon => ";",
            Quote => "'",
            Grave => "`",
            Comma => ",",
            Dot => ".",
            Slash => "/",
            Delete => "Del",
            Home => "Home",
            End => "End",
            PageUp => "PgUp",
            PageDown => "PgDn",
            Right => "\u{2192}",
            Left => "\u{2190}",
            Down => "\u{2193}",
            Up => "\u{2191}",
            LCtrl => "Ctrl",
            LShift => "Shft",
            LAlt => "Alt",
            LGui => "Gui",
            RCtrl => "RCtl",
            RShift => "RSft",
            RAlt => "RAlt",
            RGui => "RGui",
        }
    }
}
