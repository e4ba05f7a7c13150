use std::fmt;

macro_rules! named_keys {
    ($($name:ident),* $(,)?) => {
        /// Keyboard key identifier.
        ///
        /// Named keys have a dense index (`Key::index`) so they can live in a
        /// bitset such as `KeySet`. Platform keys without a name map to
        /// `Key::Unknown` with the platform code.
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub enum Key {
            $($name,)*
            /// Platform-dependent key not represented above.
            Unknown(u32),
        }

        #[allow(dead_code)]
        #[repr(usize)]
        enum KeyIndex {
            $($name,)*
            Count,
        }

        impl Key {
            /// Every named key, ordered by index.
            pub const ALL: &'static [Key] = &[$(Key::$name),*];

            /// Number of named keys.
            pub const COUNT: usize = KeyIndex::Count as usize;

            /// Dense index in `0..Key::COUNT`; `None` for `Key::Unknown`.
            #[inline]
            pub fn index(self) -> Option<usize> {
                match self {
                    $(Key::$name => Some(KeyIndex::$name as usize),)*
                    Key::Unknown(_) => None,
                }
            }

            #[inline]
            pub fn from_index(index: usize) -> Option<Key> {
                Key::ALL.get(index).copied()
            }
        }
    };
}

named_keys! {
    Escape, Enter, Tab, Backspace, Space,
    Insert, Delete, Home, End, PageUp, PageDown,
    ArrowUp, ArrowDown, ArrowLeft, ArrowRight,
    Shift, Control, Alt, Meta,
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,
    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseButtonState {
    Pressed,
    Released,
}

/// Modifier keys state.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Mouse wheel delta.
///
/// `Line` is notched-wheel input; `Pixel` is high precision (touchpads), in logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f32, y: f32 },
}

/// Pointer move event in logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerMoveEvent {
    pub x: f32,
    pub y: f32,
}

/// Pointer button event, with the pointer position at the time of the press.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerButtonEvent {
    pub button: MouseButton,
    pub state: MouseButtonState,
    pub x: f32,
    pub y: f32,
    pub modifiers: Modifiers,
}

/// Platform-agnostic input events emitted by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    ModifiersChanged(Modifiers),

    Key {
        key: Key,
        state: KeyState,
        modifiers: Modifiers,
        /// Platform key code when available.
        code: u32,
        repeat: bool,
    },

    PointerMoved(PointerMoveEvent),
    PointerButton(PointerButtonEvent),

    MouseWheel {
        delta: MouseWheelDelta,
        modifiers: Modifiers,
    },

    /// Window client area resized, in logical pixels.
    Resized { width: f32, height: f32 },

    /// Physical pixels per logical pixel changed (window moved to another monitor).
    ScaleFactorChanged(f64),

    /// Pointer left the window surface.
    PointerLeft,

    /// Window focus change.
    Focused(bool),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Unknown(code) => write!(f, "Unknown({code:#x})"),
            named => write!(f, "{named:?}"),
        }
    }
}
