//! Native input as seen by the controllers.

use serde::Serialize;

/// A keyboard key, parsed from the DOM `KeyboardEvent.key` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    Home,
    End,
    Enter,
    Escape,
    Backspace,
    Space,
    /// A single printable character.
    Char(char),
    Other(String),
}

impl Key {
    pub fn parse(key: &str) -> Self {
        match key {
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Home" => Self::Home,
            "End" => Self::End,
            "Enter" => Self::Enter,
            "Escape" => Self::Escape,
            "Backspace" => Self::Backspace,
            " " => Self::Space,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Other(other.to_owned()),
                }
            }
        }
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

/// Pointer button, from `PointerEvent.button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Auxiliary,
    Secondary,
    Other,
}

impl PointerButton {
    pub fn from_dom(button: i16) -> Self {
        match button {
            0 => Self::Primary,
            1 => Self::Auxiliary,
            2 => Self::Secondary,
            _ => Self::Other,
        }
    }
}

/// A pointer event position in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub button: PointerButton,
    pub x: f64,
    pub y: f64,
}

impl PointerInput {
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            button: PointerButton::Primary,
            x,
            y,
        }
    }
}

/// What the host should do with the native event after a controller
/// handled it. Decided before the custom event is offered to listeners,
/// so browser defaults (page scroll on arrow keys) are suppressed even
/// when a listener vetoes the widget behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeAction {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl NativeAction {
    pub const NONE: Self = Self {
        prevent_default: false,
        stop_propagation: false,
    };

    pub const STOP: Self = Self {
        prevent_default: false,
        stop_propagation: true,
    };

    pub const CONSUME: Self = Self {
        prevent_default: true,
        stop_propagation: true,
    };

    pub fn prevent(mut self) -> Self {
        self.prevent_default = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_from_dom_names() {
        assert_eq!(Key::parse("ArrowDown"), Key::ArrowDown);
        assert_eq!(Key::parse(" "), Key::Space);
        assert_eq!(Key::parse("q"), Key::Char('q'));
        assert_eq!(Key::parse("é"), Key::Char('é'));
        assert_eq!(Key::parse("F5"), Key::Other("F5".into()));
    }

    #[test]
    fn buttons_map_from_dom() {
        assert_eq!(PointerButton::from_dom(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_dom(2), PointerButton::Secondary);
        assert_eq!(PointerButton::from_dom(7), PointerButton::Other);
    }
}
