//! Input handling.
//!
//! Keys are sampled by whatever front end drives the scenes (the console
//! binary maps commands to keys). Only lane changes are wired to actions.

use race_shared::net::InputAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
}

impl Key {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" => Some(Key::Left),
            "right" => Some(Key::Right),
            "up" => Some(Key::Up),
            "down" => Some(Key::Down),
            "space" => Some(Key::Space),
            _ => None,
        }
    }
}

/// Action bound to a freshly pressed key.
pub fn action_for_key(key: Key) -> Option<InputAction> {
    match key {
        Key::Left => Some(InputAction::TurnLeft),
        Key::Right => Some(InputAction::TurnRight),
        Key::Up | Key::Down | Key::Space => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lane_changes_are_bound() {
        assert_eq!(action_for_key(Key::Left), Some(InputAction::TurnLeft));
        assert_eq!(action_for_key(Key::Right), Some(InputAction::TurnRight));
        assert_eq!(action_for_key(Key::Up), None);
        assert_eq!(Key::from_name("RIGHT"), Some(Key::Right));
        assert_eq!(Key::from_name("jump"), None);
    }
}
