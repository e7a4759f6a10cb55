//! Raw input events and key normalisation

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::persistence::Booster;

/// Modifier flags carried by a key event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    KeyDown { key: String, modifiers: Modifiers },
    KeyUp { key: String, modifiers: Modifiers },
    PointerDown { pos: Vec2 },
    /// Every touch point currently on the surface
    TouchStart { touches: Vec<Vec2> },
    /// Touch points still down after the release
    TouchEnd { touches: Vec<Vec2> },
}

impl InputEvent {
    pub fn key_down(key: &str) -> Self {
        Self::KeyDown {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key_up(key: &str) -> Self {
        Self::KeyUp {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }
}

/// What a key press means to the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Game identifier, always a lowercase letter
    Letter(String),
    Activate(Command),
    /// Digit or other key with no binding; consumed silently
    Swallowed,
    /// Modifier held or pressed; no scoring, no propagation
    Suppressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Booster(Booster),
    Ultimate,
}

const MODIFIER_KEYS: [&str; 6] = ["meta", "shift", "alt", "control", "tab", "capslock"];

pub fn normalize_key(key: &str, modifiers: Modifiers) -> KeyAction {
    let key = key.to_lowercase();
    if modifiers.any() || MODIFIER_KEYS.contains(&key.as_str()) {
        return KeyAction::Suppressed;
    }
    match key.as_str() {
        "enter" | "1" => KeyAction::Activate(Command::Booster(Booster::Crush)),
        "2" => KeyAction::Activate(Command::Booster(Booster::Time)),
        "3" => KeyAction::Activate(Command::Ultimate),
        k if k.len() == 1 && k.bytes().all(|b| b.is_ascii_lowercase()) => KeyAction::Letter(key),
        _ => KeyAction::Swallowed,
    }
}
