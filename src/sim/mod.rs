//! Deterministic simulation module
//!
//! All gameplay state lives here. Every component is driven by explicit
//! timestamps and an injected RNG, never by wall-clock time.

pub mod combo;
pub mod fatigue;
pub mod field;
pub mod hazard;
pub mod input;
pub mod layout;
pub mod particle;
pub mod progression;
pub mod rejection;
pub mod well;

pub use combo::{
    ComboAttempt, ComboDetector, ComboState, PressOutcome, TOUCH_COMBO_ID, TouchOutcome,
};
pub use fatigue::FatigueTracker;
pub use field::ParticleField;
pub use hazard::{DrainHazard, HazardEvent, HazardScheduler};
pub use input::{Command, InputEvent, KeyAction, Modifiers, normalize_key};
pub use layout::KeyLayout;
pub use particle::{FogShape, FogSpot, Particle, Projected, Shape, Stripe};
pub use progression::{Progression, ScoreOutcome, SessionSummary, TimerTick};
pub use rejection::Rejection;
pub use well::GravityWell;
