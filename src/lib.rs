//! Cosmic Crush - a reactive particle arcade core
//!
//! Core modules:
//! - `sim`: Simulation (particles, gravity wells, fatigue, combos, progression, hazards)
//! - `session`: Session controller that owns every sim component
//! - `clock`: Injectable clock, fixed-period intervals and scheduled effects
//! - `renderer`: Draw primitives handed to an external 2D surface
//! - `persistence`: Wallet load/save through a key-value store
//! - `tuning`: Data-driven game balance

pub mod clock;
pub mod console;
pub mod persistence;
pub mod renderer;
pub mod session;
pub mod sim;
pub mod tuning;

pub use clock::{Clock, ManualClock, SystemClock};
pub use persistence::{MemoryStore, Store, Wallet};
pub use session::{GameEvent, Session, SessionPhase, SessionSummary};
pub use tuning::GameConfig;

use glam::Vec2;

/// Engine constants
pub mod consts {
    /// Fixed frame step (physics constants are tuned per 60 Hz frame)
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Maximum frame steps per update to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Depth range of ambient particles
    pub const PERSPECTIVE: f32 = 500.0;
    /// Focal length of the perspective projection
    pub const FOCAL_LENGTH: f32 = 500.0;

    /// Session timer / hazard ticker period
    pub const SECOND_MS: u64 = 1000;
    /// Cooldown decay ticker period
    pub const DECAY_TICK_MS: u64 = 100;
}

/// Screen-space play area, origin at top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Half-diagonal, the furthest any point can be from the center
    #[inline]
    pub fn half_diagonal(&self) -> f32 {
        self.center().length()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Millisecond timestamp on the session clock
pub type Millis = u64;
