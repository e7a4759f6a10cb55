//! Gravity wells
//!
//! A well drifts around the play area, bouncing off its edges, pulls ambient
//! particles inside three radii, and annihilates anything that crosses its
//! event horizon.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Viewport;

/// Pull reaches this many radii from the center
pub const PULL_RADIUS_FACTOR: f32 = 3.0;
/// Peak inward acceleration per frame at the horizon edge
pub const PULL_STRENGTH: f32 = 0.2;
/// Velocity added per nudge
pub const NUDGE_STRENGTH: f32 = 0.2;
/// Per-axis velocity cap after a nudge
pub const MAX_NUDGE_VELOCITY: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityWell {
    pub pos: Vec2,
    /// Event-horizon radius
    pub radius: f32,
    pub vel: Vec2,
}

impl GravityWell {
    pub fn new(pos: Vec2, radius: f32, vel: Vec2) -> Self {
        Self { pos, radius, vel }
    }

    /// Centered well with a small random drift
    pub fn centered<R: Rng>(rng: &mut R, viewport: &Viewport, radius: f32) -> Self {
        Self::new(viewport.center(), radius, random_drift(rng))
    }

    /// Well placed uniformly inside the viewport (fully on screen)
    pub fn random<R: Rng>(rng: &mut R, viewport: &Viewport, radius: f32) -> Self {
        let span_x = (viewport.width - 2.0 * radius).max(0.0);
        let span_y = (viewport.height - 2.0 * radius).max(0.0);
        let pos = Vec2::new(
            radius + rng.random::<f32>() * span_x,
            radius + rng.random::<f32>() * span_y,
        );
        Self::new(pos, radius, random_drift(rng))
    }

    #[inline]
    pub fn pull_radius(&self) -> f32 {
        self.radius * PULL_RADIUS_FACTOR
    }

    /// True when `point` is strictly inside the event horizon
    #[inline]
    pub fn swallows(&self, point: Vec2) -> bool {
        self.pos.distance_squared(point) < self.radius * self.radius
    }

    /// Inward acceleration for a particle at `point`, zero outside the pull radius
    /// or inside the horizon
    pub fn pull_at(&self, point: Vec2) -> Vec2 {
        let delta = self.pos - point;
        let dist_sq = delta.length_squared();
        let pull = self.pull_radius();
        if dist_sq >= pull * pull || dist_sq < self.radius * self.radius {
            return Vec2::ZERO;
        }
        let dist = dist_sq.sqrt();
        let force = (1.0 - dist / pull) * PULL_STRENGTH;
        delta / dist * force
    }

    /// Move one frame; reflect off the viewport edges keeping the disc inside
    pub fn advance(&mut self, viewport: &Viewport) {
        self.pos += self.vel;

        if self.pos.x - self.radius < 0.0 {
            self.pos.x = self.radius;
            self.vel.x = -self.vel.x;
        } else if self.pos.x + self.radius > viewport.width {
            self.pos.x = viewport.width - self.radius;
            self.vel.x = -self.vel.x;
        }
        if self.pos.y - self.radius < 0.0 {
            self.pos.y = self.radius;
            self.vel.y = -self.vel.y;
        } else if self.pos.y + self.radius > viewport.height {
            self.pos.y = viewport.height - self.radius;
            self.vel.y = -self.vel.y;
        }
    }

    /// Impulse toward `target`, velocity clamped per axis
    pub fn nudge(&mut self, target: Vec2) {
        let delta = target - self.pos;
        let dist = delta.length();
        if dist > 1.0 {
            self.vel += delta / dist * NUDGE_STRENGTH;
            self.vel = self
                .vel
                .clamp(Vec2::splat(-MAX_NUDGE_VELOCITY), Vec2::splat(MAX_NUDGE_VELOCITY));
        }
    }
}

fn random_drift<R: Rng>(rng: &mut R) -> Vec2 {
    Vec2::new(
        (rng.random::<f32>() - 0.5) * 2.0,
        (rng.random::<f32>() - 0.5) * 2.0,
    )
}
