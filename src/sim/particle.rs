//! Particle and decoration entities
//!
//! Particles live in screen space (x, y) with a depth `z`. A particle whose
//! depth velocity is zero is *ambient*; anything else is an *explosion*
//! particle. Decorations (fog spots, stripes) are visual only.

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Viewport;
use crate::consts::{FOCAL_LENGTH, PERSPECTIVE};
use crate::tuning::{AMBIENT_PALETTE, EXPLOSION_PALETTE, ExplosionTier};

/// Smallest depth velocity an explosion particle may carry
const MIN_EXPLOSION_VZ: f32 = 1e-3;

/// Particle outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Shape {
    #[default]
    Circle,
    Square,
    Triangle,
}

impl Shape {
    pub const ALL: [Shape; 3] = [Shape::Circle, Shape::Square, Shape::Triangle];
}

/// A simulated point
#[derive(Debug, Clone, Serialize)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
    pub base_size: f32,
    pub color: &'static str,
    pub alpha: f32,
    /// Unit interval while alive; negative marks the particle for forced removal
    pub life: f32,
    pub shape: Option<Shape>,
    /// Planar velocity before a scatter impulse; `Some` while recovering
    pub original_vel: Option<Vec2>,
}

/// Screen-space result of a perspective divide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub pos: Vec2,
    pub size: f32,
}

impl Particle {
    /// Background particle with random placement, depth and drift
    pub fn ambient<R: Rng>(rng: &mut R, viewport: &Viewport) -> Self {
        let color = AMBIENT_PALETTE[rng.random_range(0..AMBIENT_PALETTE.len())];
        Self {
            pos: Vec3::new(
                rng.random::<f32>() * viewport.width,
                rng.random::<f32>() * viewport.height,
                rng.random::<f32>() * PERSPECTIVE,
            ),
            vel: Vec3::new(
                (rng.random::<f32>() - 0.5) * 0.5,
                (rng.random::<f32>() - 0.5) * 0.5,
                0.0,
            ),
            base_size: rng.random::<f32>() * 2.0 + 1.0,
            color,
            alpha: rng.random::<f32>() * 0.5 + 0.5,
            life: 1.0,
            shape: None,
            original_vel: None,
        }
    }

    /// One particle of a burst at `origin`
    pub fn explosion<R: Rng>(rng: &mut R, origin: Vec2, tier: &ExplosionTier) -> Self {
        let angle = rng.random::<f32>() * std::f32::consts::TAU;
        let speed = tier.particle_speed.lerp(rng.random::<f32>());
        let base_size = tier.particle_size.lerp(rng.random::<f32>()) * tier.size_multiplier();

        let mut vz = (rng.random::<f32>() - 0.5) * speed;
        if vz.abs() < MIN_EXPLOSION_VZ {
            vz = MIN_EXPLOSION_VZ.copysign(vz);
        }

        Self {
            pos: Vec3::new(
                origin.x + (rng.random::<f32>() - 0.5) * 40.0,
                origin.y + (rng.random::<f32>() - 0.5) * 40.0,
                0.0,
            ),
            vel: Vec3::new(angle.cos() * speed, angle.sin() * speed, vz),
            base_size,
            color: EXPLOSION_PALETTE[rng.random_range(0..EXPLOSION_PALETTE.len())],
            alpha: 1.0,
            life: 1.0,
            shape: Some(Shape::ALL[rng.random_range(0..Shape::ALL.len())]),
            original_vel: None,
        }
    }

    #[inline]
    pub fn is_ambient(&self) -> bool {
        self.vel.z == 0.0
    }

    #[inline]
    pub fn is_explosion(&self) -> bool {
        !self.is_ambient()
    }

    #[inline]
    pub fn is_scattered(&self) -> bool {
        self.original_vel.is_some()
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.life < 0.0
    }

    #[inline]
    pub fn planar(&self) -> Vec2 {
        self.pos.truncate()
    }

    /// Perspective divide around the viewport center
    pub fn project(&self, viewport: &Viewport) -> Projected {
        let scale = perspective_scale(self.pos.z);
        let center = viewport.center();
        Projected {
            pos: (self.planar() - center) * scale + center,
            size: (self.base_size * scale).max(0.0),
        }
    }
}

/// Depth scale factor; the denominator is clamped so near-camera depths stay finite
#[inline]
pub fn perspective_scale(z: f32) -> f32 {
    FOCAL_LENGTH / (FOCAL_LENGTH + z).max(1.0)
}

/// Fog outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FogShape {
    Circle,
    Triangle,
    Rectangle,
}

impl FogShape {
    pub const ALL: [FogShape; 3] = [FogShape::Circle, FogShape::Triangle, FogShape::Rectangle];
}

/// Soft colored splash left under an explosion
#[derive(Debug, Clone, Serialize)]
pub struct FogSpot {
    pub shape: FogShape,
    pub pos: Vec2,
    pub size: f32,
    pub rotation: f32,
    pub color: &'static str,
    pub alpha: f32,
    pub life: f32,
}

impl FogSpot {
    pub const START_ALPHA: f32 = 0.7;
    pub const FADE_PER_FRAME: f32 = 0.07;

    pub fn new<R: Rng>(rng: &mut R, pos: Vec2, tier: &ExplosionTier) -> Self {
        Self {
            shape: FogShape::ALL[rng.random_range(0..FogShape::ALL.len())],
            pos,
            size: rng.random::<f32>() * (tier.particle_size.max * 20.0)
                + tier.particle_size.min * 20.0,
            rotation: rng.random::<f32>() * std::f32::consts::TAU,
            color: EXPLOSION_PALETTE[rng.random_range(0..EXPLOSION_PALETTE.len())],
            alpha: Self::START_ALPHA,
            life: 1.0,
        }
    }

    /// Fade one frame; returns false once fully faded
    pub fn fade(&mut self) -> bool {
        self.life -= Self::FADE_PER_FRAME;
        self.alpha = self.life * Self::START_ALPHA;
        self.life > 0.0
    }
}

/// Arc segment orbiting the main gravity well
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stripe {
    /// Distance from the well center
    pub radius: f32,
    pub angle: f32,
    /// Angular speed (radians per frame, signed)
    pub speed: f32,
    /// Arc length (radians)
    pub length: f32,
    pub width: f32,
    pub alpha: f32,
}

impl Stripe {
    /// Inward drift per frame
    pub const INWARD_DRIFT: f32 = 0.05;

    pub fn new<R: Rng>(rng: &mut R, max_radius: f32) -> Self {
        let direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        Self {
            radius: rng.random::<f32>() * max_radius,
            angle: rng.random::<f32>() * std::f32::consts::TAU,
            speed: (rng.random::<f32>() * 0.001 + 0.0005) * direction,
            length: rng.random::<f32>() * 0.02 + 0.01,
            width: rng.random::<f32>() * 2.0 + 1.0,
            alpha: rng.random::<f32>() * 0.2 + 0.1,
        }
    }

    /// Rotate and spiral inward, respawning at the rim once past the center
    pub fn advance(&mut self, rim_radius: f32) {
        self.angle += self.speed;
        self.radius -= Self::INWARD_DRIFT;
        if self.radius < 0.0 {
            self.radius = rim_radius;
        }
    }

    /// Hue (degrees) derived from the current angle
    pub fn hue(&self) -> f32 {
        (self.angle * 30.0).rem_euclid(360.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use crate::tuning::ExplosionTable;

    #[test]
    fn test_ambient_is_ambient() {
        let mut rng = Pcg32::seed_from_u64(1);
        let vp = Viewport::new(800.0, 600.0);
        for _ in 0..100 {
            let p = Particle::ambient(&mut rng, &vp);
            assert!(p.is_ambient());
            assert!(p.pos.z >= 0.0 && p.pos.z < PERSPECTIVE);
            assert!(p.pos.x >= 0.0 && p.pos.x <= vp.width);
            assert!(p.shape.is_none());
        }
    }

    #[test]
    fn test_explosion_never_ambient() {
        let mut rng = Pcg32::seed_from_u64(2);
        let table = ExplosionTable::default();
        for _ in 0..500 {
            let p = Particle::explosion(&mut rng, Vec2::new(100.0, 100.0), &table.small);
            assert!(p.is_explosion());
            assert!(p.shape.is_some());
        }
    }

    #[test]
    fn test_projection_at_zero_depth_is_identity() {
        let vp = Viewport::new(800.0, 600.0);
        let mut rng = Pcg32::seed_from_u64(3);
        let mut p = Particle::ambient(&mut rng, &vp);
        p.pos = Vec3::new(10.0, 20.0, 0.0);
        p.base_size = 3.0;
        let proj = p.project(&vp);
        assert!((proj.pos - Vec2::new(10.0, 20.0)).length() < 1e-4);
        assert!((proj.size - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_projection_pulls_toward_center() {
        let vp = Viewport::new(800.0, 600.0);
        let mut rng = Pcg32::seed_from_u64(4);
        let mut p = Particle::ambient(&mut rng, &vp);
        p.pos = Vec3::new(0.0, 0.0, FOCAL_LENGTH);
        p.base_size = 2.0;
        let proj = p.project(&vp);
        // Half scale at z == focal length
        assert!((proj.pos - Vec2::new(200.0, 150.0)).length() < 1e-3);
        assert!((proj.size - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_fog_fades_out() {
        let mut rng = Pcg32::seed_from_u64(5);
        let tier = ExplosionTable::default().small;
        let mut fog = FogSpot::new(&mut rng, Vec2::ZERO, &tier);
        let mut frames = 0;
        while fog.fade() {
            frames += 1;
        }
        assert_eq!(frames, 14);
    }

    #[test]
    fn test_stripe_wraps_to_rim() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut s = Stripe::new(&mut rng, 100.0);
        s.radius = 0.01;
        s.advance(640.0);
        assert_eq!(s.radius, 640.0);
    }
}
