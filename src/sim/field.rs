//! Particle field
//!
//! Owns every particle and decoration. The frame loop is the only caller of
//! [`ParticleField::advance`]; input handlers only issue spawn/scatter/consume
//! commands between frames.

use glam::{Vec2, Vec3};
use rand::Rng;

use super::particle::{FogSpot, Particle, Projected, Stripe};
use super::well::GravityWell;
use crate::Viewport;
use crate::consts::PERSPECTIVE;
use crate::tuning::ExplosionTier;

/// Life lost per frame by explosion particles
pub const EXPLOSION_DECAY: f32 = 0.06;
/// Downward velocity bias per frame for explosion particles
pub const EXPLOSION_FALL: f32 = 0.05;
/// Velocity retained per frame while a scattered particle recovers
pub const SCATTER_FRICTION: f32 = 0.95;
/// Speed margin under which a scattered particle snaps back to its drift
pub const SCATTER_RECOVERY_EPSILON: f32 = 0.1;
/// Life regained per frame by marked particles (toward zero)
pub const CONSUME_RECOVERY: f32 = 0.1;
/// Suction speed given to consumed particles
pub const CONSUME_SUCTION: f32 = 10.0;
/// Burst size never drops below this fraction of nominal
pub const MIN_BURST_FRACTION: f32 = 0.25;

/// Per-frame rotation of the vortex and accretion disk
pub const VORTEX_SPIN: f32 = 0.0005;
pub const ACCRETION_SPIN: f32 = -0.002;

#[derive(Debug, Clone)]
pub struct ParticleField {
    viewport: Viewport,
    /// Ambient floor maintained after every frame
    floor: usize,
    /// Live count at which bursts are attenuated the most
    cap: usize,
    particles: Vec<Particle>,
    fog_spots: Vec<FogSpot>,
    stripes: Vec<Stripe>,
    stripe_count: usize,
    pub vortex_angle: f32,
    pub accretion_angle: f32,
}

impl ParticleField {
    pub fn new(viewport: Viewport, floor: usize, cap: usize, stripe_count: usize) -> Self {
        Self {
            viewport,
            floor,
            cap: cap.max(floor + 1),
            particles: Vec::with_capacity(cap),
            fog_spots: Vec::new(),
            stripes: Vec::with_capacity(stripe_count),
            stripe_count,
            vortex_angle: 0.0,
            accretion_angle: 0.0,
        }
    }

    /// Fill the ambient floor and lay out stripes
    pub fn populate<R: Rng>(&mut self, rng: &mut R) {
        self.replenish(rng);
        self.reset_stripes(rng);
    }

    /// Drop everything (restart)
    pub fn clear(&mut self) {
        self.particles.clear();
        self.fog_spots.clear();
        self.stripes.clear();
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// New play-area size; stripes are re-laid for the new diagonal
    pub fn resize<R: Rng>(&mut self, rng: &mut R, viewport: Viewport) {
        self.viewport = viewport;
        self.reset_stripes(rng);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn fog_spots(&self) -> &[FogSpot] {
        &self.fog_spots
    }

    pub fn stripes(&self) -> &[Stripe] {
        &self.stripes
    }

    pub fn ambient_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_ambient()).count()
    }

    pub fn explosion_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_explosion()).count()
    }

    /// Append one ambient particle
    pub fn spawn_ambient<R: Rng>(&mut self, rng: &mut R) {
        let p = Particle::ambient(rng, &self.viewport);
        self.particles.push(p);
    }

    /// Burst at `origin`. Returns the number of particles emitted.
    ///
    /// The nominal count is attenuated linearly as the live count climbs from
    /// the ambient floor to the hard cap, down to a quarter of nominal.
    pub fn spawn_explosion<R: Rng>(
        &mut self,
        rng: &mut R,
        origin: Vec2,
        tier: &ExplosionTier,
    ) -> usize {
        let lo = tier.particle_count.min as usize;
        let hi = (tier.particle_count.max as usize).max(lo);
        let nominal = rng.random_range(lo..=hi);
        let count = self.attenuated(nominal);

        self.particles.reserve(count);
        for _ in 0..count {
            self.particles.push(Particle::explosion(rng, origin, tier));
        }
        count
    }

    fn attenuated(&self, nominal: usize) -> usize {
        let live = self.particles.len();
        if live <= self.floor {
            return nominal;
        }
        let load = ((live - self.floor) as f32 / (self.cap - self.floor) as f32).min(1.0);
        let factor = 1.0 - load * (1.0 - MIN_BURST_FRACTION);
        (nominal as f32 * factor).floor() as usize
    }

    /// Fog splash under a hit
    pub fn spawn_fog<R: Rng>(&mut self, rng: &mut R, origin: Vec2, tier: &ExplosionTier) {
        self.fog_spots.push(FogSpot::new(rng, origin, tier));
    }

    /// Radial push on ambient particles within `radius`. Returns how many were hit.
    pub fn scatter_near(&mut self, origin: Vec2, radius: f32, strength: f32) -> usize {
        let mut hit = 0;
        for p in self.particles.iter_mut() {
            if !p.is_ambient() || p.is_scattered() {
                continue;
            }
            let delta = p.planar() - origin;
            let dist = delta.length();
            if dist >= radius {
                continue;
            }
            p.original_vel = Some(p.vel.truncate());
            let force = (1.0 - dist / radius) * strength;
            let dir = if dist > 0.0 { delta / dist } else { Vec2::X };
            p.vel += (dir * force).extend(0.0);
            hit += 1;
        }
        hit
    }

    /// Mark ambient particles within `radius` for removal and pull them toward
    /// `origin`. Returns how many were marked.
    pub fn consume_near(&mut self, origin: Vec2, radius: f32) -> usize {
        let mut marked = 0;
        for p in self.particles.iter_mut() {
            if !p.is_ambient() || p.is_marked() {
                continue;
            }
            let delta = origin - p.planar();
            let dist = delta.length();
            if dist >= radius {
                continue;
            }
            p.life = -1.0;
            let dir = if dist > 0.0 { delta / dist } else { Vec2::ZERO };
            p.vel = (dir * CONSUME_SUCTION).extend(0.0);
            marked += 1;
        }
        marked
    }

    /// True if any visible particle in front of the camera projects within
    /// `radius` of `point`
    pub fn any_visible_near(&self, point: Vec2, radius: f32) -> bool {
        self.particles.iter().any(|p| {
            p.pos.z > 0.0 && p.alpha > 0.0 && p.project(&self.viewport).pos.distance(point) < radius
        })
    }

    pub fn project(&self, particle: &Particle) -> Projected {
        particle.project(&self.viewport)
    }

    /// Advance one frame.
    ///
    /// Order per particle: well attraction and horizon, integration, then the
    /// kind-specific update (explosion fall/decay, scatter recovery, or wrap).
    /// Dead particles are dropped and the ambient floor is refilled.
    pub fn advance<R: Rng>(&mut self, rng: &mut R, wells: &[&GravityWell]) {
        self.vortex_angle += VORTEX_SPIN;
        self.accretion_angle += ACCRETION_SPIN;

        let rim = self.viewport.width.max(self.viewport.height) / 2.0;
        for stripe in self.stripes.iter_mut() {
            stripe.advance(rim);
        }

        let viewport = self.viewport;
        for p in self.particles.iter_mut() {
            step_particle(p, wells, &viewport);
        }
        self.particles.retain(|p| p.life > 0.0);
        self.replenish(rng);

        self.fog_spots.retain_mut(|spot| spot.fade());
    }

    fn replenish<R: Rng>(&mut self, rng: &mut R) {
        let missing = self.floor.saturating_sub(self.ambient_count());
        for _ in 0..missing {
            self.spawn_ambient(rng);
        }
    }

    fn reset_stripes<R: Rng>(&mut self, rng: &mut R) {
        let max_radius = self.viewport.half_diagonal();
        self.stripes.clear();
        self.stripes
            .extend((0..self.stripe_count).map(|_| Stripe::new(rng, max_radius)));
    }

    #[cfg(test)]
    pub(crate) fn push(&mut self, p: Particle) {
        self.particles.push(p);
    }
}

fn step_particle(p: &mut Particle, wells: &[&GravityWell], viewport: &Viewport) {
    let planar = p.planar();

    if p.is_ambient() {
        if p.is_marked() {
            p.life += CONSUME_RECOVERY;
            p.alpha = (1.0 + p.life * 10.0).max(0.0);
        }
        for well in wells {
            let pull = well.pull_at(planar);
            p.vel += pull.extend(0.0);
        }
    }
    if wells.iter().any(|w| w.swallows(planar)) {
        p.life = 0.0;
    }

    p.pos += p.vel;

    if p.is_explosion() {
        p.life -= EXPLOSION_DECAY;
        p.alpha = p.life;
        p.vel.y += EXPLOSION_FALL;
    } else if let Some(original) = p.original_vel {
        let planar_vel = p.vel.truncate() * SCATTER_FRICTION;
        p.vel = planar_vel.extend(0.0);
        if planar_vel.length() < original.length() + SCATTER_RECOVERY_EPSILON {
            p.vel = original.extend(0.0);
            p.original_vel = None;
        }
    } else {
        wrap(&mut p.pos, viewport);
        if p.pos.z > 0.0 && !p.is_marked() {
            p.alpha = 0.5 * (1.0 - p.pos.z / PERSPECTIVE);
        }
    }
}

fn wrap(pos: &mut Vec3, viewport: &Viewport) {
    if pos.x < 0.0 {
        pos.x = viewport.width;
    } else if pos.x > viewport.width {
        pos.x = 0.0;
    }
    if pos.y < 0.0 {
        pos.y = viewport.height;
    } else if pos.y > viewport.height {
        pos.y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use crate::tuning::ExplosionTable;

    fn field() -> (ParticleField, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(42);
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), 200, 600, 20);
        f.populate(&mut rng);
        (f, rng)
    }

    fn far_well() -> GravityWell {
        GravityWell::new(Vec2::new(-10_000.0, -10_000.0), 1.0, Vec2::ZERO)
    }

    fn ambient_at(rng: &mut Pcg32, pos: Vec3, vel: Vec2) -> Particle {
        let mut p = Particle::ambient(rng, &Viewport::new(800.0, 600.0));
        p.pos = pos;
        p.vel = vel.extend(0.0);
        p
    }

    #[test]
    fn test_populate_fills_floor() {
        let (f, _) = field();
        assert_eq!(f.ambient_count(), 200);
        assert_eq!(f.stripes().len(), 20);
    }

    #[test]
    fn test_explosion_life_decreases_until_removed() {
        let (mut f, mut rng) = field();
        let tier = ExplosionTable::default().small;
        let n = f.spawn_explosion(&mut rng, Vec2::new(400.0, 300.0), &tier);
        assert!(n >= 5 && n <= 13);
        let well = far_well();

        let mut last_life = 1.0;
        let mut frames = 0;
        while f.explosion_count() > 0 {
            f.advance(&mut rng, &[&well]);
            frames += 1;
            if let Some(p) = f.particles().iter().find(|p| p.is_explosion()) {
                assert!(p.life < last_life);
                assert!(p.life > 0.0);
                last_life = p.life;
            }
            assert!(frames < 100);
        }
        // 1.0 / 0.06 -> gone on the 17th frame
        assert_eq!(frames, 17);
    }

    #[test]
    fn test_burst_attenuated_near_cap() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), 10, 20, 0);
        f.populate(&mut rng);
        let tier = ExplosionTable::default().high_strike;
        // Push live count to the cap
        for _ in 0..10 {
            f.spawn_ambient(&mut rng);
        }
        let n = f.spawn_explosion(&mut rng, Vec2::ZERO, &tier);
        assert!(n >= 18 && n <= 25, "got {}", n);
    }

    #[test]
    fn test_scatter_then_recover() {
        let mut rng = Pcg32::seed_from_u64(9);
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), 0, 10, 0);
        f.push(ambient_at(&mut rng, Vec3::new(110.0, 100.0, 10.0), Vec2::new(0.1, 0.0)));

        let hit = f.scatter_near(Vec2::new(100.0, 100.0), 100.0, 10.0);
        assert_eq!(hit, 1);
        let p = &f.particles()[0];
        assert_eq!(p.original_vel, Some(Vec2::new(0.1, 0.0)));
        assert!((p.vel.x - 9.1).abs() < 1e-4);

        // Already scattered: ignored
        assert_eq!(f.scatter_near(Vec2::new(100.0, 100.0), 100.0, 10.0), 0);

        let well = far_well();
        let mut frames = 0;
        while f.particles()[0].is_scattered() {
            f.advance(&mut rng, &[&well]);
            frames += 1;
            assert!(frames < 200);
        }
        assert_eq!(f.particles()[0].vel, Vec3::new(0.1, 0.0, 0.0));
    }

    #[test]
    fn test_consume_marks_and_removes_next_frame() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), 0, 10, 0);
        f.push(ambient_at(&mut rng, Vec3::new(120.0, 100.0, 10.0), Vec2::ZERO));
        f.push(ambient_at(&mut rng, Vec3::new(500.0, 500.0, 10.0), Vec2::ZERO));

        assert_eq!(f.consume_near(Vec2::new(100.0, 100.0), 150.0), 1);
        let marked = &f.particles()[0];
        assert!(marked.is_marked());
        assert!(marked.vel.x < 0.0);

        let well = far_well();
        f.advance(&mut rng, &[&well]);
        assert_eq!(f.particles().len(), 1);
        assert_eq!(f.particles()[0].pos.x, 500.0);
    }

    #[test]
    fn test_consume_skips_explosions() {
        let mut rng = Pcg32::seed_from_u64(12);
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), 0, 10, 0);
        let tier = ExplosionTable::default().small;
        f.spawn_explosion(&mut rng, Vec2::new(100.0, 100.0), &tier);
        assert_eq!(f.consume_near(Vec2::new(100.0, 100.0), 150.0), 0);
    }

    #[test]
    fn test_horizon_annihilates() {
        let mut rng = Pcg32::seed_from_u64(13);
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), 0, 10, 0);
        f.push(ambient_at(&mut rng, Vec3::new(405.0, 300.0, 10.0), Vec2::ZERO));
        let well = GravityWell::new(Vec2::new(400.0, 300.0), 50.0, Vec2::ZERO);
        f.advance(&mut rng, &[&well]);
        assert!(f.particles().is_empty());
    }

    #[test]
    fn test_ambient_wraps() {
        let mut rng = Pcg32::seed_from_u64(14);
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), 0, 10, 0);
        f.push(ambient_at(&mut rng, Vec3::new(799.9, 0.1, 250.0), Vec2::new(0.5, -0.5)));
        let well = far_well();
        f.advance(&mut rng, &[&well]);
        let p = &f.particles()[0];
        assert_eq!(p.pos.x, 0.0);
        assert_eq!(p.pos.y, 600.0);
        assert!((p.alpha - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_hit_test_uses_projection() {
        let mut rng = Pcg32::seed_from_u64(15);
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), 0, 10, 0);
        // At z == focal length the point (0, 0) projects to (200, 150)
        let mut p = ambient_at(&mut rng, Vec3::new(0.0, 0.0, 500.0), Vec2::ZERO);
        p.alpha = 0.5;
        f.push(p);
        assert!(f.any_visible_near(Vec2::new(210.0, 150.0), 50.0));
        assert!(!f.any_visible_near(Vec2::new(0.0, 0.0), 50.0));
    }

    proptest! {
        #[test]
        fn prop_ambient_floor_holds(seed in any::<u64>(), hits in 0usize..6, frames in 1usize..40) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut f = ParticleField::new(Viewport::new(640.0, 480.0), 50, 150, 0);
            f.populate(&mut rng);
            let well = GravityWell::new(Vec2::new(320.0, 240.0), 50.0, Vec2::new(1.0, 1.0));
            let tier = ExplosionTable::default().medium;
            for i in 0..hits {
                let at = Vec2::new(50.0 + i as f32 * 90.0, 200.0);
                f.consume_near(at, 150.0);
                f.spawn_explosion(&mut rng, at, &tier);
            }
            for _ in 0..frames {
                f.advance(&mut rng, &[&well]);
                prop_assert!(f.ambient_count() >= 50);
            }
        }
    }
}
