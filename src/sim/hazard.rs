//! Timed hazards
//!
//! Qualifying combos charge an accumulator. At the threshold, one to four
//! extra gravity wells open for a fixed duration; while they are open the
//! accumulator is frozen. When they close the accumulator resets and a
//! score-draining hazard may appear, which stays until it expires or is
//! cleared. While no wells are open the accumulator leaks every second, faster
//! the longer the player goes without a scoring hit.

use glam::Vec2;
use rand::Rng;

use super::well::GravityWell;
use crate::tuning::HazardConfig;
use crate::{Millis, Viewport};

/// Idle thresholds (ms since last scoring hit) and the leak per second above them
const IDLE_LEAK_STEPS: [(Millis, u32); 3] = [(0, 1), (2_000, 2), (5_000, 3)];

#[derive(Debug, Clone, PartialEq)]
pub enum HazardEvent {
    WellsOpened { count: usize },
    WellsClosed,
    DrainSpawned { pos: Vec2 },
    Drained { points: u64 },
    DrainExpired,
}

/// Score-draining hazard
#[derive(Debug, Clone, PartialEq)]
pub struct DrainHazard {
    pub pos: Vec2,
    pub radius: f32,
    pub until_ms: Millis,
}

impl DrainHazard {
    pub fn contains(&self, point: Vec2) -> bool {
        self.pos.distance_squared(point) < self.radius * self.radius
    }
}

#[derive(Debug, Clone)]
pub struct HazardScheduler {
    config: HazardConfig,
    accumulator: u32,
    last_scoring_hit: Millis,
    wells: Vec<GravityWell>,
    wells_until: Option<Millis>,
    drain: Option<DrainHazard>,
}

impl HazardScheduler {
    pub fn new(config: HazardConfig) -> Self {
        Self {
            config,
            accumulator: 0,
            last_scoring_hit: 0,
            wells: Vec::new(),
            wells_until: None,
            drain: None,
        }
    }

    pub fn reset(&mut self, now: Millis) {
        self.accumulator = 0;
        self.last_scoring_hit = now;
        self.wells.clear();
        self.wells_until = None;
        self.drain = None;
    }

    pub fn accumulator(&self) -> u32 {
        self.accumulator
    }

    pub fn wells(&self) -> &[GravityWell] {
        &self.wells
    }

    pub fn wells_active(&self) -> bool {
        self.wells_until.is_some()
    }

    pub fn drain(&self) -> Option<&DrainHazard> {
        self.drain.as_ref()
    }

    /// Any open well whose horizon covers `point`
    pub fn denies(&self, point: Vec2) -> bool {
        self.wells.iter().any(|w| w.swallows(point))
    }

    pub fn note_scoring_hit(&mut self, now: Millis) {
        self.last_scoring_hit = now;
    }

    /// Charge the accumulator; opens wells at the threshold
    pub fn record_combo<R: Rng>(
        &mut self,
        rng: &mut R,
        viewport: &Viewport,
        now: Millis,
    ) -> Option<HazardEvent> {
        self.last_scoring_hit = now;
        if self.wells_active() {
            return None;
        }
        self.accumulator += 1;
        if self.accumulator < self.config.combo_threshold {
            return None;
        }

        let count = weighted_count(rng, &self.config.count_weights);
        self.wells = (0..count)
            .map(|_| GravityWell::random(rng, viewport, self.config.well_radius))
            .collect();
        self.wells_until = Some(now + self.config.duration_ms);
        log::info!("{} black hole(s) opened for {}ms", count, self.config.duration_ms);
        Some(HazardEvent::WellsOpened { count })
    }

    /// Move open wells one frame
    pub fn advance_wells(&mut self, viewport: &Viewport) {
        for well in self.wells.iter_mut() {
            well.advance(viewport);
        }
    }

    /// Close wells and drop the drain once their time is up. Runs on every
    /// update so neither outlives its duration.
    pub fn expire<R: Rng>(
        &mut self,
        rng: &mut R,
        viewport: &Viewport,
        now: Millis,
    ) -> Vec<HazardEvent> {
        let mut events = Vec::new();
        self.expire_drain(now, &mut events);
        self.close_wells(rng, viewport, now, &mut events);
        events
    }

    /// One-second step: expiry, drain, and idle leak
    pub fn tick<R: Rng>(
        &mut self,
        rng: &mut R,
        viewport: &Viewport,
        now: Millis,
    ) -> Vec<HazardEvent> {
        let mut events = Vec::new();

        self.expire_drain(now, &mut events);
        if self.drain.is_some() && self.config.drain_per_second > 0 {
            events.push(HazardEvent::Drained {
                points: self.config.drain_per_second,
            });
        }

        if self.wells_active() {
            self.close_wells(rng, viewport, now, &mut events);
        } else {
            let idle = now.saturating_sub(self.last_scoring_hit);
            self.accumulator = self.accumulator.saturating_sub(idle_leak(idle));
        }

        events
    }

    fn expire_drain(&mut self, now: Millis, events: &mut Vec<HazardEvent>) {
        if self.drain.as_ref().is_some_and(|d| now >= d.until_ms) {
            self.drain = None;
            events.push(HazardEvent::DrainExpired);
        }
    }

    /// Close wells due by `now`. Everything is stamped with the due time, not
    /// `now`, so a late poll lands the same drain as a punctual one.
    fn close_wells<R: Rng>(
        &mut self,
        rng: &mut R,
        viewport: &Viewport,
        now: Millis,
        events: &mut Vec<HazardEvent>,
    ) {
        let Some(until) = self.wells_until.filter(|&until| now >= until) else {
            return;
        };
        self.wells.clear();
        self.wells_until = None;
        self.accumulator = 0;
        events.push(HazardEvent::WellsClosed);

        let chance = self.config.drain_chance.clamp(0.0, 1.0) as f64;
        if self.drain.is_none() && rng.random_bool(chance) {
            let margin = self.config.drain_radius;
            let pos = Vec2::new(
                margin + rng.random::<f32>() * (viewport.width - 2.0 * margin).max(0.0),
                margin + rng.random::<f32>() * (viewport.height - 2.0 * margin).max(0.0),
            );
            self.drain = Some(DrainHazard {
                pos,
                radius: self.config.drain_radius,
                until_ms: until + self.config.drain_duration_ms,
            });
            events.push(HazardEvent::DrainSpawned { pos });
        }
    }

    /// Remove the drain hazard (player hit or consumable)
    pub fn clear_drain(&mut self) -> bool {
        self.drain.take().is_some()
    }
}

/// Leak per second for the given idle time
pub fn idle_leak(idle_ms: Millis) -> u32 {
    IDLE_LEAK_STEPS
        .iter()
        .rev()
        .find(|(after, _)| idle_ms >= *after)
        .map(|(_, leak)| *leak)
        .unwrap_or(1)
}

/// 1-based count drawn from `weights`
fn weighted_count<R: Rng>(rng: &mut R, weights: &[f32; 4]) -> usize {
    let total: f32 = weights.iter().sum();
    let mut roll = rng.random::<f32>() * total;
    for (i, w) in weights.iter().enumerate() {
        if roll < *w {
            return i + 1;
        }
        roll -= w;
    }
    weights.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn setup() -> (HazardScheduler, Pcg32, Viewport) {
        let mut h = HazardScheduler::new(HazardConfig::default());
        h.reset(0);
        (h, Pcg32::seed_from_u64(77), Viewport::new(800.0, 600.0))
    }

    #[test]
    fn test_threshold_opens_once() {
        let (mut h, mut rng, vp) = setup();
        for _ in 0..69 {
            assert_eq!(h.record_combo(&mut rng, &vp, 1000), None);
        }
        let opened = h.record_combo(&mut rng, &vp, 1000);
        assert!(matches!(opened, Some(HazardEvent::WellsOpened { .. })));
        assert!(h.wells_active());
        assert!((1..=4).contains(&h.wells().len()));

        // Frozen while open
        for _ in 0..100 {
            assert_eq!(h.record_combo(&mut rng, &vp, 2000), None);
        }
        assert_eq!(h.accumulator(), 70);
        let events = h.tick(&mut rng, &vp, 10_000);
        assert!(events.is_empty());
        assert_eq!(h.accumulator(), 70);

        let events = h.tick(&mut rng, &vp, 16_000);
        assert!(events.contains(&HazardEvent::WellsClosed));
        assert_eq!(h.accumulator(), 0);
        assert!(!h.wells_active());
    }

    #[test]
    fn test_idle_leak_accelerates() {
        assert_eq!(idle_leak(0), 1);
        assert_eq!(idle_leak(1_999), 1);
        assert_eq!(idle_leak(2_000), 2);
        assert_eq!(idle_leak(4_999), 2);
        assert_eq!(idle_leak(5_000), 3);

        let (mut h, mut rng, vp) = setup();
        for _ in 0..20 {
            h.record_combo(&mut rng, &vp, 0);
        }
        h.tick(&mut rng, &vp, 1_000);
        assert_eq!(h.accumulator(), 19);
        h.tick(&mut rng, &vp, 3_000);
        assert_eq!(h.accumulator(), 17);
        h.tick(&mut rng, &vp, 6_000);
        assert_eq!(h.accumulator(), 14);
        h.note_scoring_hit(6_500);
        h.tick(&mut rng, &vp, 7_000);
        assert_eq!(h.accumulator(), 13);
    }

    #[test]
    fn test_drain_lifecycle() {
        let mut config = HazardConfig::default();
        config.combo_threshold = 1;
        config.drain_chance = 1.0;
        let mut h = HazardScheduler::new(config);
        let mut rng = Pcg32::seed_from_u64(5);
        let vp = Viewport::new(800.0, 600.0);
        h.reset(0);

        h.record_combo(&mut rng, &vp, 0);
        let events = h.tick(&mut rng, &vp, 15_000);
        let Some(HazardEvent::DrainSpawned { pos }) = events.last().cloned() else {
            panic!("expected drain, got {:?}", events);
        };
        assert!(h.drain().is_some_and(|d| d.contains(pos)));

        let events = h.tick(&mut rng, &vp, 16_000);
        assert_eq!(events, vec![HazardEvent::Drained { points: 10 }]);

        assert!(h.clear_drain());
        assert!(!h.clear_drain());
        assert!(h.tick(&mut rng, &vp, 17_000).is_empty());
    }

    #[test]
    fn test_drain_expires() {
        let mut config = HazardConfig::default();
        config.combo_threshold = 1;
        config.drain_chance = 1.0;
        let mut h = HazardScheduler::new(config);
        let mut rng = Pcg32::seed_from_u64(6);
        let vp = Viewport::new(800.0, 600.0);
        h.reset(0);
        h.record_combo(&mut rng, &vp, 0);
        h.tick(&mut rng, &vp, 15_000);
        let events = h.tick(&mut rng, &vp, 35_000);
        assert_eq!(events, vec![HazardEvent::DrainExpired]);
        assert!(h.drain().is_none());
    }

    #[test]
    fn test_expire_closes_wells_on_time() {
        let mut config = HazardConfig::default();
        config.combo_threshold = 1;
        config.duration_ms = 1_000;
        config.drain_chance = 1.0;
        let mut h = HazardScheduler::new(config);
        let mut rng = Pcg32::seed_from_u64(9);
        let vp = Viewport::new(800.0, 600.0);
        h.reset(0);
        h.record_combo(&mut rng, &vp, 100);

        assert!(h.expire(&mut rng, &vp, 1_099).is_empty());
        assert!(h.wells_active());

        let events = h.expire(&mut rng, &vp, 1_100);
        assert_eq!(events[0], HazardEvent::WellsClosed);
        assert!(!h.wells_active());
        assert_eq!(h.accumulator(), 0);

        // Expiry never drains or leaks
        assert!(h.expire(&mut rng, &vp, 5_000).is_empty());
        assert!(h.drain().is_some());
        assert_eq!(
            h.expire(&mut rng, &vp, 21_100),
            vec![HazardEvent::DrainExpired]
        );
    }

    #[test]
    fn test_late_close_keeps_due_time() {
        let mut config = HazardConfig::default();
        config.combo_threshold = 1;
        config.duration_ms = 1_000;
        config.drain_chance = 1.0;
        let mut h = HazardScheduler::new(config);
        let mut rng = Pcg32::seed_from_u64(10);
        let vp = Viewport::new(800.0, 600.0);
        h.reset(0);
        h.record_combo(&mut rng, &vp, 0);
        h.tick(&mut rng, &vp, 1_900);
        assert_eq!(h.drain().map(|d| d.until_ms), Some(21_000));
    }

    #[test]
    fn test_weighted_count_distribution() {
        let mut rng = Pcg32::seed_from_u64(1);
        let weights = [0.60, 0.25, 0.10, 0.05];
        let mut counts = [0usize; 4];
        for _ in 0..10_000 {
            counts[weighted_count(&mut rng, &weights) - 1] += 1;
        }
        assert!(counts[0] > 5_500 && counts[0] < 6_500);
        assert!(counts[3] > 300 && counts[3] < 700);
    }

    #[test]
    fn test_denies_inside_open_well() {
        let mut config = HazardConfig::default();
        config.combo_threshold = 1;
        let mut h = HazardScheduler::new(config);
        let mut rng = Pcg32::seed_from_u64(8);
        let vp = Viewport::new(800.0, 600.0);
        h.reset(0);
        h.record_combo(&mut rng, &vp, 0);
        let center = h.wells()[0].pos;
        assert!(h.denies(center));
        assert!(!h.denies(Vec2::new(-100.0, -100.0)));
    }
}
