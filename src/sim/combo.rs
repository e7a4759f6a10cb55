//! Combo detection
//!
//! Keyboard: up to four identifiers may be held at once. When the fourth
//! arrives within the combo window of the first, the held set is offered as a
//! combo; otherwise every held key later resolves alone on release.
//!
//! Touch: a rising edge in touch-point count to three or more is a combo.
//!
//! Every resolved combo is gated by its own fatigue tracker, keyed by the
//! combo identifier, with a much longer base cooldown than single inputs.

use std::collections::VecDeque;

use glam::Vec2;

use super::fatigue::FatigueTracker;
use super::rejection::Rejection;
use crate::Millis;
use crate::tuning::FatigueConfig;

/// Identifier used for multi-touch combos
pub const TOUCH_COMBO_ID: &str = "mobile-combo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboState {
    Idle,
    Held(usize),
    Resolved,
    Released,
}

/// A full held set that landed inside the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboAttempt {
    pub id: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressOutcome {
    /// Already held, or the held set is full
    Ignored,
    Held(usize),
    Combo(ComboAttempt),
    /// Full held set, but spread beyond the window
    TooSlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchOutcome {
    None,
    /// One new touch: handle the newest point as a single hit
    Single,
    Combo,
}

#[derive(Debug, Clone)]
pub struct ComboDetector {
    window_ms: Millis,
    max_held: usize,
    min_touches: usize,
    held: Vec<String>,
    /// Press times, FIFO; not keyed to identifiers
    press_times: VecDeque<Millis>,
    last_touch_count: usize,
    state: ComboState,
    gate: FatigueTracker,
}

impl ComboDetector {
    pub fn new(
        window_ms: Millis,
        max_held: usize,
        min_touches: usize,
        gate: FatigueConfig,
    ) -> Self {
        Self {
            window_ms,
            max_held: max_held.max(1),
            min_touches,
            held: Vec::with_capacity(max_held),
            press_times: VecDeque::with_capacity(max_held),
            last_touch_count: 0,
            state: ComboState::Idle,
            gate: FatigueTracker::new(gate),
        }
    }

    pub fn state(&self) -> ComboState {
        self.state
    }

    pub fn held(&self) -> &[String] {
        &self.held
    }

    pub fn is_held(&self, id: &str) -> bool {
        self.held.iter().any(|h| h == id)
    }

    pub fn combo_cooldown(&self, id: &str) -> Millis {
        self.gate.cooldown(id)
    }

    pub fn press(&mut self, id: &str, now: Millis) -> PressOutcome {
        if self.is_held(id) || self.held.len() >= self.max_held {
            return PressOutcome::Ignored;
        }
        self.held.push(id.to_string());
        self.press_times.push_back(now);
        self.state = ComboState::Held(self.held.len());

        if self.held.len() < self.max_held {
            return PressOutcome::Held(self.held.len());
        }

        let first = self.press_times.front().copied().unwrap_or(now);
        let last = self.press_times.back().copied().unwrap_or(now);
        if last.saturating_sub(first) > self.window_ms {
            return PressOutcome::TooSlow;
        }
        PressOutcome::Combo(ComboAttempt {
            id: combo_id(&self.held),
            members: self.held.clone(),
        })
    }

    /// Release a key. Returns true if it was held and not consumed by a combo,
    /// meaning it should now resolve as a single input.
    pub fn release(&mut self, id: &str) -> bool {
        let Some(idx) = self.held.iter().position(|h| h == id) else {
            return false;
        };
        self.held.remove(idx);
        self.press_times.pop_front();
        self.state = if self.held.is_empty() {
            ComboState::Released
        } else {
            ComboState::Held(self.held.len())
        };
        true
    }

    /// Gate a keyboard combo; on success the held set is consumed
    pub fn resolve_keys(&mut self, attempt: &ComboAttempt, now: Millis) -> Result<(), Rejection> {
        self.resolve(&attempt.id, now)?;
        self.held.clear();
        self.press_times.clear();
        self.state = ComboState::Resolved;
        Ok(())
    }

    /// Gate a combo by identifier (touch, booster and ultimate bursts)
    pub fn resolve(&mut self, id: &str, now: Millis) -> Result<(), Rejection> {
        self.gate.try_accept(id, now).map_err(|e| match e {
            Rejection::OnCooldown { id, .. } => Rejection::ComboOnCooldown { id },
            other => other,
        })
    }

    pub fn touch_start(&mut self, count: usize) -> TouchOutcome {
        let previous = self.last_touch_count;
        self.last_touch_count = count;
        if count >= self.min_touches && previous < count {
            TouchOutcome::Combo
        } else if count > previous {
            TouchOutcome::Single
        } else {
            TouchOutcome::None
        }
    }

    pub fn touch_end(&mut self, remaining: usize) {
        self.last_touch_count = remaining;
    }

    pub fn decay_tick(&mut self, now: Millis) {
        self.gate.decay_tick(now);
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.press_times.clear();
        self.last_touch_count = 0;
        self.state = ComboState::Idle;
        self.gate.clear();
    }
}

/// Sorted, dash-joined member identifiers
pub fn combo_id(members: &[String]) -> String {
    let mut sorted: Vec<&str> = members.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join("-")
}

/// Mean of `points`, or `fallback` when there are none
pub fn centroid<I: IntoIterator<Item = Vec2>>(points: I, fallback: Vec2) -> Vec2 {
    let (sum, n) = points
        .into_iter()
        .fold((Vec2::ZERO, 0u32), |(sum, n), p| (sum + p, n + 1));
    if n == 0 { fallback } else { sum / n as f32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ComboDetector {
        ComboDetector::new(400, 4, 3, FatigueConfig::combos())
    }

    #[test]
    fn test_four_keys_inside_window_combo() {
        let mut d = detector();
        assert_eq!(d.press("d", 0), PressOutcome::Held(1));
        assert_eq!(d.press("a", 100), PressOutcome::Held(2));
        assert_eq!(d.press("c", 200), PressOutcome::Held(3));
        let PressOutcome::Combo(attempt) = d.press("b", 300) else {
            panic!("expected combo");
        };
        assert_eq!(attempt.id, "a-b-c-d");
        assert!(d.resolve_keys(&attempt, 300).is_ok());
        assert_eq!(d.state(), ComboState::Resolved);
        assert!(d.held().is_empty());
        // Consumed keys do not resolve individually
        assert!(!d.release("a"));
    }

    #[test]
    fn test_four_keys_outside_window_resolve_alone() {
        let mut d = detector();
        d.press("a", 0);
        d.press("b", 200);
        d.press("c", 400);
        assert_eq!(d.press("d", 401), PressOutcome::TooSlow);
        assert_eq!(d.state(), ComboState::Held(4));
        for k in ["a", "b", "c", "d"] {
            assert!(d.release(k));
        }
        assert_eq!(d.state(), ComboState::Released);
    }

    #[test]
    fn test_duplicate_and_fifth_key_ignored() {
        let mut d = detector();
        d.press("a", 0);
        assert_eq!(d.press("a", 10), PressOutcome::Ignored);
        d.press("b", 0);
        d.press("c", 0);
        d.press("d", 5000);
        assert_eq!(d.press("e", 5001), PressOutcome::Ignored);
    }

    #[test]
    fn test_release_pops_oldest_timestamp() {
        let mut d = detector();
        d.press("a", 0);
        d.press("b", 1000);
        // Releasing "b" drops the *oldest* stamp (a's), leaving 1000
        assert!(d.release("b"));
        d.press("c", 1100);
        d.press("d", 1200);
        // Span is measured from 1000, not 0
        assert!(matches!(d.press("e", 1300), PressOutcome::Combo(_)));
    }

    #[test]
    fn test_combo_gate_blocks_repeat() {
        let mut d = detector();
        assert!(d.resolve(TOUCH_COMBO_ID, 0).is_ok());
        assert_eq!(
            d.resolve(TOUCH_COMBO_ID, 1000),
            Err(Rejection::ComboOnCooldown {
                id: TOUCH_COMBO_ID.to_string()
            })
        );
        assert_eq!(d.combo_cooldown(TOUCH_COMBO_ID), 3150);
        assert!(d.resolve(TOUCH_COMBO_ID, 4200).is_ok());
    }

    #[test]
    fn test_gated_key_combo_keeps_keys_held() {
        let mut d = detector();
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            d.press(k, i as u64);
        }
        let attempt = ComboAttempt {
            id: "a-b-c-d".into(),
            members: vec![],
        };
        d.resolve("a-b-c-d", 0).unwrap();
        assert!(d.resolve_keys(&attempt, 10).is_err());
        assert_eq!(d.held().len(), 4);
    }

    #[test]
    fn test_touch_rising_edge() {
        let mut d = detector();
        assert_eq!(d.touch_start(1), TouchOutcome::Single);
        assert_eq!(d.touch_start(2), TouchOutcome::Single);
        assert_eq!(d.touch_start(3), TouchOutcome::Combo);
        // Same count again is not a new edge
        assert_eq!(d.touch_start(3), TouchOutcome::None);
        d.touch_end(0);
        assert_eq!(d.touch_start(4), TouchOutcome::Combo);
    }

    #[test]
    fn test_centroid() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert_eq!(centroid(pts, Vec2::ZERO), Vec2::new(5.0, 5.0));
        assert_eq!(centroid(std::iter::empty(), Vec2::new(1.0, 2.0)), Vec2::new(1.0, 2.0));
    }
}
