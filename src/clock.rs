//! Time sources, fixed-period intervals and scheduled one-shot effects
//!
//! The session never reads wall time itself: every entry point takes a
//! millisecond timestamp, and the host supplies it from a [`Clock`]. Tests use
//! [`ManualClock`] to single-step deterministically.

use std::cell::Cell;
use std::collections::VecDeque;

use crate::Millis;

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self { now: Cell::new(start) }
    }

    pub fn advance(&self, ms: Millis) -> Millis {
        let now = self.now.get() + ms;
        self.now.set(now);
        now
    }

    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// Monotonic wall clock measured from construction
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct SystemClock {
    start: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }
}

/// `performance.now()` based clock
#[cfg(target_arch = "wasm32")]
#[derive(Debug)]
pub struct SystemClock {
    performance: Option<web_sys::Performance>,
}

#[cfg(target_arch = "wasm32")]
impl SystemClock {
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        match &self.performance {
            Some(p) => p.now() as Millis,
            None => js_sys::Date::now() as Millis,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-period ticker. Fires on a fixed grid anchored at `start`, so late
/// polls catch up instead of drifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: Millis,
    next_due_ms: Millis,
}

impl Interval {
    /// First fire happens one period after `start`
    pub fn new(period_ms: Millis, start: Millis) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_due_ms: start + period_ms,
        }
    }

    pub fn period_ms(&self) -> Millis {
        self.period_ms
    }

    /// Every due time passed since the last poll, oldest first
    pub fn due_times(&mut self, now: Millis) -> Vec<Millis> {
        let mut due = Vec::new();
        while self.next_due_ms <= now {
            due.push(self.next_due_ms);
            self.next_due_ms += self.period_ms;
        }
        due
    }
}

#[derive(Debug, Clone)]
struct Pending<E> {
    due_ms: Millis,
    generation: u64,
    effect: E,
}

/// Queue of timestamped one-shot effects.
///
/// Every effect remembers the generation it was scheduled in. `invalidate`
/// starts a new generation, which turns everything still pending into a
/// no-op: a restarted session can never see a stale countdown step or booster
/// burst.
#[derive(Debug, Clone)]
pub struct Scheduler<E> {
    generation: u64,
    pending: VecDeque<Pending<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            generation: 0,
            pending: VecDeque::new(),
        }
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Schedule `effect` at `due_ms`. Equal timestamps fire in insertion order.
    pub fn schedule(&mut self, due_ms: Millis, effect: E) {
        let idx = self.pending.partition_point(|p| p.due_ms <= due_ms);
        self.pending.insert(
            idx,
            Pending {
                due_ms,
                generation: self.generation,
                effect,
            },
        );
    }

    /// Drop everything pending and start a new generation
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.pending.clear();
    }

    /// Pop every effect due at or before `now` that belongs to the live generation
    pub fn due(&mut self, now: Millis) -> Vec<E> {
        let mut out = Vec::new();
        while self.pending.front().is_some_and(|p| p.due_ms <= now) {
            if let Some(p) = self.pending.pop_front() {
                if p.generation == self.generation {
                    out.push(p.effect);
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.advance(50), 150);
        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_interval_catches_up() {
        let mut iv = Interval::new(1000, 0);
        assert!(iv.due_times(999).is_empty());
        assert_eq!(iv.due_times(1000), vec![1000]);
        assert!(iv.due_times(1500).is_empty());
        // Late poll keeps each tick's own time
        assert_eq!(iv.due_times(3200), vec![2000, 3000]);
        assert_eq!(iv.due_times(4000), vec![4000]);
    }

    #[test]
    fn test_scheduler_order() {
        let mut s = Scheduler::new();
        s.schedule(300, "c");
        s.schedule(100, "a");
        s.schedule(100, "b");
        assert_eq!(s.due(50), Vec::<&str>::new());
        assert_eq!(s.due(100), vec!["a", "b"]);
        assert_eq!(s.due(1000), vec!["c"]);
        assert!(s.is_empty());
    }

    #[test]
    fn test_scheduler_invalidate_drops_stale() {
        let mut s = Scheduler::new();
        s.schedule(100, 1);
        s.schedule(200, 2);
        s.invalidate();
        s.schedule(150, 3);
        assert_eq!(s.due(1000), vec![3]);
        assert_eq!(s.generation(), 1);
    }
}
