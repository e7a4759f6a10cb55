//! Score, level curve and the session timer
//!
//! Score only grows through `add_score` (the drain hazard is the one other
//! writer, through `drain_score`). Within-level progress carries over across
//! level-ups, so one large award can cross several thresholds at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tuning::DifficultyConfig;

/// Result of one `add_score` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreOutcome {
    pub added: u64,
    /// Thresholds crossed by this award
    pub levels_gained: u32,
}

/// Result of one timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    Running { remaining: u32 },
    /// Time just ran out; the session is now over
    Expired,
    /// Already over; nothing happened
    Idle,
}

/// Frozen end-of-session numbers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub score: u64,
    pub level: u32,
    pub combo_stats: BTreeMap<String, u32>,
}

#[derive(Debug, Clone)]
pub struct Progression {
    difficulty: DifficultyConfig,
    ultimate_threshold: u32,
    score: u64,
    progress: u64,
    level: u32,
    target: u64,
    remaining_secs: u32,
    over: bool,
    show_level_up: bool,
    ultimate_meter: u32,
    combo_stats: BTreeMap<String, u32>,
    summary: Option<SessionSummary>,
}

impl Progression {
    pub fn new(difficulty: DifficultyConfig, ultimate_threshold: u32) -> Self {
        Self {
            difficulty,
            ultimate_threshold,
            score: 0,
            progress: 0,
            level: 1,
            target: difficulty.target_for(1),
            remaining_secs: 0,
            over: false,
            show_level_up: false,
            ultimate_meter: 0,
            combo_stats: BTreeMap::new(),
            summary: None,
        }
    }

    /// Fresh session with `seconds` on the clock
    pub fn reset(&mut self, seconds: u32) {
        *self = Self::new(self.difficulty, self.ultimate_threshold);
        self.remaining_secs = seconds;
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn progress(&self) -> u64 {
        self.progress
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    /// Progress toward the next level in [0, 1)
    pub fn progress_fraction(&self) -> f32 {
        self.progress as f32 / self.target.max(1) as f32
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn show_level_up(&self) -> bool {
        self.show_level_up
    }

    pub fn clear_level_up(&mut self) {
        self.show_level_up = false;
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn combo_stats(&self) -> &BTreeMap<String, u32> {
        &self.combo_stats
    }

    pub fn add_score(&mut self, points: u64) -> ScoreOutcome {
        if self.over {
            return ScoreOutcome::default();
        }
        self.score = self.score.saturating_add(points);
        self.progress = self.progress.saturating_add(points);

        let mut levels_gained = 0;
        while self.progress >= self.target {
            self.progress -= self.target;
            self.level += 1;
            self.target = self.difficulty.target_for(self.level);
            self.show_level_up = true;
            levels_gained += 1;
        }
        if levels_gained > 0 {
            log::debug!("Level {} reached, next target {}", self.level, self.target);
        }
        ScoreOutcome {
            added: points,
            levels_gained,
        }
    }

    /// Remove up to `points` from the score, never below zero. Progress is untouched.
    pub fn drain_score(&mut self, points: u64) -> u64 {
        if self.over {
            return 0;
        }
        let drained = points.min(self.score);
        self.score -= drained;
        drained
    }

    pub fn add_time(&mut self, seconds: u32) {
        if self.over {
            return;
        }
        self.remaining_secs = self.remaining_secs.saturating_add(seconds);
    }

    /// One-second countdown step
    pub fn tick(&mut self) -> TimerTick {
        if self.over {
            return TimerTick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.end();
            TimerTick::Expired
        } else {
            TimerTick::Running {
                remaining: self.remaining_secs,
            }
        }
    }

    /// Terminal transition; freezes the score and snapshots the summary
    pub fn end(&mut self) -> &SessionSummary {
        if !self.over {
            self.over = true;
            self.summary = Some(SessionSummary {
                score: self.score,
                level: self.level,
                combo_stats: self.combo_stats.clone(),
            });
        }
        self.summary.get_or_insert_with(SessionSummary::default)
    }

    pub fn record_combo(&mut self, label: &str) {
        *self.combo_stats.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn ultimate_meter(&self) -> u32 {
        self.ultimate_meter
    }

    pub fn is_ultimate_ready(&self) -> bool {
        self.ultimate_meter >= self.ultimate_threshold
    }

    /// Charge the meter; stops once ready
    pub fn record_big_combo(&mut self) {
        if !self.is_ultimate_ready() {
            self.ultimate_meter += 1;
        }
    }

    /// Spend a full meter
    pub fn use_ultimate(&mut self) -> bool {
        if !self.is_ultimate_ready() {
            return false;
        }
        self.ultimate_meter = 0;
        true
    }
}
