//! Input fatigue
//!
//! Two-tier throttle: a global minimum spacing between any two accepted
//! inputs, plus a per-identifier cooldown that grows by a fixed increment on
//! every too-soon attempt (up to a cap) and shrinks by a fixed step on every
//! decay tick. Identifiers whose cooldown is back at base are evicted, so only
//! recently abused inputs are tracked.

use std::collections::HashMap;

use super::rejection::Rejection;
use crate::Millis;
use crate::tuning::FatigueConfig;

#[derive(Debug, Clone)]
pub struct FatigueTracker {
    config: FatigueConfig,
    /// Raised cooldowns only; absent means base
    cooldowns: HashMap<String, Millis>,
    last_accept: HashMap<String, Millis>,
    last_global_accept: Option<Millis>,
}

impl FatigueTracker {
    pub fn new(config: FatigueConfig) -> Self {
        Self {
            config,
            cooldowns: HashMap::new(),
            last_accept: HashMap::new(),
            last_global_accept: None,
        }
    }

    pub fn config(&self) -> &FatigueConfig {
        &self.config
    }

    /// Current cooldown of `id` (base if untracked)
    pub fn cooldown(&self, id: &str) -> Millis {
        self.cooldowns
            .get(id)
            .copied()
            .unwrap_or(self.config.base_cooldown_ms)
    }

    /// Identifiers currently carrying a raised cooldown
    pub fn tracked(&self) -> usize {
        self.cooldowns.len()
    }

    /// Gate without committing. A too-soon attempt on `id` raises its cooldown.
    pub fn check(&mut self, id: &str, now: Millis) -> Result<(), Rejection> {
        if let Some(last) = self.last_global_accept {
            if now.saturating_sub(last) < self.config.global_floor_ms {
                return Err(Rejection::RapidFire {
                    floor_ms: self.config.global_floor_ms,
                });
            }
        }

        let cooldown = self.cooldown(id);
        if let Some(&last) = self.last_accept.get(id) {
            if now.saturating_sub(last) < cooldown {
                let raised = (cooldown + self.config.cooldown_increment_ms)
                    .min(self.config.max_cooldown_ms);
                self.cooldowns.insert(id.to_string(), raised);
                return Err(Rejection::OnCooldown {
                    id: id.to_string(),
                    cooldown_ms: raised,
                });
            }
        }
        Ok(())
    }

    /// Commit an accept for `id` at `now`
    pub fn record(&mut self, id: &str, now: Millis) {
        self.last_accept.insert(id.to_string(), now);
        self.last_global_accept = Some(now);
    }

    /// `check` then `record`
    pub fn try_accept(&mut self, id: &str, now: Millis) -> Result<(), Rejection> {
        self.check(id, now)?;
        self.record(id, now);
        Ok(())
    }

    /// One decay step. Cooldowns at base are evicted, as are accept stamps
    /// older than the cap (they can no longer cause a rejection).
    pub fn decay_tick(&mut self, now: Millis) {
        let FatigueConfig {
            base_cooldown_ms,
            decay_step_ms,
            max_cooldown_ms,
            ..
        } = self.config;

        self.cooldowns.retain(|_, cooldown| {
            *cooldown = cooldown.saturating_sub(decay_step_ms).max(base_cooldown_ms);
            *cooldown > base_cooldown_ms
        });
        self.last_accept
            .retain(|_, last| now.saturating_sub(*last) < max_cooldown_ms);
    }

    pub fn clear(&mut self) {
        self.cooldowns.clear();
        self.last_accept.clear();
        self.last_global_accept = None;
    }
}
