//! Data-driven game balance
//!
//! Every gameplay constant lives in [`GameConfig`]. The defaults are the shipped
//! balance; a JSON document can override any subset of fields.

use serde::{Deserialize, Serialize};

/// Inclusive numeric range used by explosion tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Linear interpolation by a unit-interval roll
    #[inline]
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }
}

/// Explosion tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplosionClass {
    Small,
    Medium,
    Large,
    HighStrike,
}

/// Per-tier burst parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosionTier {
    pub particle_count: Span,
    pub particle_size: Span,
    pub particle_speed: Span,
    pub score: u64,
    /// Chance of this tier on a random hit (high strike is never rolled)
    pub probability: f32,
}

impl ExplosionTier {
    /// Size multiplier that separates tiers visually
    pub fn size_multiplier(&self) -> f32 {
        if self.score > 10 {
            1.5
        } else if self.score > 1 {
            1.2
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionTable {
    pub small: ExplosionTier,
    pub medium: ExplosionTier,
    pub large: ExplosionTier,
    pub high_strike: ExplosionTier,
}

impl ExplosionTable {
    pub fn tier(&self, class: ExplosionClass) -> &ExplosionTier {
        match class {
            ExplosionClass::Small => &self.small,
            ExplosionClass::Medium => &self.medium,
            ExplosionClass::Large => &self.large,
            ExplosionClass::HighStrike => &self.high_strike,
        }
    }

    /// Pick a tier for an ordinary hit from a unit roll
    pub fn roll(&self, roll: f32) -> ExplosionClass {
        if roll < self.small.probability {
            ExplosionClass::Small
        } else if roll < self.small.probability + self.medium.probability {
            ExplosionClass::Medium
        } else {
            ExplosionClass::Large
        }
    }
}

impl Default for ExplosionTable {
    fn default() -> Self {
        Self {
            small: ExplosionTier {
                particle_count: Span::new(5.0, 13.0),
                particle_size: Span::new(35.0, 45.0),
                particle_speed: Span::new(8.0, 16.0),
                score: 1,
                probability: 0.75,
            },
            medium: ExplosionTier {
                particle_count: Span::new(20.0, 30.0),
                particle_size: Span::new(45.0, 60.0),
                particle_speed: Span::new(12.0, 24.0),
                score: 5,
                probability: 0.2,
            },
            large: ExplosionTier {
                particle_count: Span::new(35.0, 50.0),
                particle_size: Span::new(55.0, 70.0),
                particle_speed: Span::new(16.0, 32.0),
                score: 20,
                probability: 0.05,
            },
            high_strike: ExplosionTier {
                particle_count: Span::new(75.0, 100.0),
                particle_size: Span::new(55.0, 70.0),
                particle_speed: Span::new(20.0, 40.0),
                score: 50,
                probability: 0.0,
            },
        }
    }
}

/// Cooldown/backoff parameters for one fatigue tracker (ms)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatigueConfig {
    /// Minimum spacing between any two accepts, across identifiers (0 = off)
    pub global_floor_ms: u64,
    pub base_cooldown_ms: u64,
    pub cooldown_increment_ms: u64,
    pub max_cooldown_ms: u64,
    /// Amount removed per decay tick
    pub decay_step_ms: u64,
}

impl FatigueConfig {
    pub const fn keys() -> Self {
        Self {
            global_floor_ms: 100,
            base_cooldown_ms: 200,
            cooldown_increment_ms: 150,
            max_cooldown_ms: 2000,
            decay_step_ms: 25,
        }
    }

    pub const fn combos() -> Self {
        Self {
            global_floor_ms: 0,
            base_cooldown_ms: 3000,
            cooldown_increment_ms: 150,
            max_cooldown_ms: 4500,
            decay_step_ms: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub session_seconds: u32,
    pub bonus_seconds_per_level: u32,
    pub combo_bonus_base: f32,
    pub combo_bonus_decay: f32,
    pub combo_bonus_min: f32,
    /// Chance of a time bonus on a high strike
    pub combo_bonus_probability: f32,
    pub countdown_step_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            session_seconds: 60,
            bonus_seconds_per_level: 10,
            combo_bonus_base: 2.0,
            combo_bonus_decay: 0.1,
            combo_bonus_min: 1.0,
            combo_bonus_probability: 0.15,
            countdown_step_ms: 1000,
        }
    }
}

impl TimerConfig {
    /// Seconds granted by a high-strike time bonus at the given level
    pub fn combo_bonus_seconds(&self, level: u32) -> u32 {
        let raw = self.combo_bonus_base - self.combo_bonus_decay * level.saturating_sub(1) as f32;
        raw.max(self.combo_bonus_min).round() as u32
    }
}

/// Power-law level curve: `base + level^exponent * multiplier`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub level_target_base: u64,
    pub level_target_multiplier: u64,
    pub level_target_exponent: u32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            level_target_base: 100,
            level_target_multiplier: 10,
            level_target_exponent: 4,
        }
    }
}

impl DifficultyConfig {
    /// Points needed to clear `level`, never below one
    pub fn target_for(&self, level: u32) -> u64 {
        let curve = (level as u64)
            .saturating_pow(self.level_target_exponent)
            .saturating_mul(self.level_target_multiplier);
        self.level_target_base.saturating_add(curve).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub combo_threshold: u32,
    pub duration_ms: u64,
    /// Weights for 1, 2, 3, 4 simultaneous wells
    pub count_weights: [f32; 4],
    pub well_radius: f32,
    pub drain_chance: f32,
    pub drain_per_second: u64,
    pub drain_duration_ms: u64,
    pub drain_radius: f32,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            combo_threshold: 70,
            duration_ms: 15_000,
            count_weights: [0.60, 0.25, 0.10, 0.05],
            well_radius: 40.0,
            drain_chance: 0.5,
            drain_per_second: 10,
            drain_duration_ms: 20_000,
            drain_radius: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub crush_booster_cost: u64,
    pub time_booster_cost: u64,
    pub purge_cost: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            crush_booster_cost: 100_000,
            time_booster_cost: 50_000,
            purge_cost: 25_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterConfig {
    pub crush_bursts: u32,
    pub crush_interval_ms: u64,
    pub ultimate_bursts: u32,
    pub ultimate_interval_ms: u64,
    pub time_bonus_seconds: u32,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            crush_bursts: 10,
            crush_interval_ms: 100,
            ultimate_bursts: 20,
            ultimate_interval_ms: 50,
            time_bonus_seconds: 15,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub base_particle_count: usize,
    /// Hard cap used to attenuate explosion bursts
    pub max_particles: usize,
    pub combo_time_window_ms: u64,
    pub max_held_keys: usize,
    pub min_touches_for_combo: usize,
    pub key_fatigue: FatigueConfig,
    pub combo_fatigue: FatigueConfig,
    pub timer: TimerConfig,
    pub difficulty: DifficultyConfig,
    pub hazard: HazardConfig,
    pub ultimate_threshold: u32,
    pub level_notification_ms: u64,
    pub combo_text_ms: u64,
    pub console_max_lines: usize,
    pub hit_radius: f32,
    pub consume_radius: f32,
    pub stripe_count: usize,
    pub well_radius: f32,
    pub explosion: ExplosionTable,
    pub store: StoreConfig,
    pub boosters: BoosterConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            base_particle_count: 200,
            max_particles: 600,
            combo_time_window_ms: 400,
            max_held_keys: 4,
            min_touches_for_combo: 3,
            key_fatigue: FatigueConfig::keys(),
            combo_fatigue: FatigueConfig::combos(),
            timer: TimerConfig::default(),
            difficulty: DifficultyConfig::default(),
            hazard: HazardConfig::default(),
            ultimate_threshold: 35,
            level_notification_ms: 1200,
            combo_text_ms: 1000,
            console_max_lines: 50,
            hit_radius: 50.0,
            consume_radius: 150.0,
            stripe_count: 200,
            well_radius: 50.0,
            explosion: ExplosionTable::default(),
            store: StoreConfig::default(),
            boosters: BoosterConfig::default(),
        }
    }
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self::keys()
    }
}

impl GameConfig {
    /// Parse a (possibly partial) JSON balance document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse overrides if present, otherwise (or on parse failure) use defaults
    pub fn load_or_default(json: Option<&str>) -> Self {
        match json.map(Self::from_json) {
            Some(Ok(config)) => {
                log::info!("Loaded tuning overrides");
                config
            }
            Some(Err(e)) => {
                log::warn!("Ignoring malformed tuning document: {}", e);
                Self::default()
            }
            None => Self::default(),
        }
    }
}

/// Colors of ambient particles
pub const AMBIENT_PALETTE: [&str; 6] = [
    "#4a9eff", "#7b68ee", "#00ffff", "#ff6ec7", "#ffd700", "#ffffff",
];

/// Colors of explosion particles, fog spots and combo text
pub const EXPLOSION_PALETTE: [&str; 7] = [
    "#ff0000", "#ff6600", "#ffff00", "#00ff00", "#00ffff", "#ff00ff", "#ffffff",
];

/// Words flashed on a high strike
pub const COMBO_TEXTS: [&str; 5] = ["BUM", "BAM", "CRUSH", "BOOOM", "SMASH"];

/// Sound cues for a high strike (played by the audio collaborator)
pub const COMBO_SOUNDS: [&str; 5] = ["bum.mp3", "crush.mp3", "smash.mp3", "bam.mp3", "booom.mp3"];
