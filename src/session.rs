//! Session controller
//!
//! Owns every simulation component. Components never touch each other; the
//! session reads one and issues commands to another. Time only enters
//! through the `now` passed to [`Session::update`] and
//! [`Session::handle_input`], so tests drive it with a manual clock.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::clock::{Interval, Scheduler};
use crate::console::ConsoleLog;
use crate::consts::{DECAY_TICK_MS, FRAME_DT, MAX_SUBSTEPS, SECOND_MS};
use crate::persistence::{Booster, Store, StoreItem, Wallet};
use crate::sim::combo::centroid;
use crate::sim::{
    Command, ComboAttempt, ComboDetector, FatigueTracker, GravityWell, HazardEvent,
    HazardScheduler, InputEvent, KeyAction, KeyLayout, Modifiers, ParticleField, PressOutcome,
    Progression, Rejection, TOUCH_COMBO_ID, TimerTick, TouchOutcome, normalize_key,
};
use crate::tuning::{COMBO_SOUNDS, COMBO_TEXTS, EXPLOSION_PALETTE, ExplosionClass, GameConfig};
use crate::{Millis, Viewport};

pub use crate::sim::SessionSummary;

const FRAME_MS: f32 = FRAME_DT * 1000.0;
/// Longest gap fed to the frame accumulator (tab switches, debugger pauses)
const MAX_FRAME_GAP_MS: f32 = 100.0;

const COUNTDOWN_LABELS: [&str; 4] = ["3", "2", "1", "GO!"];

/// Scatter radius and strength per unit of the tier's max size / speed
const SCATTER_RADIUS_FACTOR: f32 = 40.0;
const SCATTER_STRENGTH_FACTOR: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Home,
    Countdown,
    Playing,
    Over,
}

/// Notifications for audio, analytics and UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    Countdown { label: &'static str },
    SessionStarted,
    SessionEnded { summary: SessionSummary },
    Explosion { pos: Vec2, class: ExplosionClass, points: u64 },
    HighStrike {
        combo: String,
        text: &'static str,
        sound: &'static str,
        pos: Vec2,
    },
    LevelUp { level: u32 },
    LevelUpCleared,
    ComboTextCleared,
    HazardActivated { count: usize },
    HazardExpired,
    DrainSpawned { pos: Vec2 },
    Drained { points: u64 },
    DrainCleared,
    DrainExpired,
    BoosterActivated { booster: Booster },
    UltimateActivated,
    ItemPurchased { item: StoreItem },
    TimeBonus { seconds: u32 },
}

/// Flashing combo word
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboText {
    pub text: &'static str,
    pub pos: Vec2,
    pub color: &'static str,
    /// Degrees
    pub start_angle: f32,
    pub end_angle: f32,
}

#[derive(Debug, Clone)]
enum Effect {
    Countdown(&'static str),
    BeginPlay { at: Millis },
    ClearLevelUp(u64),
    ClearComboText(u64),
    SubCombo { id: String, pos: Vec2 },
}

pub struct Session {
    config: GameConfig,
    rng: Pcg32,
    viewport: Viewport,
    phase: SessionPhase,

    field: ParticleField,
    well: GravityWell,
    fatigue: FatigueTracker,
    combos: ComboDetector,
    progression: Progression,
    hazards: HazardScheduler,
    layout: KeyLayout,

    wallet: Wallet,
    store: Box<dyn Store>,

    scheduler: Scheduler<Effect>,
    second_ticker: Option<Interval>,
    decay_ticker: Option<Interval>,
    last_frame: Option<Millis>,
    frame_accumulator: f32,
    frames: u64,

    console: ConsoleLog,
    events: Vec<GameEvent>,
    countdown: Option<&'static str>,
    combo_text: Option<ComboText>,
    combo_text_serial: u64,
    level_up_serial: u64,
}

impl Session {
    pub fn new(config: GameConfig, viewport: Viewport, seed: u64, store: Box<dyn Store>) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);

        let mut field = ParticleField::new(
            viewport,
            config.base_particle_count,
            config.max_particles,
            config.stripe_count,
        );
        field.populate(&mut rng);
        let well = GravityWell::centered(&mut rng, &viewport, config.well_radius);
        let layout = KeyLayout::new(&mut rng, &viewport);
        let wallet = Wallet::load(store.as_ref());

        log::info!(
            "Session ready: {}x{} viewport, seed {}",
            viewport.width,
            viewport.height,
            seed
        );

        Self {
            rng,
            viewport,
            phase: SessionPhase::Home,
            field,
            well,
            fatigue: FatigueTracker::new(config.key_fatigue),
            combos: ComboDetector::new(
                config.combo_time_window_ms,
                config.max_held_keys,
                config.min_touches_for_combo,
                config.combo_fatigue,
            ),
            progression: Progression::new(config.difficulty, config.ultimate_threshold),
            hazards: HazardScheduler::new(config.hazard.clone()),
            layout,
            wallet,
            store,
            scheduler: Scheduler::new(),
            second_ticker: None,
            decay_ticker: None,
            last_frame: None,
            frame_accumulator: 0.0,
            frames: 0,
            console: ConsoleLog::new(config.console_max_lines),
            events: Vec::new(),
            countdown: None,
            combo_text: None,
            combo_text_serial: 0,
            level_up_serial: 0,
            config,
        }
    }

    // --- Accessors ---

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn well(&self) -> &GravityWell {
        &self.well
    }

    pub fn hazards(&self) -> &HazardScheduler {
        &self.hazards
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    pub fn fatigue(&self) -> &FatigueTracker {
        &self.fatigue
    }

    pub fn combos(&self) -> &ComboDetector {
        &self.combos
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn console(&self) -> &ConsoleLog {
        &self.console
    }

    pub fn countdown(&self) -> Option<&'static str> {
        self.countdown
    }

    pub fn combo_text(&self) -> Option<&ComboText> {
        self.combo_text.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    /// Take every event raised since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Lifecycle ---

    /// Reset all per-session state and run the countdown
    pub fn start(&mut self, now: Millis) {
        self.scheduler.invalidate();
        self.progression.reset(self.config.timer.session_seconds);
        self.hazards.reset(now);
        self.fatigue.clear();
        self.combos.clear();
        self.second_ticker = None;
        self.decay_ticker = None;
        self.countdown = None;
        self.combo_text = None;
        self.phase = SessionPhase::Countdown;

        let step = self.config.timer.countdown_step_ms;
        for (i, &label) in COUNTDOWN_LABELS.iter().enumerate() {
            self.scheduler.schedule(now + i as u64 * step, Effect::Countdown(label));
        }
        let at = now + COUNTDOWN_LABELS.len() as u64 * step;
        self.scheduler.schedule(at, Effect::BeginPlay { at });
        log::info!("Countdown started");
    }

    /// Fresh field, well and layout, then `start`
    pub fn restart(&mut self, now: Millis) {
        self.field.clear();
        self.field.populate(&mut self.rng);
        self.well = GravityWell::centered(&mut self.rng, &self.viewport, self.config.well_radius);
        self.layout.rebuild(&mut self.rng, &self.viewport);
        self.console.clear();
        self.start(now);
    }

    /// Manual end; same terminal path as the timer running out
    pub fn end(&mut self, now: Millis) {
        self.finish(now);
    }

    /// Leave to the home screen. A running session is abandoned: its score is
    /// discarded and nothing is credited.
    pub fn go_home(&mut self, now: Millis) {
        if matches!(self.phase, SessionPhase::Countdown | SessionPhase::Playing) {
            self.halt();
            self.progression.reset(0);
            self.hazards.reset(now);
            self.console.push(now, "Session abandoned.");
        }
        self.phase = SessionPhase::Home;
    }

    /// New play-area size; the key layout is re-placed and the well re-centred
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.field.resize(&mut self.rng, viewport);
        self.well = GravityWell::centered(&mut self.rng, &viewport, self.config.well_radius);
        self.layout.rebuild(&mut self.rng, &viewport);
        log::debug!("Resized to {}x{}", viewport.width, viewport.height);
    }

    /// Stop every ticker and pending effect
    fn halt(&mut self) {
        self.scheduler.invalidate();
        self.second_ticker = None;
        self.decay_ticker = None;
        self.countdown = None;
        self.combo_text = None;
        self.combos.clear();
    }

    fn finish(&mut self, now: Millis) {
        if !matches!(self.phase, SessionPhase::Countdown | SessionPhase::Playing) {
            return;
        }
        self.halt();

        let summary = self.progression.end().clone();
        self.progression.clear_level_up();
        self.phase = SessionPhase::Over;

        self.wallet.credit(summary.score);
        self.persist_wallet();
        self.console.push(
            now,
            format!(
                "Game over! Final score {} at level {}. +{} crush keys.",
                summary.score, summary.level, summary.score
            ),
        );
        self.events.push(GameEvent::SessionEnded { summary });
    }

    // --- Frame loop ---

    /// Advance to `now`: scheduled effects, then the session tickers, then
    /// fixed physics frames
    pub fn update(&mut self, now: Millis) {
        for effect in self.scheduler.due(now) {
            self.apply(effect, now);
        }
        if self.phase == SessionPhase::Playing {
            self.run_tickers(now);
        }
        self.run_frames(now);
    }

    fn apply(&mut self, effect: Effect, now: Millis) {
        match effect {
            Effect::Countdown(label) => {
                self.countdown = Some(label);
                self.events.push(GameEvent::Countdown { label });
            }
            Effect::BeginPlay { at } => {
                self.countdown = None;
                self.phase = SessionPhase::Playing;
                self.second_ticker = Some(Interval::new(SECOND_MS, at));
                self.decay_ticker = Some(Interval::new(DECAY_TICK_MS, at));
                self.hazards.reset(at);
                self.console.push(at, "Game started!");
                self.events.push(GameEvent::SessionStarted);
            }
            Effect::ClearLevelUp(serial) => {
                if serial == self.level_up_serial && self.progression.show_level_up() {
                    self.progression.clear_level_up();
                    self.events.push(GameEvent::LevelUpCleared);
                }
            }
            Effect::ClearComboText(serial) => {
                if serial == self.combo_text_serial && self.combo_text.take().is_some() {
                    self.events.push(GameEvent::ComboTextCleared);
                }
            }
            Effect::SubCombo { id, pos } => {
                let result = self.try_combo(&id, pos, now);
                let _ = self.report(result, now);
            }
        }
    }

    /// Each ticker fire runs at its own due time, so the outcome does not
    /// depend on how often `update` is polled
    fn run_tickers(&mut self, now: Millis) {
        let decays = self
            .decay_ticker
            .as_mut()
            .map(|t| t.due_times(now))
            .unwrap_or_default();
        for at in decays {
            self.fatigue.decay_tick(at);
            self.combos.decay_tick(at);
        }

        let seconds = self
            .second_ticker
            .as_mut()
            .map(|t| t.due_times(now))
            .unwrap_or_default();
        for at in seconds {
            self.second_tick(at);
            if self.phase != SessionPhase::Playing {
                return;
            }
        }

        let events = self.hazards.expire(&mut self.rng, &self.viewport, now);
        for event in events {
            self.apply_hazard(event, now);
        }
    }

    fn second_tick(&mut self, now: Millis) {
        let events = self.hazards.tick(&mut self.rng, &self.viewport, now);
        for event in events {
            self.apply_hazard(event, now);
        }
        if self.progression.tick() == TimerTick::Expired {
            log::info!("Time up");
            self.finish(now);
        }
    }

    fn apply_hazard(&mut self, event: HazardEvent, now: Millis) {
        match event {
            HazardEvent::WellsOpened { count } => {
                self.console.push(now, format!("BLACK HOLE x{}!", count));
                self.events.push(GameEvent::HazardActivated { count });
            }
            HazardEvent::WellsClosed => {
                self.events.push(GameEvent::HazardExpired);
            }
            HazardEvent::DrainSpawned { pos } => {
                self.console.push(now, "A drain hazard appeared! Tap it to destroy it.");
                self.events.push(GameEvent::DrainSpawned { pos });
            }
            HazardEvent::Drained { points } => {
                let drained = self.progression.drain_score(points);
                if drained > 0 {
                    self.events.push(GameEvent::Drained { points: drained });
                }
            }
            HazardEvent::DrainExpired => {
                self.events.push(GameEvent::DrainExpired);
            }
        }
    }

    fn run_frames(&mut self, now: Millis) {
        let Some(last) = self.last_frame.replace(now) else {
            return;
        };
        let elapsed = (now.saturating_sub(last) as f32).min(MAX_FRAME_GAP_MS);
        self.frame_accumulator += elapsed;

        let mut substeps = 0;
        while self.frame_accumulator >= FRAME_MS && substeps < MAX_SUBSTEPS {
            self.step_frame();
            self.frame_accumulator -= FRAME_MS;
            substeps += 1;
        }
    }

    fn step_frame(&mut self) {
        self.well.advance(&self.viewport);
        self.hazards.advance_wells(&self.viewport);
        let wells: Vec<&GravityWell> = std::iter::once(&self.well)
            .chain(self.hazards.wells())
            .collect();
        self.field.advance(&mut self.rng, &wells);
        self.frames += 1;
    }

    // --- Input ---

    /// Apply one input event. Declines are logged to the console and returned.
    pub fn handle_input(&mut self, event: InputEvent, now: Millis) -> Result<(), Rejection> {
        let result = match event {
            InputEvent::KeyDown { key, modifiers } => self.key_down(&key, modifiers, now),
            InputEvent::KeyUp { key, modifiers } => self.key_up(&key, modifiers, now),
            InputEvent::PointerDown { pos } => self.pointer(pos, now),
            InputEvent::TouchStart { touches } => self.touch_start(&touches, now),
            InputEvent::TouchEnd { touches } => {
                self.combos.touch_end(touches.len());
                Ok(())
            }
        };
        self.report(result, now)
    }

    fn key_down(&mut self, key: &str, modifiers: Modifiers, now: Millis) -> Result<(), Rejection> {
        match normalize_key(key, modifiers) {
            KeyAction::Suppressed | KeyAction::Swallowed => Ok(()),
            KeyAction::Activate(Command::Booster(booster)) => self.try_activate(booster, now),
            KeyAction::Activate(Command::Ultimate) => self.try_ultimate(now),
            KeyAction::Letter(id) => {
                self.ensure_playing()?;
                match self.combos.press(&id, now) {
                    PressOutcome::Combo(attempt) => self.try_key_combo(attempt, now),
                    PressOutcome::TooSlow => Err(Rejection::ComboTooSlow),
                    PressOutcome::Held(_) | PressOutcome::Ignored => Ok(()),
                }
            }
        }
    }

    fn key_up(&mut self, key: &str, modifiers: Modifiers, now: Millis) -> Result<(), Rejection> {
        let KeyAction::Letter(id) = normalize_key(key, modifiers) else {
            return Ok(());
        };
        self.ensure_playing()?;
        if !self.combos.release(&id) {
            return Ok(());
        }
        let pos = self.layout.position(&id).unwrap_or_else(|| self.viewport.center());
        self.try_single(&id, pos, now)
    }

    fn pointer(&mut self, pos: Vec2, now: Millis) -> Result<(), Rejection> {
        self.ensure_playing()?;
        let Some(id) = self.layout.nearest(pos).map(str::to_string) else {
            return Ok(());
        };
        self.try_single(&id, pos, now)
    }

    fn touch_start(&mut self, touches: &[Vec2], now: Millis) -> Result<(), Rejection> {
        self.ensure_playing()?;
        match self.combos.touch_start(touches.len()) {
            TouchOutcome::Combo => {
                let target = centroid(touches.iter().copied(), self.viewport.center());
                self.try_combo(TOUCH_COMBO_ID, target, now)
            }
            TouchOutcome::Single => match touches.last() {
                Some(&pos) => self.pointer(pos, now),
                None => Ok(()),
            },
            TouchOutcome::None => Ok(()),
        }
    }

    fn ensure_playing(&self) -> Result<(), Rejection> {
        if self.phase == SessionPhase::Playing {
            Ok(())
        } else {
            Err(Rejection::SessionInactive)
        }
    }

    /// Log a decline to the console. Rapid-fire and inactive-session declines
    /// stay silent.
    fn report(&mut self, result: Result<(), Rejection>, now: Millis) -> Result<(), Rejection> {
        if let Err(reason) = &result {
            match reason {
                Rejection::RapidFire { .. } | Rejection::SessionInactive => {
                    log::debug!("{}", reason)
                }
                _ => self.console.push(now, reason.to_string()),
            }
        }
        result
    }

    /// Single input: fatigue, hazard denial, drain hit, hit test, then score
    fn try_single(&mut self, id: &str, pos: Vec2, now: Millis) -> Result<(), Rejection> {
        self.ensure_playing()?;
        self.fatigue.check(id, now)?;

        if self.hazards.denies(pos) {
            return Err(Rejection::InsideHazard { id: id.to_string() });
        }
        if self.hazards.drain().is_some_and(|d| d.contains(pos)) {
            self.fatigue.record(id, now);
            self.hazards.clear_drain();
            self.console.push(now, "Drain hazard destroyed!");
            self.events.push(GameEvent::DrainCleared);
            return Ok(());
        }
        if !self.field.any_visible_near(pos, self.config.hit_radius) {
            return Err(Rejection::EmptySpace { id: id.to_string() });
        }

        self.fatigue.record(id, now);
        let class = self.config.explosion.roll(self.rng.random());
        let tier = *self.config.explosion.tier(class);
        self.field.spawn_fog(&mut self.rng, pos, &tier);
        self.field.spawn_explosion(&mut self.rng, pos, &tier);
        self.field.scatter_near(
            pos,
            tier.particle_size.max * SCATTER_RADIUS_FACTOR,
            tier.particle_speed.max * SCATTER_STRENGTH_FACTOR,
        );
        self.console.push(now, format!("Input '{}' processed.", id));
        self.events.push(GameEvent::Explosion {
            pos,
            class,
            points: tier.score,
        });
        self.award(tier.score, now);
        Ok(())
    }

    fn try_key_combo(&mut self, attempt: ComboAttempt, now: Millis) -> Result<(), Rejection> {
        let target = centroid(
            attempt.members.iter().filter_map(|k| self.layout.position(k)),
            self.viewport.center(),
        );
        self.combos.resolve_keys(&attempt, now)?;
        self.high_strike(&attempt.id, target, now);
        Ok(())
    }

    fn try_combo(&mut self, id: &str, target: Vec2, now: Millis) -> Result<(), Rejection> {
        self.ensure_playing()?;
        self.combos.resolve(id, now)?;
        self.high_strike(id, target, now);
        Ok(())
    }

    fn high_strike(&mut self, id: &str, target: Vec2, now: Millis) {
        let tier = self.config.explosion.high_strike;
        self.field.consume_near(target, self.config.consume_radius);
        self.field.spawn_fog(&mut self.rng, target, &tier);
        self.field.spawn_explosion(&mut self.rng, target, &tier);
        self.well.nudge(target);

        let text = self.show_combo_text(target, now);
        let sound = COMBO_SOUNDS[self.rng.random_range(0..COMBO_SOUNDS.len())];
        self.progression.record_combo(text);
        self.progression.record_big_combo();
        self.console.push(now, format!("High Strike! Combo: '{}'", id));
        self.events.push(GameEvent::HighStrike {
            combo: id.to_string(),
            text,
            sound,
            pos: target,
        });

        if let Some(event) = self.hazards.record_combo(&mut self.rng, &self.viewport, now) {
            self.apply_hazard(event, now);
        }
        self.award(tier.score, now);

        let timer = &self.config.timer;
        if self.rng.random_bool(timer.combo_bonus_probability.clamp(0.0, 1.0) as f64) {
            let seconds = timer.combo_bonus_seconds(self.progression.level());
            self.grant_time(seconds, now);
        }
    }

    fn show_combo_text(&mut self, pos: Vec2, now: Millis) -> &'static str {
        let text = COMBO_TEXTS[self.rng.random_range(0..COMBO_TEXTS.len())];
        let color = EXPLOSION_PALETTE[self.rng.random_range(0..EXPLOSION_PALETTE.len())];
        let start_angle = self.rng.random::<f32>() * 60.0 - 30.0;
        let end_angle = start_angle + self.rng.random::<f32>() * 20.0 - 10.0;
        self.combo_text = Some(ComboText {
            text,
            pos,
            color,
            start_angle,
            end_angle,
        });
        self.combo_text_serial += 1;
        self.scheduler.schedule(
            now + self.config.combo_text_ms,
            Effect::ClearComboText(self.combo_text_serial),
        );
        text
    }

    fn award(&mut self, points: u64, now: Millis) {
        let outcome = self.progression.add_score(points);
        self.hazards.note_scoring_hit(now);
        if outcome.levels_gained == 0 {
            return;
        }

        let level = self.progression.level();
        self.level_up_serial += 1;
        self.scheduler.schedule(
            now + self.config.level_notification_ms,
            Effect::ClearLevelUp(self.level_up_serial),
        );
        self.console.push(now, format!("Level {} reached!", level));
        self.events.push(GameEvent::LevelUp { level });

        let bonus = self.config.timer.bonus_seconds_per_level * outcome.levels_gained;
        self.grant_time(bonus, now);
    }

    fn grant_time(&mut self, seconds: u32, now: Millis) {
        if seconds == 0 {
            return;
        }
        self.progression.add_time(seconds);
        self.console.push(now, format!("+{}s", seconds));
        self.events.push(GameEvent::TimeBonus { seconds });
    }

    // --- Economy ---

    /// Spend currency on `item`
    pub fn purchase(&mut self, item: StoreItem, now: Millis) -> Result<(), Rejection> {
        let result = self.wallet.purchase(item, &self.config.store).map(|()| {
            self.persist_wallet();
            self.console.push(now, format!("Purchased {}.", item));
            self.events.push(GameEvent::ItemPurchased { item });
        });
        self.report(result, now)
    }

    /// Use an owned consumable
    pub fn activate(&mut self, booster: Booster, now: Millis) -> Result<(), Rejection> {
        let result = self.try_activate(booster, now);
        self.report(result, now)
    }

    /// Spend a full ultimate meter
    pub fn activate_ultimate(&mut self, now: Millis) -> Result<(), Rejection> {
        let result = self.try_ultimate(now);
        self.report(result, now)
    }

    fn try_activate(&mut self, booster: Booster, now: Millis) -> Result<(), Rejection> {
        self.ensure_playing()?;
        self.wallet.consume(booster)?;

        match booster {
            Booster::Crush => {
                let boosters = &self.config.boosters;
                let (count, interval) = (boosters.crush_bursts, boosters.crush_interval_ms);
                self.schedule_bursts("booster", count, interval, now);
                self.console.push(now, "CRUSH BOOSTER ACTIVATED!");
            }
            Booster::Time => {
                self.console.push(now, "TIME BOOSTER ACTIVATED!");
                self.grant_time(self.config.boosters.time_bonus_seconds, now);
            }
            Booster::Purge => {
                if self.hazards.clear_drain() {
                    self.events.push(GameEvent::DrainCleared);
                }
                self.console.push(now, "PURGE ACTIVATED!");
            }
        }
        self.events.push(GameEvent::BoosterActivated { booster });
        self.persist_wallet();
        Ok(())
    }

    fn try_ultimate(&mut self, now: Millis) -> Result<(), Rejection> {
        self.ensure_playing()?;
        if !self.progression.use_ultimate() {
            return Err(Rejection::UltimateNotReady {
                meter: self.progression.ultimate_meter(),
                threshold: self.config.ultimate_threshold,
            });
        }
        let boosters = &self.config.boosters;
        let (count, interval) = (boosters.ultimate_bursts, boosters.ultimate_interval_ms);
        self.schedule_bursts("ultimate", count, interval, now);
        self.console.push(now, "ULTIMATE ACTIVATED!");
        self.events.push(GameEvent::UltimateActivated);
        Ok(())
    }

    /// Queue `count` sub-combos at random points, `interval` apart
    fn schedule_bursts(&mut self, prefix: &str, count: u32, interval: Millis, now: Millis) {
        for i in 0..count {
            let pos = Vec2::new(
                self.rng.random::<f32>() * self.viewport.width,
                self.rng.random::<f32>() * self.viewport.height,
            );
            self.scheduler.schedule(
                now + i as u64 * interval,
                Effect::SubCombo {
                    id: format!("{}-{}", prefix, i),
                    pos,
                },
            );
        }
    }

    fn persist_wallet(&mut self) {
        if let Err(e) = self.wallet.save(self.store.as_mut()) {
            log::warn!("Wallet save failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::persistence::MemoryStore;
    use crate::sim::Particle;

    fn session() -> Session {
        Session::new(
            GameConfig::default(),
            Viewport::new(800.0, 600.0),
            1234,
            Box::new(MemoryStore::new()),
        )
    }

    fn session_with(config: GameConfig, seed: u64) -> Session {
        Session::new(
            config,
            Viewport::new(800.0, 600.0),
            seed,
            Box::new(MemoryStore::new()),
        )
    }

    fn playing() -> Session {
        let mut s = session();
        s.update(0);
        s.start(0);
        s.update(4_000);
        assert_eq!(s.phase(), SessionPhase::Playing);
        s
    }

    /// Bright particle projecting exactly onto the viewport center
    fn plant_particle(s: &mut Session) -> Vec2 {
        let center = s.viewport.center();
        let mut p = Particle::ambient(&mut s.rng, &s.viewport);
        p.pos = Vec3::new(center.x, center.y, 10.0);
        p.vel = Vec3::ZERO;
        p.alpha = 0.5;
        s.field.push(p);
        center
    }

    #[test]
    fn test_countdown_sequence() {
        let mut s = session();
        s.start(1_000);
        assert_eq!(s.phase(), SessionPhase::Countdown);
        s.update(1_000);
        assert_eq!(s.countdown(), Some("3"));
        s.update(2_500);
        assert_eq!(s.countdown(), Some("2"));
        s.update(4_000);
        assert_eq!(s.countdown(), Some("GO!"));
        s.update(5_000);
        assert_eq!(s.countdown(), None);
        assert_eq!(s.phase(), SessionPhase::Playing);
        let labels: Vec<_> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::Countdown { label } => Some(label),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["3", "2", "1", "GO!"]);
    }

    #[test]
    fn test_inputs_declined_before_play() {
        let mut s = session();
        assert_eq!(
            s.handle_input(InputEvent::key_down("a"), 0),
            Err(Rejection::SessionInactive)
        );
        s.start(0);
        assert_eq!(
            s.handle_input(InputEvent::PointerDown { pos: Vec2::ZERO }, 10),
            Err(Rejection::SessionInactive)
        );
    }

    #[test]
    fn test_pointer_hit_scores() {
        let mut s = playing();
        let pos = plant_particle(&mut s);
        s.drain_events();
        assert!(s.handle_input(InputEvent::PointerDown { pos }, 5_000).is_ok());
        assert!(s.progression().score() >= 1);
        assert!(!s.field().fog_spots().is_empty());
        assert!(s.field().explosion_count() > 0);
        assert!(
            s.drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::Explosion { .. }))
        );
    }

    #[test]
    fn test_pointer_rapid_fire_declined() {
        let mut s = playing();
        let pos = plant_particle(&mut s);
        assert!(s.handle_input(InputEvent::PointerDown { pos }, 5_000).is_ok());
        assert_eq!(
            s.handle_input(InputEvent::PointerDown { pos }, 5_050),
            Err(Rejection::RapidFire { floor_ms: 100 })
        );
    }

    #[test]
    fn test_empty_space_declined_and_logged() {
        let mut s = playing();
        s.field.clear();
        let result = s.handle_input(InputEvent::PointerDown { pos: Vec2::new(5.0, 5.0) }, 5_000);
        assert!(matches!(result, Err(Rejection::EmptySpace { .. })));
        assert!(s.console().last().is_some_and(|l| l.contains("empty space")));
        assert_eq!(s.progression().score(), 0);
    }

    #[test]
    fn test_modifier_keys_fully_suppressed() {
        let mut s = playing();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        for key in ["a", "b", "c", "d"] {
            let down = InputEvent::KeyDown {
                key: key.into(),
                modifiers: ctrl,
            };
            assert!(s.handle_input(down, 5_000).is_ok());
        }
        assert!(s.combos().held().is_empty());
    }

    #[test]
    fn test_touch_combo_high_strike() {
        let mut s = playing();
        s.drain_events();
        let touches = vec![
            Vec2::new(100.0, 100.0),
            Vec2::new(200.0, 100.0),
            Vec2::new(150.0, 200.0),
        ];
        assert!(s.handle_input(InputEvent::TouchStart { touches }, 5_000).is_ok());
        assert!(s.progression().score() >= 50);
        assert_eq!(s.progression().ultimate_meter(), 1);
        assert_eq!(s.hazards().accumulator(), 1);
        assert!(s.combo_text().is_some());

        let strike = s.drain_events().into_iter().find_map(|e| match e {
            GameEvent::HighStrike { combo, pos, .. } => Some((combo, pos)),
            _ => None,
        });
        assert_eq!(strike, Some((TOUCH_COMBO_ID.to_string(), Vec2::new(150.0, 400.0 / 3.0))));

        // Combo text clears after its display time
        s.update(6_000);
        assert!(s.combo_text().is_none());
    }

    #[test]
    fn test_level_up_grants_time_and_clears() {
        let mut s = playing();
        let before = s.progression().remaining_secs();
        s.award(110, 5_000);
        assert_eq!(s.progression().level(), 2);
        assert!(s.progression().show_level_up());
        assert_eq!(s.progression().remaining_secs(), before + 10);
        s.update(6_200);
        assert!(!s.progression().show_level_up());
        assert!(s.drain_events().contains(&GameEvent::LevelUpCleared));
    }

    #[test]
    fn test_time_booster() {
        let mut s = playing();
        assert_eq!(
            s.activate(Booster::Time, 5_000),
            Err(Rejection::NotOwned {
                booster: Booster::Time
            })
        );
        s.wallet.time_boosters = 1;
        let before = s.progression().remaining_secs();
        assert!(s.handle_input(InputEvent::key_down("2"), 5_000).is_ok());
        assert_eq!(s.progression().remaining_secs(), before + 15);
        assert_eq!(s.wallet().time_boosters, 0);
    }

    #[test]
    fn test_crush_booster_bursts() {
        let mut s = playing();
        s.wallet.crush_boosters = 1;
        assert!(s.handle_input(InputEvent::key_down("Enter"), 5_000).is_ok());
        s.update(5_000);
        s.update(5_950);
        // Ten distinct sub-combo identifiers, each a high strike
        assert_eq!(s.progression().ultimate_meter(), 10);
    }

    #[test]
    fn test_ultimate_gated_by_meter() {
        let mut s = playing();
        assert_eq!(
            s.activate_ultimate(5_000),
            Err(Rejection::UltimateNotReady {
                meter: 0,
                threshold: 35
            })
        );
        for _ in 0..35 {
            s.progression.record_big_combo();
        }
        assert!(s.handle_input(InputEvent::key_down("3"), 5_000).is_ok());
        assert_eq!(s.progression().ultimate_meter(), 0);
        s.update(6_000);
        assert_eq!(s.progression().ultimate_meter(), 20);
    }

    #[test]
    fn test_drain_hit_clears_hazard() {
        let mut config = GameConfig::default();
        config.hazard.combo_threshold = 1;
        config.hazard.drain_chance = 1.0;
        config.hazard.duration_ms = 1_000;
        let mut s = session_with(config, 9);
        s.start(0);
        s.update(4_000);

        let touches = vec![Vec2::new(10.0, 10.0); 3];
        assert!(s.handle_input(InputEvent::TouchStart { touches }, 4_100).is_ok());
        assert!(s.hazards().wells_active());
        s.update(6_000);
        let pos = s.hazards().drain().map(|d| d.pos).unwrap();

        s.drain_events();
        assert!(s.handle_input(InputEvent::PointerDown { pos }, 6_100).is_ok());
        assert!(s.hazards().drain().is_none());
        assert!(s.drain_events().contains(&GameEvent::DrainCleared));
    }

    /// Wells opened by a combo at 4_100 with a one second lifetime
    fn session_with_wells() -> Session {
        let mut config = GameConfig::default();
        config.hazard.combo_threshold = 1;
        config.hazard.duration_ms = 1_000;
        let mut s = session_with(config, 21);
        s.start(0);
        s.update(4_000);
        let touches = vec![Vec2::new(10.0, 10.0); 3];
        assert!(s.handle_input(InputEvent::TouchStart { touches }, 4_100).is_ok());
        assert!(s.hazards().wells_active());
        s
    }

    #[test]
    fn test_hazard_wells_close_at_duration() {
        let mut s = session_with_wells();
        s.update(5_000);
        assert!(s.hazards().wells_active());
        s.update(5_099);
        assert!(s.hazards().wells_active());
        s.update(5_100);
        assert!(!s.hazards().wells_active());
        assert_eq!(s.hazards().accumulator(), 0);
        assert!(s.drain_events().contains(&GameEvent::HazardExpired));
    }

    #[test]
    fn test_hazard_expiry_ignores_poll_cadence() {
        let mut stepped = session_with_wells();
        for now in (4_200..=5_100).step_by(100) {
            stepped.update(now);
        }
        let mut single = session_with_wells();
        single.update(5_100);
        for s in [&stepped, &single] {
            assert!(!s.hazards().wells_active());
            assert_eq!(s.hazards().accumulator(), 0);
        }
    }

    #[test]
    fn test_go_home_abandons_without_credit() {
        let mut s = playing();
        s.award(500, 5_000);
        assert!(s.progression().score() > 0);
        s.go_home(5_100);
        assert_eq!(s.phase(), SessionPhase::Home);
        assert_eq!(s.progression().score(), 0);
        assert_eq!(s.wallet().currency, 0);
        assert_eq!(Wallet::load(s.store()).currency, 0);
        assert!(
            !s.drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::SessionEnded { .. }))
        );
        // Nothing left running
        s.update(10_000);
        assert_eq!(s.phase(), SessionPhase::Home);
        assert_eq!(s.countdown(), None);
    }

    #[test]
    fn test_resize_recentres_well() {
        let mut s = session();
        let viewport = Viewport::new(1024.0, 768.0);
        s.resize(viewport);
        assert_eq!(s.well().pos, viewport.center());
        assert_eq!(s.viewport, viewport);
    }

    #[test]
    fn test_purchase_persists_wallet() {
        let mut s = session();
        s.wallet.currency = 60_000;
        assert!(s.purchase(StoreItem::TimeBooster, 0).is_ok());
        assert!(s.purchase(StoreItem::TimeBooster, 0).is_err());
        let saved = Wallet::load(s.store());
        assert_eq!(saved.currency, 10_000);
        assert_eq!(saved.time_boosters, 1);
    }

    #[test]
    fn test_frames_advance_and_keep_floor() {
        let mut s = session();
        s.update(0);
        for i in 1..=60 {
            s.update(i * 16 + i / 3);
        }
        assert!(s.frames() >= 55);
        assert!(s.field().ambient_count() >= 200);
    }
}
