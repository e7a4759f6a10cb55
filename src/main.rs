//! Cosmic Crush entry point
//!
//! Web builds export a `WebGame` handle that the page drives from its own
//! animation frame and input listeners. Native builds run a headless bot
//! session against a manual clock and log what happens.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use glam::Vec2;
    use wasm_bindgen::prelude::*;

    use cosmic_crush::persistence::{Booster, LocalStorageStore, StoreItem};
    use cosmic_crush::renderer::build_frame;
    use cosmic_crush::sim::{InputEvent, Modifiers};
    use cosmic_crush::{Clock, GameConfig, Session, SystemClock, Viewport};

    /// Game handle owned by the page
    #[wasm_bindgen]
    pub struct WebGame {
        session: Session,
        clock: SystemClock,
    }

    fn points(coords: &[f32]) -> Vec<Vec2> {
        coords
            .chunks_exact(2)
            .map(|xy| Vec2::new(xy[0], xy[1]))
            .collect()
    }

    fn to_json<T: serde::Serialize>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|e| {
            log::warn!("Serialization failed: {}", e);
            String::from("null")
        })
    }

    #[wasm_bindgen]
    impl WebGame {
        #[wasm_bindgen(constructor)]
        pub fn new(width: f32, height: f32, seed: u64, tuning: Option<String>) -> WebGame {
            let config = GameConfig::load_or_default(tuning.as_deref());
            let session = Session::new(
                config,
                Viewport::new(width, height),
                seed,
                Box::new(LocalStorageStore),
            );
            WebGame {
                session,
                clock: SystemClock::new(),
            }
        }

        pub fn start(&mut self) {
            self.session.start(self.clock.now_ms());
        }

        pub fn restart(&mut self) {
            self.session.restart(self.clock.now_ms());
        }

        pub fn end(&mut self) {
            self.session.end(self.clock.now_ms());
        }

        pub fn go_home(&mut self) {
            self.session.go_home(self.clock.now_ms());
        }

        pub fn resize(&mut self, width: f32, height: f32) {
            self.session.resize(Viewport::new(width, height));
        }

        /// Returns true when the page should prevent the browser default
        pub fn key_down(
            &mut self,
            key: String,
            shift: bool,
            ctrl: bool,
            alt: bool,
            meta: bool,
        ) -> bool {
            let modifiers = Modifiers { shift, ctrl, alt, meta };
            let suppress = modifiers.any();
            let _ = self
                .session
                .handle_input(InputEvent::KeyDown { key, modifiers }, self.clock.now_ms());
            suppress
        }

        pub fn key_up(
            &mut self,
            key: String,
            shift: bool,
            ctrl: bool,
            alt: bool,
            meta: bool,
        ) -> bool {
            let modifiers = Modifiers { shift, ctrl, alt, meta };
            let suppress = modifiers.any();
            let _ = self
                .session
                .handle_input(InputEvent::KeyUp { key, modifiers }, self.clock.now_ms());
            suppress
        }

        pub fn pointer_down(&mut self, x: f32, y: f32) {
            let pos = Vec2::new(x, y);
            let _ = self
                .session
                .handle_input(InputEvent::PointerDown { pos }, self.clock.now_ms());
        }

        /// `coords` holds every active touch as flat x, y pairs
        pub fn touch_start(&mut self, coords: Vec<f32>) {
            let touches = points(&coords);
            let _ = self
                .session
                .handle_input(InputEvent::TouchStart { touches }, self.clock.now_ms());
        }

        pub fn touch_end(&mut self, coords: Vec<f32>) {
            let touches = points(&coords);
            let _ = self
                .session
                .handle_input(InputEvent::TouchEnd { touches }, self.clock.now_ms());
        }

        pub fn purchase(&mut self, item: &str) -> bool {
            let item = match item {
                "crush" => StoreItem::CrushBooster,
                "time" => StoreItem::TimeBooster,
                "purge" => StoreItem::Purge,
                other => {
                    log::warn!("Unknown store item '{}'", other);
                    return false;
                }
            };
            self.session.purchase(item, self.clock.now_ms()).is_ok()
        }

        pub fn activate(&mut self, booster: &str) -> bool {
            let now = self.clock.now_ms();
            let result = match booster {
                "crush" => self.session.activate(Booster::Crush, now),
                "time" => self.session.activate(Booster::Time, now),
                "purge" => self.session.activate(Booster::Purge, now),
                "ultimate" => self.session.activate_ultimate(now),
                other => {
                    log::warn!("Unknown booster '{}'", other);
                    return false;
                }
            };
            result.is_ok()
        }

        /// Advance to now and return the frame as JSON
        pub fn frame(&mut self) -> String {
            self.session.update(self.clock.now_ms());
            to_json(&build_frame(&self.session))
        }

        /// Events raised since the last call, as a JSON array
        pub fn events(&mut self) -> String {
            to_json(&self.session.drain_events())
        }

        pub fn console(&self) -> String {
            let lines: Vec<_> = self.session.console().lines().collect();
            to_json(&lines)
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("logger init failed: {}", e).into());
    }
    log::info!("Cosmic Crush starting...");
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use cosmic_crush::persistence::FileStore;
    use cosmic_crush::sim::InputEvent;
    use cosmic_crush::sim::layout::LETTERS;
    use cosmic_crush::{
        Clock, GameConfig, GameEvent, ManualClock, Millis, Session, SessionPhase, Viewport,
    };

    const FRAME_MS: Millis = 16;
    /// One turn in this many is a four-key combo
    const COMBO_ODDS: u32 = 15;

    pub fn run(config: GameConfig, seed: u64) {
        let store = FileStore::new(std::env::temp_dir().join("cosmic-crush"));
        let clock = ManualClock::new(0);
        let mut session = Session::new(config, Viewport::default(), seed, Box::new(store));
        let mut bot = Pcg32::seed_from_u64(seed.wrapping_add(1));

        session.update(clock.now_ms());
        session.start(clock.now_ms());

        let mut next_turn = 0;
        while session.phase() != SessionPhase::Over {
            let now = clock.advance(FRAME_MS);
            session.update(now);
            if session.is_active() && now >= next_turn {
                play_turn(&mut session, &mut bot, now);
                next_turn = now + bot.random_range(80..250);
            }
            for event in session.drain_events() {
                report(&event);
            }
        }

        log::info!(
            "Wallet: {} crush keys, {} crush / {} time boosters, {} purges",
            session.wallet().currency,
            session.wallet().crush_boosters,
            session.wallet().time_boosters,
            session.wallet().purges
        );
    }

    fn play_turn(session: &mut Session, bot: &mut Pcg32, now: Millis) {
        if bot.random_ratio(1, COMBO_ODDS) {
            let letters: Vec<String> = LETTERS.chars().map(String::from).collect();
            let mut picked: Vec<&String> = Vec::with_capacity(4);
            while picked.len() < 4 {
                let key = &letters[bot.random_range(0..letters.len())];
                if !picked.contains(&key) {
                    picked.push(key);
                }
            }
            for key in &picked {
                let _ = session.handle_input(InputEvent::key_down(key), now);
            }
            for key in &picked {
                let _ = session.handle_input(InputEvent::key_up(key), now);
            }
            return;
        }

        // Aim at something visible, otherwise tap at random
        let field = session.field();
        let target = field
            .particles()
            .iter()
            .filter(|p| p.pos.z > 0.0 && p.alpha > 0.0)
            .nth(bot.random_range(0..32))
            .map(|p| field.project(p).pos);
        let pos = target.unwrap_or_else(|| {
            let vp = session.viewport();
            glam::Vec2::new(
                bot.random::<f32>() * vp.width,
                bot.random::<f32>() * vp.height,
            )
        });
        let _ = session.handle_input(InputEvent::PointerDown { pos }, now);
    }

    fn report(event: &GameEvent) {
        match event {
            GameEvent::HighStrike { combo, text, sound, .. } => {
                log::info!("{}!!! ({}) [{}]", text, combo, sound)
            }
            GameEvent::LevelUp { level } => log::info!("Level up -> {}", level),
            GameEvent::SessionEnded { summary } => {
                log::info!("Session over: score {} at level {}", summary.score, summary.level);
                for (text, count) in &summary.combo_stats {
                    log::info!("  {:<6} x{}", text, count);
                }
            }
            other => log::debug!("{:?}", other),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);
    let tuning = args.next().and_then(|path| {
        std::fs::read_to_string(&path)
            .map_err(|e| log::warn!("Cannot read tuning file {}: {}", path, e))
            .ok()
    });
    let config = cosmic_crush::GameConfig::load_or_default(tuning.as_deref());

    log::info!("Cosmic Crush (native, headless) starting with seed {}", seed);
    demo::run(config, seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main
}
