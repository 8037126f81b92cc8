//! Host session
//!
//! Owns the running [`GameState`] plus everything around it that outlives a
//! single run: the frame clock, preferences, and the meta record and its store.

use crate::meta::{MetaError, MetaProgress, MetaUpgrade};
use crate::persistence::MetaStore;
use crate::settings::Settings;
use crate::sim::{
    FrameClock, GameEvent, GamePhase, GameState, RunOutcome, TickInput, UpgradeId, tick,
};
use crate::tuning::Tuning;

/// Runs shorter than this are discarded on restart instead of recorded
const ABANDON_MIN_SECS: f32 = 1.0;

pub struct Session {
    pub state: GameState,
    clock: FrameClock,
    settings: Settings,
    tuning: Tuning,
    store: Option<MetaStore>,
    /// Record as of the last completed run
    meta: MetaProgress,
    /// Whether the current run's result has been written back
    persisted: bool,
}

impl Session {
    /// Start a session, loading the meta record from `store` if given
    pub fn new(tuning: Tuning, settings: Settings, store: Option<MetaStore>, seed: u64) -> Self {
        let meta = store.as_ref().map(MetaStore::load).unwrap_or_default();
        Self::with_meta(tuning, settings, store, meta, seed)
    }

    /// Start a session from an already-loaded record
    pub fn with_meta(
        tuning: Tuning,
        settings: Settings,
        store: Option<MetaStore>,
        meta: MetaProgress,
        seed: u64,
    ) -> Self {
        let mut state = GameState::new(seed, tuning.clone(), meta.clone());
        state.set_effects_budget(settings.effects_budget());
        Self {
            state,
            clock: FrameClock::new(),
            settings,
            tuning,
            store,
            meta,
            persisted: false,
        }
    }

    pub fn meta(&self) -> &MetaProgress {
        &self.meta
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.state.set_effects_budget(settings.effects_budget());
        self.settings = settings;
    }

    pub fn is_paused(&self) -> bool {
        self.state.phase == GamePhase::Paused
    }

    /// Advance one frame from a host timestamp (seconds).
    /// Returns the delta actually stepped.
    ///
    /// Events accumulate until [`Self::drain_events`] is called, so the host
    /// should drain once per frame.
    pub fn frame(&mut self, now_secs: f64, input: &TickInput) -> f32 {
        let dt = self.clock.sample(now_secs);
        tick(&mut self.state, input, dt);
        if self.state.is_over() {
            self.commit_run();
        }
        dt
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state.set_paused(paused);
    }

    pub fn toggle_pause(&mut self) {
        let paused = self.is_paused();
        self.state.set_paused(!paused);
    }

    pub fn choose_upgrade(&mut self, index: usize) -> Option<UpgradeId> {
        self.state.choose_upgrade(index)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.state.drain_events()
    }

    /// Throw away the current run and start a new one.
    /// A run that got going is recorded as abandoned first.
    pub fn restart(&mut self, seed: u64) {
        if !self.state.is_over() && self.state.time > ABANDON_MIN_SECS {
            self.state.end_run(RunOutcome::Abandoned);
        }
        if self.state.is_over() {
            self.commit_run();
        }
        self.state = GameState::new(seed, self.tuning.clone(), self.meta.clone());
        self.state.set_effects_budget(self.settings.effects_budget());
        self.clock.reset();
        self.persisted = false;
    }

    /// Buy a permanent upgrade with banked coins. Applies from the next run.
    pub fn purchase(&mut self, upgrade: MetaUpgrade) -> Result<u32, MetaError> {
        let rank = self.meta.purchase(upgrade)?;
        self.persist();
        Ok(rank)
    }

    /// Fold an ended run into the session record, once.
    /// Purchases made during the run live only in `self.meta`, so the run
    /// is applied to it rather than copied over it.
    fn commit_run(&mut self) {
        if self.persisted {
            return;
        }
        self.persisted = true;
        self.meta.finalize_run(self.state.time, self.state.coins);
        self.persist();
    }

    fn persist(&self) {
        let Some(store) = &self.store else { return };
        if let Err(e) = store.save(&self.meta) {
            log::warn!("Failed to save meta progress: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> MetaStore {
        let path = std::env::temp_dir().join(format!(
            "neon_session_{}_{}.json",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        MetaStore::new(path)
    }

    #[test]
    fn pause_freezes_frames() {
        let mut session = Session::new(Tuning::default(), Settings::default(), None, 1);
        let input = TickInput::default();
        session.frame(0.0, &input);
        session.frame(0.016, &input);
        let t = session.state.time;
        assert!(t > 0.0);

        session.toggle_pause();
        assert!(session.is_paused());
        session.frame(0.032, &input);
        assert_eq!(session.state.time, t);

        session.toggle_pause();
        session.frame(0.048, &input);
        assert!(session.state.time > t);
    }

    #[test]
    fn finished_run_is_persisted_once() {
        let store = temp_store("finish");
        let path = store.path().to_path_buf();
        let tuning = Tuning {
            run_goal_secs: 1.0,
            ..Tuning::default()
        };
        let mut session = Session::new(tuning, Settings::default(), Some(store), 9);

        let input = TickInput::default();
        let mut now = 0.0;
        while !session.state.is_over() && now < 10.0 {
            session.frame(now, &input);
            if session.state.phase == GamePhase::ChoosingUpgrade {
                session.choose_upgrade(0);
            }
            now += 1.0 / 60.0;
        }
        assert_eq!(session.state.outcome, Some(RunOutcome::Victory));
        assert_eq!(session.meta().best_time, 1);

        let reloaded = MetaStore::new(&path).load();
        assert_eq!(reloaded, *session.meta());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn restart_mid_run_records_abandon() {
        let mut session = Session::new(Tuning::default(), Settings::default(), None, 2);
        session.state.time = 12.4;
        session.state.coins = 3;
        session.restart(3);

        assert_eq!(session.meta().last_time, 12);
        assert_eq!(session.meta().bank, 3);
        assert_eq!(session.state.time, 0.0);
        assert_eq!(session.state.meta, *session.meta());
    }

    #[test]
    fn quick_restart_is_not_recorded() {
        let mut session = Session::new(Tuning::default(), Settings::default(), None, 4);
        session.state.time = 0.5;
        session.restart(5);
        assert_eq!(*session.meta(), MetaProgress::default());
    }

    #[test]
    fn purchases_apply_to_next_run() {
        let meta = MetaProgress {
            bank: 30,
            ..Default::default()
        };
        let mut session = Session::with_meta(Tuning::default(), Settings::default(), None, meta, 6);
        assert_eq!(session.purchase(MetaUpgrade::Hp), Ok(1));
        assert_eq!(session.state.player.hp_max, 100.0);
        assert!(matches!(
            session.purchase(MetaUpgrade::Hp),
            Err(MetaError::InsufficientFunds { .. })
        ));

        session.restart(7);
        assert_eq!(session.state.player.hp_max, 110.0);
    }

    #[test]
    fn mid_run_purchase_survives_restart() {
        let store = temp_store("purchase");
        let path = store.path().to_path_buf();
        let meta = MetaProgress {
            bank: 30,
            ..Default::default()
        };
        let mut session =
            Session::with_meta(Tuning::default(), Settings::default(), Some(store), meta, 6);
        session.state.time = 5.0;
        session.state.coins = 4;
        assert_eq!(session.purchase(MetaUpgrade::Hp), Ok(1));
        assert_eq!(session.meta().bank, 5);

        session.restart(7);
        assert_eq!(session.meta().ranks.hp, 1);
        assert_eq!(session.meta().bank, 9);
        assert_eq!(session.meta().last_time, 5);
        assert_eq!(session.state.player.hp_max, 110.0);

        let reloaded = MetaStore::new(&path).load();
        assert_eq!(reloaded, *session.meta());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn settings_flow_into_effects_budget() {
        let mut settings = Settings::default();
        settings.damage_numbers = false;
        let session = Session::new(Tuning::default(), settings, None, 8);
        assert!(!session.state.events.damage_numbers);
    }
}
