// src/engine.rs

use crate::config::EngineConfig;
use crate::diagnosis;
use crate::difficulty::DifficultyTracker;
use crate::generator::CandidateGenerator;
use crate::models::{AnswerOutcome, Operation, ProblemIdentity, SkillTier};
use crate::performance::PerformanceStore;
use crate::selector::{ScoringContext, Selector};
use crate::stats::{ProfileState, StatsSnapshot};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// --- Public Interface ---

/// One learner profile's adaptive practice loop: pick a problem, score the
/// answer, adjust.
///
/// The engine exclusively owns its store and tracker. Selecting without
/// answering leaves both untouched.
pub struct Engine<R = ChaCha8Rng> {
    config: EngineConfig,
    store: PerformanceStore,
    tracker: DifficultyTracker,
    generator: CandidateGenerator,
    selector: Selector,
    rng: R,
}

impl Engine<ChaCha8Rng> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_profile(config, ProfileState::default())
    }

    /// Seeded from `config.seed` when set, from OS entropy otherwise.
    pub fn with_profile(config: EngineConfig, profile: ProfileState) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, profile, rng)
    }
}

impl<R: Rng> Engine<R> {
    pub fn with_rng(config: EngineConfig, profile: ProfileState, rng: R) -> Self {
        let store = PerformanceStore::restore(
            config.typing,
            &config.selection,
            profile.records,
            profile.history,
        );
        let tracker = DifficultyTracker::restore(&config, profile.difficulty);
        info!(
            "Engine ready: {} records, operations {:?}",
            store.len(),
            config.enabled_operations()
        );
        Engine {
            generator: CandidateGenerator::new(&config),
            selector: Selector::new(&config.selection),
            config,
            store,
            tracker,
            rng,
        }
    }

    /// Swaps in another profile (and its settings) without rebuilding the random source.
    pub fn reload(&mut self, config: EngineConfig, profile: ProfileState) {
        self.store = PerformanceStore::restore(
            config.typing,
            &config.selection,
            profile.records,
            profile.history,
        );
        self.tracker = DifficultyTracker::restore(&config, profile.difficulty);
        self.generator = CandidateGenerator::new(&config);
        self.selector = Selector::new(&config.selection);
        self.config = config;
        info!("Engine reloaded: {} records", self.store.len());
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn next_problem(&mut self) -> ProblemIdentity {
        self.next_problem_at(Utc::now())
    }

    pub fn next_problem_at(&mut self, now: DateTime<Utc>) -> ProblemIdentity {
        let enabled = self.config.enabled_operations();
        debug!("Requesting next problem for {:?}", enabled);

        let candidates = self.generator.generate(&enabled, &self.tracker, &mut self.rng);
        let ctx = ScoringContext {
            store: &self.store,
            tracker: &self.tracker,
            tier: self.tracker.skill_tier(&enabled),
            focus: diagnosis::diagnose(self.store.history()),
            now,
        };
        if let Some(pattern) = ctx.focus {
            debug!("Targeting error pattern {:?}", pattern);
        }
        self.selector.select(&candidates, &ctx, &mut self.rng)
    }

    pub fn submit_answer(
        &mut self,
        identity: ProblemIdentity,
        user_answer: i64,
        elapsed_ms: u64,
    ) -> AnswerOutcome {
        self.submit_answer_at(identity, user_answer, elapsed_ms, Utc::now())
    }

    pub fn submit_answer_at(
        &mut self,
        identity: ProblemIdentity,
        user_answer: i64,
        elapsed_ms: u64,
        now: DateTime<Utc>,
    ) -> AnswerOutcome {
        let expected = identity.expected_answer();
        let correct = user_answer == expected;
        info!(
            "Processing answer for {}: got {}, expected {} ({} ms)",
            identity, user_answer, expected, elapsed_ms
        );

        let normalized_secs = self.store.update(identity, correct, elapsed_ms, now);
        let level_change = self
            .tracker
            .on_answer(identity.operation, correct, normalized_secs);

        AnswerOutcome {
            correct,
            expected,
            normalized_secs,
            level_change,
        }
    }

    pub fn current_difficulty(&self, op: Operation) -> u8 {
        self.tracker.level(op)
    }

    pub fn set_difficulty(&mut self, op: Operation, level: u8) -> u8 {
        self.tracker.set_level(op, level)
    }

    pub fn skill_tier(&self) -> SkillTier {
        self.tracker.skill_tier(&self.config.enabled_operations())
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::build(&self.store, &self.tracker, self.skill_tier())
    }

    /// Serializable state for the persistence layer.
    pub fn profile_state(&self) -> ProfileState {
        ProfileState {
            records: self.store.entries(),
            difficulty: self.tracker.states().clone(),
            history: self.store.history().iter().cloned().collect(),
        }
    }

    /// Drops all per-problem statistics and returns every operation to its starting level.
    pub fn reset_statistics(&mut self) {
        self.store.reset();
        self.tracker.reset();
        self.selector.clear();
        info!("Statistics reset");
    }
}
