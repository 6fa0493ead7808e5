// src/difficulty.rs

use crate::config::EngineConfig;
use crate::constants::*;
use crate::models::{DifficultyState, LevelChange, Operation, RecentAnswer, SkillTier};
use log::{debug, info};
use std::collections::BTreeMap;

/// Operand limits for one operation at its current level.
///
/// For division `min_operand..=max_operand` bounds both the divisor (unless
/// `divisors` pins it) and the quotient; the dividend is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct OperandBounds {
    pub operation: Operation,
    pub level: u8,
    pub min_operand: i64,
    pub max_operand: i64,
    pub divisors: Option<Vec<i64>>,
    pub non_negative: bool,
}

/// Per-operation adaptive level with streak-driven promotion and demotion.
#[derive(Debug, Clone)]
pub struct DifficultyTracker {
    config: EngineConfig,
    states: BTreeMap<Operation, DifficultyState>,
}

impl DifficultyTracker {
    pub fn new(config: &EngineConfig) -> Self {
        let states = Operation::ALL
            .iter()
            .map(|op| {
                let level = config.operation(*op).start_level();
                (*op, DifficultyState::at_level(level))
            })
            .collect();
        DifficultyTracker {
            config: config.clone(),
            states,
        }
    }

    /// Starts from persisted states; levels outside the configured range are clamped
    /// and operations missing from the snapshot start fresh.
    pub fn restore(config: &EngineConfig, persisted: BTreeMap<Operation, DifficultyState>) -> Self {
        let mut tracker = DifficultyTracker::new(config);
        for (op, mut state) in persisted {
            let clamped = config.operation(op).clamp_level(state.level);
            if clamped != state.level {
                debug!(
                    "[Difficulty] {} persisted level {} clamped to {}",
                    op, state.level, clamped
                );
                state.level = clamped;
            }
            while state.recent.len() > DIFFICULTY_WINDOW {
                state.recent.pop_front();
            }
            tracker.states.insert(op, state);
        }
        tracker
    }

    pub fn level(&self, op: Operation) -> u8 {
        self.states
            .get(&op)
            .map(|s| s.level)
            .unwrap_or_else(|| self.config.operation(op).start_level())
    }

    pub fn state(&self, op: Operation) -> Option<&DifficultyState> {
        self.states.get(&op)
    }

    pub fn states(&self) -> &BTreeMap<Operation, DifficultyState> {
        &self.states
    }

    pub fn bounds_for(&self, op: Operation) -> OperandBounds {
        let cfg = self.config.operation(op);
        let level = self.level(op);
        OperandBounds {
            operation: op,
            level,
            min_operand: cfg.min_operand,
            max_operand: cfg.max_operand_at(level),
            divisors: match op {
                Operation::Division => cfg.divisors.clone(),
                _ => None,
            },
            non_negative: op == Operation::Subtraction && !self.config.allow_negative,
        }
    }

    pub fn on_answer(&mut self, op: Operation, correct: bool, normalized_secs: f64) -> LevelChange {
        let cfg = self.config.operation(op);
        let state = self
            .states
            .entry(op)
            .or_insert_with(|| DifficultyState::at_level(cfg.start_level()));

        if state.recent.len() >= DIFFICULTY_WINDOW {
            state.recent.pop_front();
        }
        state.recent.push_back(RecentAnswer {
            correct,
            normalized_secs,
        });

        let fast = correct && normalized_secs <= cfg.fast_secs;
        let slow = !correct || normalized_secs >= cfg.slow_secs;
        state.fast_streak = if fast { state.fast_streak + 1 } else { 0 };
        state.slow_streak = if slow { state.slow_streak + 1 } else { 0 };

        debug!(
            "[Difficulty] {} answer: correct={}, {:.2}s, fast streak {}, slow streak {}",
            op, correct, normalized_secs, state.fast_streak, state.slow_streak
        );

        let from = state.level;
        if state.fast_streak >= cfg.promote_streak() {
            state.fast_streak = 0;
            state.slow_streak = 0;
            let to = cfg.clamp_level(from.saturating_add(1));
            if to == from {
                debug!("[Difficulty] {} already at max level {}", op, from);
                return LevelChange::Unchanged;
            }
            state.level = to;
            info!("[Difficulty] {} promoted: {} -> {}", op, from, to);
            LevelChange::Promoted { from, to }
        } else if state.slow_streak >= cfg.demote_streak() {
            state.fast_streak = 0;
            state.slow_streak = 0;
            let to = cfg.clamp_level(from.saturating_sub(1));
            if to == from {
                debug!("[Difficulty] {} already at min level {}", op, from);
                return LevelChange::Unchanged;
            }
            state.level = to;
            info!("[Difficulty] {} demoted: {} -> {}", op, from, to);
            LevelChange::Demoted { from, to }
        } else {
            LevelChange::Unchanged
        }
    }

    /// Manual override; clamps into range and clears both streaks.
    pub fn set_level(&mut self, op: Operation, level: u8) -> u8 {
        let cfg = self.config.operation(op);
        let clamped = cfg.clamp_level(level);
        let state = self
            .states
            .entry(op)
            .or_insert_with(|| DifficultyState::at_level(clamped));
        state.level = clamped;
        state.fast_streak = 0;
        state.slow_streak = 0;
        info!("[Difficulty] {} set to level {}", op, clamped);
        clamped
    }

    /// Coarse tier from the mean level of the given operations (all when empty).
    pub fn skill_tier(&self, operations: &[Operation]) -> SkillTier {
        let ops: &[Operation] = if operations.is_empty() {
            &Operation::ALL
        } else {
            operations
        };
        let mean = ops.iter().map(|op| self.level(*op) as f64).sum::<f64>() / ops.len() as f64;
        if mean <= TIER_BEGINNER_MAX_LEVEL {
            SkillTier::Beginner
        } else if mean <= TIER_INTERMEDIATE_MAX_LEVEL {
            SkillTier::Intermediate
        } else {
            SkillTier::Advanced
        }
    }

    pub fn reset(&mut self) {
        *self = DifficultyTracker::new(&self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperationConfig;

    fn tracker_with(op: Operation, cfg: OperationConfig) -> DifficultyTracker {
        let mut config = EngineConfig::default();
        config.operations.insert(op, cfg);
        DifficultyTracker::new(&config)
    }

    #[test]
    fn k_fast_answers_promote_one_level() {
        let mut tracker = DifficultyTracker::new(&EngineConfig::default());
        for _ in 0..PROMOTE_STREAK_DEFAULT - 1 {
            assert_eq!(tracker.on_answer(Operation::Addition, true, 1.0), LevelChange::Unchanged);
        }
        assert_eq!(
            tracker.on_answer(Operation::Addition, true, 1.0),
            LevelChange::Promoted { from: 1, to: 2 }
        );
        let state = tracker.state(Operation::Addition).unwrap();
        assert_eq!((state.fast_streak, state.slow_streak), (0, 0));
        assert_eq!(tracker.level(Operation::Subtraction), 1);
    }

    #[test]
    fn a_miss_resets_the_streak_without_changing_level() {
        let mut tracker = DifficultyTracker::new(&EngineConfig::default());
        for _ in 0..3 {
            tracker.on_answer(Operation::Addition, true, 1.0);
        }
        assert_eq!(tracker.on_answer(Operation::Addition, false, 1.0), LevelChange::Unchanged);
        let state = tracker.state(Operation::Addition).unwrap();
        assert_eq!(state.fast_streak, 0);
        assert_eq!(state.level, 1);
    }

    #[test]
    fn correct_but_moderate_breaks_both_streaks() {
        let mut tracker = DifficultyTracker::new(&EngineConfig::default());
        tracker.on_answer(Operation::Addition, true, 1.0);
        tracker.on_answer(Operation::Addition, false, 1.0);
        tracker.on_answer(Operation::Addition, true, 5.0);
        let state = tracker.state(Operation::Addition).unwrap();
        assert_eq!((state.fast_streak, state.slow_streak), (0, 0));
    }

    #[test]
    fn slow_or_wrong_streak_demotes() {
        let cfg = OperationConfig {
            initial_level: 4,
            ..OperationConfig::default_for(Operation::Division)
        };
        let mut tracker = tracker_with(Operation::Division, cfg);
        tracker.on_answer(Operation::Division, false, 1.0);
        tracker.on_answer(Operation::Division, true, 30.0);
        assert_eq!(
            tracker.on_answer(Operation::Division, false, 2.0),
            LevelChange::Demoted { from: 4, to: 3 }
        );
    }

    #[test]
    fn promotion_at_max_is_noop_but_resets() {
        let cfg = OperationConfig {
            min_level: 1,
            max_level: 2,
            initial_level: 2,
            promote_streak: 2,
            ..OperationConfig::default()
        };
        let mut tracker = tracker_with(Operation::Addition, cfg);
        tracker.on_answer(Operation::Addition, true, 0.5);
        assert_eq!(tracker.on_answer(Operation::Addition, true, 0.5), LevelChange::Unchanged);
        let state = tracker.state(Operation::Addition).unwrap();
        assert_eq!((state.level, state.fast_streak), (2, 0));
    }

    #[test]
    fn demotion_at_min_is_noop() {
        let mut tracker = DifficultyTracker::new(&EngineConfig::default());
        for _ in 0..DEMOTE_STREAK_DEFAULT {
            assert_eq!(tracker.on_answer(Operation::Addition, false, 1.0), LevelChange::Unchanged);
        }
        assert_eq!(tracker.level(Operation::Addition), LEVEL_MIN);
        assert_eq!(tracker.state(Operation::Addition).unwrap().slow_streak, 0);
    }

    #[test]
    fn restore_clamps_out_of_range_levels() {
        let mut persisted = BTreeMap::new();
        persisted.insert(Operation::Multiplication, DifficultyState::at_level(42));
        let tracker = DifficultyTracker::restore(&EngineConfig::default(), persisted);
        assert_eq!(tracker.level(Operation::Multiplication), LEVEL_MAX);
        assert_eq!(tracker.level(Operation::Addition), LEVEL_MIN);
    }

    #[test]
    fn bounds_follow_level() {
        let mut tracker = DifficultyTracker::new(&EngineConfig::default());
        let low = tracker.bounds_for(Operation::Addition);
        tracker.set_level(Operation::Addition, 6);
        let high = tracker.bounds_for(Operation::Addition);
        assert!(high.max_operand > low.max_operand);
        assert!(tracker.bounds_for(Operation::Subtraction).non_negative);
    }

    #[test]
    fn skill_tier_uses_mean_level() {
        let mut tracker = DifficultyTracker::new(&EngineConfig::default());
        assert_eq!(tracker.skill_tier(&[]), SkillTier::Beginner);
        tracker.set_level(Operation::Addition, 9);
        tracker.set_level(Operation::Multiplication, 9);
        assert_eq!(
            tracker.skill_tier(&[Operation::Addition, Operation::Multiplication]),
            SkillTier::Advanced
        );
        assert_eq!(tracker.skill_tier(&Operation::ALL), SkillTier::Intermediate);
    }
}
