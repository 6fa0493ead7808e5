// src/config.rs

use crate::constants::*;
use crate::error::Result;
use crate::models::Operation;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Everything the engine is told from outside: which operations are on,
/// how levels map to operand ranges, and the tunables of the scoring model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub allow_negative: bool,
    pub operations: BTreeMap<Operation, OperationConfig>,
    pub typing: TypingModel,
    pub selection: SelectionConfig,
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            allow_negative: false,
            operations: Operation::ALL
                .iter()
                .map(|op| (*op, OperationConfig::default_for(*op)))
                .collect(),
            typing: TypingModel::default(),
            selection: SelectionConfig::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading engine config from {:?}", path);
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Config for `op`, falling back to the built-in defaults when absent.
    pub fn operation(&self, op: Operation) -> OperationConfig {
        self.operations
            .get(&op)
            .cloned()
            .unwrap_or_else(|| OperationConfig::default_for(op))
    }

    pub fn enabled_operations(&self) -> Vec<Operation> {
        Operation::ALL
            .iter()
            .copied()
            .filter(|op| self.operation(*op).enabled)
            .collect()
    }

    /// Only `op` enabled, every other operation switched off.
    pub fn only(mut self, op: Operation) -> Self {
        for candidate in Operation::ALL {
            let mut cfg = self.operation(candidate);
            cfg.enabled = candidate == op;
            self.operations.insert(candidate, cfg);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationConfig {
    pub enabled: bool,
    pub min_level: u8,
    pub max_level: u8,
    pub initial_level: u8,
    /// Smallest operand (or factor/divisor/quotient) ever generated.
    pub min_operand: i64,
    /// Operand ceiling at the lowest level.
    pub base_max_operand: i64,
    /// Multiplicative growth of the ceiling per level.
    pub operand_growth: f64,
    /// Fixed divisor set for division; overrides the level-derived divisor range.
    pub divisors: Option<Vec<i64>>,
    pub promote_streak: u32,
    pub demote_streak: u32,
    /// Normalized seconds at or under which a correct answer counts as fast.
    pub fast_secs: f64,
    /// Normalized seconds at or over which any answer counts as slow.
    pub slow_secs: f64,
}

impl Default for OperationConfig {
    fn default() -> Self {
        OperationConfig::default_for(Operation::Addition)
    }
}

impl OperationConfig {
    pub fn default_for(op: Operation) -> Self {
        let (min_operand, base_max_operand, operand_growth, fast_secs, slow_secs) = match op {
            Operation::Addition => (1, 10, 1.25, 3.0, 8.0),
            Operation::Subtraction => (1, 10, 1.25, 3.5, 9.0),
            Operation::Multiplication => (2, 5, 1.2, 3.5, 9.0),
            Operation::Division => (2, 5, 1.2, 4.0, 10.0),
        };
        OperationConfig {
            enabled: true,
            min_level: LEVEL_MIN,
            max_level: LEVEL_MAX,
            initial_level: LEVEL_MIN,
            min_operand,
            base_max_operand,
            operand_growth,
            divisors: None,
            promote_streak: PROMOTE_STREAK_DEFAULT,
            demote_streak: DEMOTE_STREAK_DEFAULT,
            fast_secs,
            slow_secs,
        }
    }

    /// `(min, max)` with a swapped pair repaired.
    pub fn level_range(&self) -> (u8, u8) {
        if self.min_level <= self.max_level {
            (self.min_level, self.max_level)
        } else {
            (self.max_level, self.min_level)
        }
    }

    pub fn clamp_level(&self, level: u8) -> u8 {
        let (lo, hi) = self.level_range();
        level.clamp(lo, hi)
    }

    pub fn start_level(&self) -> u8 {
        self.clamp_level(self.initial_level)
    }

    /// Operand ceiling at `level`: `base * growth^(level - 1)`, rounded.
    pub fn max_operand_at(&self, level: u8) -> i64 {
        let steps = level.saturating_sub(1) as i32;
        let growth = if self.operand_growth.is_finite() {
            self.operand_growth
        } else {
            1.0
        };
        let ceiling = self.base_max_operand as f64 * growth.powi(steps);
        if ceiling.is_finite() {
            ceiling.round() as i64
        } else {
            self.base_max_operand
        }
    }

    pub fn promote_streak(&self) -> u32 {
        self.promote_streak.max(1)
    }

    pub fn demote_streak(&self) -> u32 {
        self.demote_streak.max(1)
    }
}

/// Estimated mechanical typing cost, removed from raw solve time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingModel {
    pub base_secs: f64,
    pub per_char_secs: f64,
    pub floor_secs: f64,
}

impl Default for TypingModel {
    fn default() -> Self {
        TypingModel {
            base_secs: TYPING_BASE_SECS,
            per_char_secs: TYPING_PER_CHAR_SECS,
            floor_secs: NORMALIZED_TIME_FLOOR_SECS,
        }
    }
}

impl TypingModel {
    /// Seconds needed to type `answer`, sign included.
    pub fn overhead_secs(&self, answer: i64) -> f64 {
        let chars = answer.to_string().len();
        self.base_secs + chars as f64 * self.per_char_secs
    }

    pub fn normalize(&self, raw_elapsed_ms: u64, answer: i64) -> f64 {
        let raw_secs = raw_elapsed_ms as f64 / 1000.0;
        let floor = if self.floor_secs > 0.0 {
            self.floor_secs
        } else {
            NORMALIZED_TIME_FLOOR_SECS
        };
        (raw_secs - self.overhead_secs(answer)).max(floor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub recent_outcome_capacity: usize,
    pub history_capacity: usize,
    pub variety_window: usize,
    pub answer_repeat_window: usize,
    pub operand_recency_window: usize,
    pub enumeration_limit: usize,
    pub sample_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            recent_outcome_capacity: RECENT_OUTCOME_CAPACITY,
            history_capacity: HISTORY_CAPACITY,
            variety_window: VARIETY_WINDOW,
            answer_repeat_window: ANSWER_REPEAT_WINDOW,
            operand_recency_window: OPERAND_RECENCY_WINDOW,
            enumeration_limit: ENUMERATION_LIMIT,
            sample_size: SAMPLE_SIZE,
        }
    }
}

impl SelectionConfig {
    /// Length of the selection memory the variety factor needs.
    pub fn memory_len(&self) -> usize {
        self.variety_window
            .max(self.answer_repeat_window)
            .max(self.operand_recency_window)
    }
}
