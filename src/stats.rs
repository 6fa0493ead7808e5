// src/stats.rs

use crate::constants::PATTERN_TABLE_VERSION;
use crate::difficulty::DifficultyTracker;
use crate::models::{AttemptEntry, DifficultyState, Operation, SkillTier};
use crate::performance::{PerformanceStore, RecordEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const RECENT_TREND_LEN: usize = 10;

/// Everything that survives a restart for one learner profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileState {
    pub records: Vec<RecordEntry>,
    pub difficulty: BTreeMap<Operation, DifficultyState>,
    pub history: Vec<AttemptEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub level: u8,
    pub attempts: u32,
    pub accuracy: Option<f64>,
    /// Over every attempt ever recorded.
    pub mean_secs: Option<f64>,
    /// Over the attempts still in the bounded history only.
    pub median_secs: Option<f64>,
    /// Same window as `median_secs`.
    pub std_dev_secs: Option<f64>,
}

/// Read-only view handed to the statistics display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub records: Vec<RecordEntry>,
    pub difficulty: BTreeMap<Operation, DifficultyState>,
    pub summaries: BTreeMap<Operation, OperationSummary>,
    pub longest_streak: u32,
    pub recent_accuracy: Option<f64>,
    pub recent_mean_secs: Option<f64>,
    pub skill_tier: SkillTier,
    pub pattern_table_version: u32,
}

impl StatsSnapshot {
    pub fn build(store: &PerformanceStore, tracker: &DifficultyTracker, tier: SkillTier) -> Self {
        let history: Vec<&AttemptEntry> = store.history().iter().collect();

        let summaries = Operation::ALL
            .iter()
            .map(|op| (*op, summarize(*op, store, tracker, &history)))
            .collect();

        let recent: Vec<&AttemptEntry> = history
            .iter()
            .rev()
            .take(RECENT_TREND_LEN)
            .copied()
            .collect();
        let recent_accuracy = if recent.is_empty() {
            None
        } else {
            Some(recent.iter().filter(|e| e.correct).count() as f64 / recent.len() as f64)
        };
        let recent_secs: Vec<f64> = recent.iter().map(|e| e.normalized_secs).collect();

        StatsSnapshot {
            records: store.entries(),
            difficulty: tracker.states().clone(),
            summaries,
            longest_streak: longest_streak(&history),
            recent_accuracy,
            recent_mean_secs: mean(&recent_secs),
            skill_tier: tier,
            pattern_table_version: PATTERN_TABLE_VERSION,
        }
    }
}

fn summarize(
    op: Operation,
    store: &PerformanceStore,
    tracker: &DifficultyTracker,
    history: &[&AttemptEntry],
) -> OperationSummary {
    let (attempts, correct, weighted_secs) = store
        .iter()
        .filter(|(id, _)| id.operation == op)
        .fold((0u32, 0u32, 0.0), |(attempts, correct, secs), (_, r)| {
            (
                attempts + r.attempts,
                correct + r.correct,
                secs + r.avg_normalized_secs * r.attempts as f64,
            )
        });

    let mut times: Vec<f64> = history
        .iter()
        .filter(|e| e.identity.operation == op)
        .map(|e| e.normalized_secs)
        .collect();
    times.sort_by(|a, b| a.total_cmp(b));

    OperationSummary {
        level: tracker.level(op),
        attempts,
        accuracy: (attempts > 0).then(|| correct as f64 / attempts as f64),
        mean_secs: (attempts > 0).then(|| weighted_secs / attempts as f64),
        median_secs: median(&times),
        std_dev_secs: std_dev(&times),
    }
}

fn longest_streak(history: &[&AttemptEntry]) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    for entry in history {
        if entry.correct {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Expects `sorted` in ascending order.
fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Sample standard deviation; needs at least two values.
fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::ProblemIdentity;
    use chrono::Utc;

    #[test]
    fn median_and_std_dev() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[1.0, 3.0, 8.0]), Some(3.0));
        assert_eq!(median(&[1.0, 3.0]), Some(2.0));
        assert_eq!(std_dev(&[4.0]), None);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138).abs() < 1e-3);
    }

    #[test]
    fn snapshot_summarizes_per_operation() {
        let config = EngineConfig::default();
        let mut store = PerformanceStore::new(config.typing, &config.selection);
        let tracker = DifficultyTracker::new(&config);
        let now = Utc::now();
        let add = ProblemIdentity::new(Operation::Addition, 3, 4);
        let mul = ProblemIdentity::new(Operation::Multiplication, 6, 7);
        store.update(add, true, 2_000, now);
        store.update(add, true, 2_000, now);
        store.update(mul, false, 4_000, now);
        store.update(add, true, 2_000, now);

        let snap = StatsSnapshot::build(&store, &tracker, SkillTier::Beginner);
        let add_summary = &snap.summaries[&Operation::Addition];
        assert_eq!(add_summary.attempts, 3);
        assert_eq!(add_summary.accuracy, Some(1.0));
        assert_eq!(snap.summaries[&Operation::Multiplication].accuracy, Some(0.0));
        assert_eq!(snap.summaries[&Operation::Division].attempts, 0);
        assert_eq!(snap.longest_streak, 2);
        assert_eq!(snap.recent_accuracy, Some(0.75));
        assert_eq!(snap.records.len(), 2);
        assert_eq!(snap.pattern_table_version, PATTERN_TABLE_VERSION);
    }

    #[test]
    fn spread_uses_history_window_and_mean_uses_all_attempts() {
        let mut config = EngineConfig::default();
        config.selection.history_capacity = 2;
        let mut store = PerformanceStore::new(config.typing, &config.selection);
        let tracker = DifficultyTracker::new(&config);
        let now = Utc::now();
        let p = ProblemIdentity::new(Operation::Addition, 3, 4);
        // Answer "7" costs 0.7 s of typing.
        for ms in [9_700, 2_700, 4_700] {
            store.update(p, true, ms, now);
        }

        let summary = &StatsSnapshot::build(&store, &tracker, SkillTier::Beginner).summaries
            [&Operation::Addition];
        assert_eq!(summary.attempts, 3);
        assert!((summary.mean_secs.unwrap() - 5.0).abs() < 1e-9);
        assert!((summary.median_secs.unwrap() - 3.0).abs() < 1e-9);
        assert!((summary.std_dev_secs.unwrap() - 2f64.sqrt()).abs() < 1e-9);
    }
}
