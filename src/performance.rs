// src/performance.rs

use crate::config::{SelectionConfig, TypingModel};
use crate::models::{AttemptEntry, Operation, PerformanceRecord, ProblemIdentity};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Per-problem history, keyed by identity, plus a short chronological log
/// of attempts across all problems.
#[derive(Debug, Clone)]
pub struct PerformanceStore {
    records: HashMap<ProblemIdentity, PerformanceRecord>,
    history: VecDeque<AttemptEntry>,
    typing: TypingModel,
    recent_capacity: usize,
    history_capacity: usize,
}

/// Serialized form of one record; JSON maps need string keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub identity: ProblemIdentity,
    pub record: PerformanceRecord,
}

impl PerformanceStore {
    pub fn new(typing: TypingModel, selection: &SelectionConfig) -> Self {
        PerformanceStore {
            records: HashMap::new(),
            history: VecDeque::new(),
            typing,
            recent_capacity: selection.recent_outcome_capacity.max(1),
            history_capacity: selection.history_capacity.max(1),
        }
    }

    /// Rebuilds a store from persisted entries. Later duplicates of an
    /// identity replace earlier ones so the one-record-per-identity rule holds.
    pub fn restore(
        typing: TypingModel,
        selection: &SelectionConfig,
        entries: Vec<RecordEntry>,
        history: Vec<AttemptEntry>,
    ) -> Self {
        let mut store = PerformanceStore::new(typing, selection);
        for entry in entries {
            let mut record = entry.record;
            while record.recent.len() > store.recent_capacity {
                record.recent.pop_front();
            }
            store.records.insert(entry.identity, record);
        }
        let skip = history.len().saturating_sub(store.history_capacity);
        store.history = history.into_iter().skip(skip).collect();
        store
    }

    /// Read-only lookup; never creates a record.
    pub fn get(&self, identity: &ProblemIdentity) -> Option<&PerformanceRecord> {
        self.records.get(identity)
    }

    /// Record for `identity`, created in zero state on first access.
    pub fn record(&mut self, identity: ProblemIdentity) -> &PerformanceRecord {
        self.records.entry(identity).or_default()
    }

    /// Scores one answer into the identity's record and the attempt log.
    /// Returns the normalized solve time in seconds.
    pub fn update(
        &mut self,
        identity: ProblemIdentity,
        correct: bool,
        raw_elapsed_ms: u64,
        now: DateTime<Utc>,
    ) -> f64 {
        let normalized = self
            .typing
            .normalize(raw_elapsed_ms, identity.expected_answer());
        let capacity = self.recent_capacity;
        let record = self.records.entry(identity).or_default();

        record.attempts += 1;
        if correct {
            record.correct += 1;
        } else {
            record.incorrect += 1;
        }
        if record.recent.len() >= capacity {
            record.recent.pop_front();
        }
        record.recent.push_back(correct);
        record.avg_normalized_secs +=
            (normalized - record.avg_normalized_secs) / record.attempts as f64;
        record.last_seen = Some(now);

        debug!(
            "[Store] {}: attempts {}, correct {}, avg {:.2}s",
            identity, record.attempts, record.correct, record.avg_normalized_secs
        );

        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(AttemptEntry {
            identity,
            correct,
            normalized_secs: normalized,
            answered_at: now,
        });

        normalized
    }

    /// Mean of the per-problem average times for one operation, if any were answered.
    pub fn operation_mean_secs(&self, operation: Operation) -> Option<f64> {
        let (sum, count) = self
            .records
            .iter()
            .filter(|(id, r)| id.operation == operation && !r.is_unseen())
            .fold((0.0, 0usize), |(sum, count), (_, r)| {
                (sum + r.avg_normalized_secs, count + 1)
            });
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn history(&self) -> &VecDeque<AttemptEntry> {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProblemIdentity, &PerformanceRecord)> {
        self.records.iter()
    }

    /// Entries sorted by identity, for stable snapshots.
    pub fn entries(&self) -> Vec<RecordEntry> {
        let mut entries: Vec<RecordEntry> = self
            .records
            .iter()
            .map(|(identity, record)| RecordEntry {
                identity: *identity,
                record: record.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.identity.cmp(&b.identity));
        entries
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.history.clear();
    }
}
