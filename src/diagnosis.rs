// src/diagnosis.rs

use crate::constants::*;
use crate::models::{AttemptEntry, Operation, ProblemIdentity};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A recurring kind of mistake worth targeting directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPattern {
    Carrying,
    Borrowing,
    MultiplicationTables,
    LargeNumbers,
}

impl ErrorPattern {
    const ALL: [ErrorPattern; 4] = [
        ErrorPattern::Carrying,
        ErrorPattern::Borrowing,
        ErrorPattern::MultiplicationTables,
        ErrorPattern::LargeNumbers,
    ];

    pub fn matches(&self, p: &ProblemIdentity) -> bool {
        let (left, right) = (p.left(), p.right());
        match self {
            ErrorPattern::Carrying => {
                p.operation == Operation::Addition
                    && (left >= 10 || right >= 10)
                    && left.rem_euclid(10) + right.rem_euclid(10) >= 10
            }
            ErrorPattern::Borrowing => {
                p.operation == Operation::Subtraction
                    && left >= 10
                    && left.rem_euclid(10) < right.rem_euclid(10)
            }
            ErrorPattern::MultiplicationTables => {
                p.operation == Operation::Multiplication
                    && (1..=12).contains(&left)
                    && (1..=12).contains(&right)
            }
            ErrorPattern::LargeNumbers => left > 100 || right > 100,
        }
    }
}

/// Most frequent pattern among recent errors, if one clearly dominates.
pub fn diagnose(history: &VecDeque<AttemptEntry>) -> Option<ErrorPattern> {
    if history.len() < DIAGNOSIS_MIN_ATTEMPTS {
        return None;
    }
    let skip = history.len().saturating_sub(DIAGNOSIS_WINDOW);
    let errors: Vec<&ProblemIdentity> = history
        .iter()
        .skip(skip)
        .filter(|entry| !entry.correct)
        .map(|entry| &entry.identity)
        .collect();
    if errors.len() < DIAGNOSIS_MIN_ERRORS {
        return None;
    }

    let (pattern, count) = ErrorPattern::ALL
        .iter()
        .map(|pattern| (*pattern, errors.iter().filter(|p| pattern.matches(p)).count()))
        .max_by_key(|(_, count)| *count)?;

    if count > 0 && count as f64 >= errors.len() as f64 * DIAGNOSIS_DOMINANCE {
        debug!(
            "[Diagnosis] {:?} in {}/{} recent errors",
            pattern,
            count,
            errors.len()
        );
        Some(pattern)
    } else {
        None
    }
}
