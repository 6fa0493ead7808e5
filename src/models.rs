// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::error::FastMathError;

// --- Operations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
        Operation::Division,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Subtraction => "subtraction",
            Operation::Multiplication => "multiplication",
            Operation::Division => "division",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Addition => "+",
            Operation::Subtraction => "-",
            Operation::Multiplication => "*",
            Operation::Division => "/",
        }
    }

    pub fn is_commutative(&self) -> bool {
        matches!(self, Operation::Addition | Operation::Multiplication)
    }

    /// Total over all of `i64`: overflow wraps and division by zero yields 0.
    /// Generated candidates stay far inside the range.
    pub fn apply(&self, a: i64, b: i64) -> i64 {
        match self {
            Operation::Addition => a.wrapping_add(b),
            Operation::Subtraction => a.wrapping_sub(b),
            Operation::Multiplication => a.wrapping_mul(b),
            Operation::Division => a.checked_div(b).unwrap_or(0),
        }
    }
}

impl FromStr for Operation {
    type Err = FastMathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "addition" | "+" => Ok(Operation::Addition),
            "subtraction" | "-" => Ok(Operation::Subtraction),
            "multiplication" | "*" => Ok(Operation::Multiplication),
            "division" | "/" => Ok(Operation::Division),
            other => Err(FastMathError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Problem Identity ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Forward,
    Reversed,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Forward => "forward",
            Orientation::Reversed => "reversed",
        }
    }
}

impl FromStr for Orientation {
    type Err = FastMathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Orientation::Forward),
            "reversed" => Ok(Orientation::Reversed),
            other => Err(FastMathError::UnknownOrientation(other.to_string())),
        }
    }
}

/// Key for one specific problem as presented.
///
/// For commutative operations the operands are stored smallest first and
/// `orientation` records whether they were shown swapped, so `5 + 7` and
/// `7 + 5` are distinct identities sharing one operand pair. Non-commutative
/// operations are always `Forward` with operands in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProblemIdentity {
    pub operation: Operation,
    pub operand_a: i64,
    pub operand_b: i64,
    pub orientation: Orientation,
}

impl ProblemIdentity {
    /// Builds the identity for `left op right` as shown to the learner.
    pub fn new(operation: Operation, left: i64, right: i64) -> Self {
        if operation.is_commutative() && left > right {
            ProblemIdentity {
                operation,
                operand_a: right,
                operand_b: left,
                orientation: Orientation::Reversed,
            }
        } else {
            ProblemIdentity {
                operation,
                operand_a: left,
                operand_b: right,
                orientation: Orientation::Forward,
            }
        }
    }

    pub fn left(&self) -> i64 {
        match self.orientation {
            Orientation::Forward => self.operand_a,
            Orientation::Reversed => self.operand_b,
        }
    }

    pub fn right(&self) -> i64 {
        match self.orientation {
            Orientation::Forward => self.operand_b,
            Orientation::Reversed => self.operand_a,
        }
    }

    pub fn expected_answer(&self) -> i64 {
        self.operation.apply(self.left(), self.right())
    }

    /// The same pair shown the other way round, if that is a different identity.
    pub fn sibling(&self) -> Option<ProblemIdentity> {
        if !self.operation.is_commutative() || self.operand_a == self.operand_b {
            return None;
        }
        Some(ProblemIdentity::new(self.operation, self.right(), self.left()))
    }

    /// Same operation over the same unordered operand pair.
    pub fn same_pair(&self, other: &ProblemIdentity) -> bool {
        self.operation == other.operation
            && self.operand_a == other.operand_a
            && self.operand_b == other.operand_b
    }

    pub fn is_valid(&self, allow_negative: bool) -> bool {
        match self.operation {
            Operation::Division => self.operand_a.checked_rem(self.operand_b) == Some(0),
            Operation::Subtraction => allow_negative || self.operand_a >= self.operand_b,
            Operation::Addition | Operation::Multiplication => true,
        }
    }
}

impl fmt::Display for ProblemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left(), self.operation.symbol(), self.right())
    }
}

// --- Performance ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub attempts: u32,
    pub correct: u32,
    pub incorrect: u32,
    /// Most recent outcome last; bounded by the store's capacity.
    pub recent: VecDeque<bool>,
    pub avg_normalized_secs: f64,
    pub last_seen: Option<DateTime<Utc>>,
}

impl PerformanceRecord {
    pub fn is_unseen(&self) -> bool {
        self.attempts == 0
    }

    pub fn accuracy(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(self.correct as f64 / self.attempts as f64)
        }
    }

    pub fn recent_misses(&self) -> usize {
        self.recent.iter().filter(|ok| !**ok).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptEntry {
    pub identity: ProblemIdentity,
    pub correct: bool,
    pub normalized_secs: f64,
    pub answered_at: DateTime<Utc>,
}

// --- Difficulty ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentAnswer {
    pub correct: bool,
    pub normalized_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyState {
    pub level: u8,
    pub recent: VecDeque<RecentAnswer>,
    pub fast_streak: u32,
    pub slow_streak: u32,
}

impl DifficultyState {
    pub fn at_level(level: u8) -> Self {
        DifficultyState {
            level,
            recent: VecDeque::new(),
            fast_streak: 0,
            slow_streak: 0,
        }
    }

    pub fn rolling_accuracy(&self) -> Option<f64> {
        if self.recent.is_empty() {
            return None;
        }
        let correct = self.recent.iter().filter(|r| r.correct).count();
        Some(correct as f64 / self.recent.len() as f64)
    }

    pub fn rolling_secs(&self) -> Option<f64> {
        if self.recent.is_empty() {
            return None;
        }
        let total: f64 = self.recent.iter().map(|r| r.normalized_secs).sum();
        Some(total / self.recent.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelChange {
    Promoted { from: u8, to: u8 },
    Demoted { from: u8, to: u8 },
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillTier::Beginner => "Beginner",
            SkillTier::Intermediate => "Intermediate",
            SkillTier::Advanced => "Advanced",
        }
    }
}

// --- Engine I/O ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub expected: i64,
    pub normalized_secs: f64,
    pub level_change: LevelChange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commutative_orientations_are_distinct_identities() {
        let a = ProblemIdentity::new(Operation::Addition, 7, 5);
        let b = ProblemIdentity::new(Operation::Addition, 5, 7);
        assert_ne!(a, b);
        assert!(a.same_pair(&b));
        assert_eq!(a.sibling(), Some(b));
        assert_eq!(a.to_string(), "7 + 5");
        assert_eq!(b.to_string(), "5 + 7");
        assert_eq!(a.expected_answer(), 12);
    }

    #[test]
    fn non_commutative_keeps_presentation_order() {
        let p = ProblemIdentity::new(Operation::Subtraction, 3, 9);
        assert_eq!(p.orientation, Orientation::Forward);
        assert_eq!(p.expected_answer(), -6);
        assert!(p.sibling().is_none());
        assert!(!p.is_valid(false));
        assert!(p.is_valid(true));
    }

    #[test]
    fn doubles_have_no_sibling() {
        let p = ProblemIdentity::new(Operation::Multiplication, 6, 6);
        assert!(p.sibling().is_none());
    }

    #[test]
    fn division_validity() {
        assert!(ProblemIdentity::new(Operation::Division, 12, 4).is_valid(false));
        assert!(!ProblemIdentity::new(Operation::Division, 12, 5).is_valid(false));
        assert!(!ProblemIdentity::new(Operation::Division, 12, 0).is_valid(false));
        assert_eq!(Operation::Division.apply(3, 0), 0);
    }

    #[test]
    fn extreme_operands_do_not_panic() {
        let big = ProblemIdentity::new(Operation::Multiplication, i64::MAX / 2, 3);
        assert_eq!(big.expected_answer(), (i64::MAX / 2).wrapping_mul(3));
        assert_eq!(Operation::Addition.apply(i64::MAX, 1), i64::MIN);
        assert_eq!(Operation::Subtraction.apply(i64::MIN, 1), i64::MAX);
        assert_eq!(Operation::Division.apply(i64::MIN, -1), 0);
    }

    #[test]
    fn operation_parses_names_and_symbols() {
        assert_eq!("*".parse::<Operation>().unwrap(), Operation::Multiplication);
        assert_eq!("division".parse::<Operation>().unwrap(), Operation::Division);
        assert!("modulo".parse::<Operation>().is_err());
    }
}
