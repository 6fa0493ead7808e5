// src/pedagogy.rs

//! Static table of operand patterns with high transfer value.
//!
//! Each matching pattern multiplies the candidate's score by its weight for
//! the learner's tier. The product is capped; a problem that matches nothing
//! gets a neutral 1.0.

use crate::constants::*;
use crate::models::{Operation, ProblemIdentity, SkillTier};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierWeights {
    pub beginner: f64,
    pub intermediate: f64,
    pub advanced: f64,
}

impl TierWeights {
    const fn flat(weight: f64) -> Self {
        TierWeights {
            beginner: weight,
            intermediate: weight,
            advanced: weight,
        }
    }

    pub fn for_tier(&self, tier: SkillTier) -> f64 {
        match tier {
            SkillTier::Beginner => self.beginner,
            SkillTier::Intermediate => self.intermediate,
            SkillTier::Advanced => self.advanced,
        }
    }
}

pub struct PedagogicalPattern {
    pub name: &'static str,
    pub matches: fn(&ProblemIdentity) -> bool,
    pub weights: TierWeights,
}

const ROUND_NUMBERS: [i64; 7] = [10, 20, 50, 100, 200, 500, 1000];

fn sum_to_ten(p: &ProblemIdentity) -> bool {
    p.operation == Operation::Addition && p.operand_a + p.operand_b == 10
}

fn sum_to_hundred(p: &ProblemIdentity) -> bool {
    p.operation == Operation::Addition && p.operand_a + p.operand_b == 100
}

fn double(p: &ProblemIdentity) -> bool {
    match p.operation {
        Operation::Addition => p.operand_a == p.operand_b,
        Operation::Multiplication => p.operand_a == 2 || p.operand_b == 2,
        _ => false,
    }
}

fn half(p: &ProblemIdentity) -> bool {
    match p.operation {
        Operation::Division => p.operand_b == 2 || p.operand_a == 2 * p.operand_b,
        Operation::Subtraction => p.operand_a == 2 * p.operand_b,
        _ => false,
    }
}

fn near_ten(n: i64) -> bool {
    n > 8 && (n % 10 == 9 || n % 10 == 1)
}

fn near_multiple_of_ten(p: &ProblemIdentity) -> bool {
    match p.operation {
        Operation::Division => near_ten(p.operand_b),
        _ => near_ten(p.operand_a) || near_ten(p.operand_b),
    }
}

fn multiply_by_2_5_10(p: &ProblemIdentity) -> bool {
    p.operation == Operation::Multiplication
        && [2, 5, 10]
            .iter()
            .any(|n| p.operand_a == *n || p.operand_b == *n)
}

fn divide_by_2_5_10(p: &ProblemIdentity) -> bool {
    p.operation == Operation::Division && [2, 5, 10].contains(&p.operand_b)
}

fn times_table(p: &ProblemIdentity) -> bool {
    p.operation == Operation::Multiplication
        && (2..=10).contains(&p.operand_a)
        && (2..=10).contains(&p.operand_b)
}

fn subtract_from_round(p: &ProblemIdentity) -> bool {
    p.operation == Operation::Subtraction
        && ROUND_NUMBERS.contains(&p.operand_a)
        && p.operand_b < 10
}

fn small_facts(p: &ProblemIdentity) -> bool {
    let largest = p.operand_a.max(p.operand_b);
    match p.operation {
        Operation::Addition | Operation::Subtraction => largest <= 10,
        Operation::Multiplication => largest <= 5,
        Operation::Division => p.expected_answer() <= 5 && p.operand_b <= 5,
    }
}

fn teen_numbers(p: &ProblemIdentity) -> bool {
    let largest = p.operand_a.max(p.operand_b);
    match p.operation {
        Operation::Addition | Operation::Subtraction => (10..=20).contains(&largest),
        Operation::Multiplication => (5..=12).contains(&largest),
        Operation::Division => false,
    }
}

fn large_operands(p: &ProblemIdentity) -> bool {
    p.operand_a.max(p.operand_b) >= 20
}

/// Version 1 of the table. Bump `PATTERN_TABLE_VERSION` when weights change.
pub static PATTERNS: &[PedagogicalPattern] = &[
    PedagogicalPattern {
        name: "sum-to-10",
        matches: sum_to_ten,
        weights: TierWeights {
            beginner: 1.5,
            intermediate: 1.3,
            advanced: 1.1,
        },
    },
    PedagogicalPattern {
        name: "sum-to-100",
        matches: sum_to_hundred,
        weights: TierWeights {
            beginner: 1.2,
            intermediate: 1.4,
            advanced: 1.3,
        },
    },
    PedagogicalPattern {
        name: "double",
        matches: double,
        weights: TierWeights::flat(1.3),
    },
    PedagogicalPattern {
        name: "half",
        matches: half,
        weights: TierWeights::flat(1.3),
    },
    PedagogicalPattern {
        name: "near-multiple-of-10",
        matches: near_multiple_of_ten,
        weights: TierWeights {
            beginner: 1.0,
            intermediate: 1.4,
            advanced: 1.4,
        },
    },
    PedagogicalPattern {
        name: "multiply-by-{2,5,10}",
        matches: multiply_by_2_5_10,
        weights: TierWeights {
            beginner: 1.4,
            intermediate: 1.2,
            advanced: 1.1,
        },
    },
    PedagogicalPattern {
        name: "divide-by-{2,5,10}",
        matches: divide_by_2_5_10,
        weights: TierWeights {
            beginner: 1.4,
            intermediate: 1.2,
            advanced: 1.1,
        },
    },
    PedagogicalPattern {
        name: "times-table",
        matches: times_table,
        weights: TierWeights::flat(1.5),
    },
    PedagogicalPattern {
        name: "subtract-from-round",
        matches: subtract_from_round,
        weights: TierWeights::flat(1.3),
    },
    PedagogicalPattern {
        name: "small-facts",
        matches: small_facts,
        weights: TierWeights {
            beginner: 1.2,
            intermediate: 1.0,
            advanced: 1.0,
        },
    },
    PedagogicalPattern {
        name: "teen-numbers",
        matches: teen_numbers,
        weights: TierWeights {
            beginner: 1.0,
            intermediate: 1.2,
            advanced: 1.0,
        },
    },
    PedagogicalPattern {
        name: "large-operands",
        matches: large_operands,
        weights: TierWeights {
            beginner: 1.0,
            intermediate: 1.0,
            advanced: 1.1,
        },
    },
];

pub fn weight_for(identity: &ProblemIdentity, tier: SkillTier) -> f64 {
    let weight = PATTERNS
        .iter()
        .filter(|pattern| (pattern.matches)(identity))
        .map(|pattern| pattern.weights.for_tier(tier))
        .product::<f64>();
    weight.clamp(0.0, PEDAGOGICAL_WEIGHT_MAX)
}

/// Names of the patterns `identity` matches, for logging and stats.
pub fn matched_patterns(identity: &ProblemIdentity) -> Vec<&'static str> {
    PATTERNS
        .iter()
        .filter(|pattern| (pattern.matches)(identity))
        .map(|pattern| pattern.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(op: Operation, a: i64, b: i64) -> ProblemIdentity {
        ProblemIdentity::new(op, a, b)
    }

    #[test]
    fn unmatched_is_neutral() {
        let p = id(Operation::Division, 18, 3);
        assert!(matched_patterns(&p).is_empty());
        assert_eq!(weight_for(&p, SkillTier::Beginner), 1.0);
        assert_eq!(weight_for(&p, SkillTier::Advanced), 1.0);
    }

    #[test]
    fn number_bonds_favour_beginners() {
        let p = id(Operation::Addition, 3, 7);
        assert!(matched_patterns(&p).contains(&"sum-to-10"));
        assert!(weight_for(&p, SkillTier::Beginner) > weight_for(&p, SkillTier::Advanced));
    }

    #[test]
    fn near_multiples_favour_later_tiers() {
        let p = id(Operation::Addition, 29, 34);
        assert_eq!(matched_patterns(&p), vec!["near-multiple-of-10", "large-operands"]);
        assert!(weight_for(&p, SkillTier::Intermediate) > weight_for(&p, SkillTier::Beginner));
    }

    #[test]
    fn division_patterns() {
        let halving = id(Operation::Division, 16, 2);
        let names = matched_patterns(&halving);
        assert!(names.contains(&"half"));
        assert!(names.contains(&"divide-by-{2,5,10}"));
        assert!(weight_for(&halving, SkillTier::Intermediate) > 1.0);
    }

    #[test]
    fn weight_is_capped() {
        // 5 * 2 matches several multiplication patterns at once.
        let p = id(Operation::Multiplication, 5, 2);
        let w = weight_for(&p, SkillTier::Beginner);
        assert!(w > 1.0 && w <= PEDAGOGICAL_WEIGHT_MAX);
    }

    #[test]
    fn orientation_does_not_change_weight() {
        let a = id(Operation::Addition, 4, 6);
        let b = id(Operation::Addition, 6, 4);
        assert_eq!(
            weight_for(&a, SkillTier::Beginner),
            weight_for(&b, SkillTier::Beginner)
        );
    }
}
