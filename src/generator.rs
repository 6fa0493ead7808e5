// src/generator.rs

use crate::config::EngineConfig;
use crate::constants::*;
use crate::difficulty::{DifficultyTracker, OperandBounds};
use crate::models::{Operation, ProblemIdentity};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

/// The legal operand pairs for one operation, already repaired.
#[derive(Debug, Clone, PartialEq)]
enum PairSpace {
    /// Every `(a, b)` with both in `lo..=hi`.
    Square { lo: i64, hi: i64 },
    /// `a` in `lo..=hi`, `b` in `lo..=a`: subtraction without negative results.
    Descending { lo: i64, hi: i64 },
    /// `divisor * quotient / divisor`, so the quotient is always an integer.
    Division {
        divisors: Vec<i64>,
        q_lo: i64,
        q_hi: i64,
    },
}

impl PairSpace {
    fn size(&self) -> u64 {
        match self {
            PairSpace::Square { lo, hi } => {
                let n = (hi - lo + 1) as u64;
                n.saturating_mul(n)
            }
            PairSpace::Descending { lo, hi } => {
                let n = (hi - lo + 1) as u64;
                n.saturating_mul(n + 1) / 2
            }
            PairSpace::Division {
                divisors,
                q_lo,
                q_hi,
            } => (divisors.len() as u64).saturating_mul((q_hi - q_lo + 1) as u64),
        }
    }
}

/// Produces the candidate problems for the enabled operations at their current levels.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    enumeration_limit: usize,
    sample_size: usize,
}

impl CandidateGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        CandidateGenerator {
            enumeration_limit: config.selection.enumeration_limit.max(1),
            sample_size: config.selection.sample_size.max(1),
        }
    }

    /// Never returns an empty set: broken bounds fall back to a small valid range.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        enabled: &[Operation],
        tracker: &DifficultyTracker,
        rng: &mut R,
    ) -> Vec<ProblemIdentity> {
        let operations: &[Operation] = if enabled.is_empty() {
            warn!("[Generator] No operations enabled, falling back to addition");
            &[Operation::Addition]
        } else {
            enabled
        };

        let mut candidates = Vec::new();
        for op in operations {
            let bounds = tracker.bounds_for(*op);
            let generated = self.generate_for(&bounds, rng);
            debug!(
                "[Generator] {} level {}: {} candidates",
                op,
                bounds.level,
                generated.len()
            );
            candidates.extend(generated);
        }

        if candidates.is_empty() {
            warn!("[Generator] Candidate set empty after fallback, using 1 + 1");
            candidates.push(ProblemIdentity::new(Operation::Addition, 1, 1));
        }
        candidates
    }

    /// Candidates for a single operation's bounds, trivial problems removed
    /// whenever that leaves something behind.
    pub fn generate_for<R: Rng + ?Sized>(
        &self,
        bounds: &OperandBounds,
        rng: &mut R,
    ) -> Vec<ProblemIdentity> {
        let space = match pair_space(bounds) {
            Some(space) => space,
            None => {
                warn!(
                    "[Generator] Degenerate {} bounds {}..={} (divisors {:?}), using fallback range",
                    bounds.operation, bounds.min_operand, bounds.max_operand, bounds.divisors
                );
                fallback_space(bounds.operation, bounds.non_negative)
            }
        };

        let all = if space.size() <= self.enumeration_limit as u64 {
            enumerate(bounds.operation, &space)
        } else {
            sample(bounds.operation, &space, self.sample_size, rng)
        };

        let useful: Vec<ProblemIdentity> = all
            .iter()
            .filter(|p| !is_trivial(p, bounds.level))
            .copied()
            .collect();
        if useful.is_empty() {
            all.into_iter().collect()
        } else {
            useful
        }
    }
}

/// `None` when the bounds describe no valid problem at all.
fn pair_space(bounds: &OperandBounds) -> Option<PairSpace> {
    let lo = bounds.min_operand.max(-OPERAND_CEILING);
    let hi = bounds.max_operand.min(OPERAND_CEILING);
    match bounds.operation {
        Operation::Addition | Operation::Multiplication => {
            (lo <= hi).then_some(PairSpace::Square { lo, hi })
        }
        Operation::Subtraction if bounds.non_negative => {
            (lo <= hi).then_some(PairSpace::Descending { lo, hi })
        }
        Operation::Subtraction => (lo <= hi).then_some(PairSpace::Square { lo, hi }),
        Operation::Division => {
            let q_lo = lo.max(1);
            let q_hi = hi;
            if q_lo > q_hi {
                return None;
            }
            let divisors: Vec<i64> = match &bounds.divisors {
                Some(set) => set
                    .iter()
                    .copied()
                    .filter(|d| *d > 0 && *d <= OPERAND_CEILING)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                None => (q_lo..=q_hi).collect(),
            };
            if divisors.is_empty() {
                return None;
            }
            Some(PairSpace::Division {
                divisors,
                q_lo,
                q_hi,
            })
        }
    }
}

fn fallback_space(op: Operation, non_negative: bool) -> PairSpace {
    match op {
        Operation::Addition => PairSpace::Square {
            lo: FALLBACK_MIN_OPERAND,
            hi: FALLBACK_MAX_OPERAND,
        },
        Operation::Subtraction if non_negative => PairSpace::Descending {
            lo: FALLBACK_MIN_OPERAND,
            hi: FALLBACK_MAX_OPERAND,
        },
        Operation::Subtraction => PairSpace::Square {
            lo: FALLBACK_MIN_OPERAND,
            hi: FALLBACK_MAX_OPERAND,
        },
        Operation::Multiplication => PairSpace::Square {
            lo: FALLBACK_MIN_FACTOR,
            hi: FALLBACK_MAX_OPERAND,
        },
        Operation::Division => PairSpace::Division {
            divisors: (FALLBACK_MIN_FACTOR..=FALLBACK_MAX_OPERAND).collect(),
            q_lo: FALLBACK_MIN_OPERAND,
            q_hi: FALLBACK_MAX_QUOTIENT,
        },
    }
}

fn enumerate(op: Operation, space: &PairSpace) -> BTreeSet<ProblemIdentity> {
    let mut out = BTreeSet::new();
    match space {
        PairSpace::Square { lo, hi } => {
            for a in *lo..=*hi {
                for b in *lo..=*hi {
                    out.insert(ProblemIdentity::new(op, a, b));
                }
            }
        }
        PairSpace::Descending { lo, hi } => {
            for a in *lo..=*hi {
                for b in *lo..=a {
                    out.insert(ProblemIdentity::new(op, a, b));
                }
            }
        }
        PairSpace::Division {
            divisors,
            q_lo,
            q_hi,
        } => {
            for d in divisors {
                for q in *q_lo..=*q_hi {
                    out.insert(ProblemIdentity::new(op, d * q, *d));
                }
            }
        }
    }
    out
}

/// Random draws from a space too large to list. Commutative draws are
/// expanded into both orientations.
fn sample<R: Rng + ?Sized>(
    op: Operation,
    space: &PairSpace,
    count: usize,
    rng: &mut R,
) -> BTreeSet<ProblemIdentity> {
    let mut out = BTreeSet::new();
    for _ in 0..count {
        let (left, right) = match space {
            PairSpace::Square { lo, hi } => (rng.gen_range(*lo..=*hi), rng.gen_range(*lo..=*hi)),
            PairSpace::Descending { lo, hi } => {
                let a = rng.gen_range(*lo..=*hi);
                (a, rng.gen_range(*lo..=a))
            }
            PairSpace::Division {
                divisors,
                q_lo,
                q_hi,
            } => {
                let d = divisors.choose(&mut *rng).copied().unwrap_or(FALLBACK_MIN_FACTOR);
                (d * rng.gen_range(*q_lo..=*q_hi), d)
            }
        };
        out.insert(ProblemIdentity::new(op, left, right));
        if op.is_commutative() {
            out.insert(ProblemIdentity::new(op, right, left));
        }
    }
    out
}

/// Problems with no practice value: identities, self-cancellation, and
/// tiny operands once the learner is past the first levels.
pub fn is_trivial(p: &ProblemIdentity, level: u8) -> bool {
    let (left, right) = (p.left(), p.right());
    let trivial = match p.operation {
        Operation::Addition => left == 0 || right == 0,
        Operation::Subtraction => left == right || left == 0,
        Operation::Multiplication => left == 1 || right == 1,
        Operation::Division => right == 1 || left == right || left == 0,
    };
    trivial
        || (level > TRIVIAL_SMALL_OPERAND_LEVEL
            && left.max(right) < TRIVIAL_SMALL_OPERAND)
}
