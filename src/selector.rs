// src/selector.rs

use crate::config::SelectionConfig;
use crate::constants::*;
use crate::diagnosis::ErrorPattern;
use crate::difficulty::DifficultyTracker;
use crate::models::{Operation, PerformanceRecord, ProblemIdentity, SkillTier};
use crate::pedagogy;
use crate::performance::PerformanceStore;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Read-only view of engine state used to score one round of candidates.
pub struct ScoringContext<'a> {
    pub store: &'a PerformanceStore,
    pub tracker: &'a DifficultyTracker,
    pub tier: SkillTier,
    pub focus: Option<ErrorPattern>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub need: f64,
    pub pedagogical: f64,
    pub variety: f64,
    pub focus: f64,
}

impl CandidateScore {
    pub fn total(&self) -> f64 {
        let total = self.need * self.pedagogical * self.variety * self.focus;
        if total.is_finite() && total > 0.0 {
            total
        } else {
            0.0
        }
    }
}

/// How much practice a problem needs, from its own record, its commutative
/// sibling's record, and the operation's typical solve time.
pub fn need_score(
    record: Option<&PerformanceRecord>,
    sibling: Option<&PerformanceRecord>,
    operation_norm_secs: Option<f64>,
    now: DateTime<Utc>,
) -> f64 {
    let mut need = match record.filter(|r| !r.is_unseen()) {
        None => NEED_UNSEEN,
        Some(r) => {
            let accuracy = r.accuracy().unwrap_or(0.0);
            let mut need = NEED_BASE
                + (1.0 - accuracy) * ACCURACY_WEIGHT
                + r.recent_misses() as f64 * RECENT_MISS_BOOST;

            if let Some(norm) = operation_norm_secs.filter(|n| *n > 0.0) {
                let ratio = r.avg_normalized_secs / norm;
                if ratio > 1.0 {
                    need += (ratio - 1.0).min(TIME_RATIO_CAP) * TIME_WEIGHT;
                }
            }

            if let Some(last_seen) = r.last_seen {
                let days = (now - last_seen).num_seconds().max(0) as f64 / DAY_SECONDS;
                let interval = SPACING_BASE_DAYS + accuracy * SPACING_ACCURACY_DAYS;
                need += (days / interval).min(STALENESS_CAP) * STALENESS_WEIGHT;
            }
            need
        }
    };

    if let Some(s) = sibling.filter(|s| !s.is_unseen()) {
        need += (s.incorrect as f64 * SIBLING_MISS_WEIGHT).min(SIBLING_MISS_CAP);
    }

    need.max(NEED_FLOOR)
}

/// Weighted random choice over candidates, remembering what it picked so the
/// next rounds can avoid immediate repeats.
#[derive(Debug, Clone)]
pub struct Selector {
    recent: VecDeque<ProblemIdentity>,
    config: SelectionConfig,
}

impl Selector {
    pub fn new(config: &SelectionConfig) -> Self {
        Selector {
            recent: VecDeque::new(),
            config: *config,
        }
    }

    pub fn recent_selections(&self) -> &VecDeque<ProblemIdentity> {
        &self.recent
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }

    /// Penalty for problems shown in the last few rounds.
    pub fn variety_factor(&self, candidate: &ProblemIdentity) -> f64 {
        let mut factor = 1.0;

        let repeated = self
            .recent
            .iter()
            .rev()
            .take(self.config.variety_window)
            .any(|seen| seen.same_pair(candidate));
        if repeated {
            factor *= REPEAT_PENALTY;
        }

        let answer = candidate.expected_answer();
        let same_answer = self
            .recent
            .iter()
            .rev()
            .take(self.config.answer_repeat_window)
            .any(|seen| seen.expected_answer() == answer);
        if same_answer {
            factor *= ANSWER_REPEAT_PENALTY;
        }

        let operands: HashSet<i64> = self
            .recent
            .iter()
            .rev()
            .take(self.config.operand_recency_window)
            .flat_map(|seen| [seen.operand_a, seen.operand_b])
            .collect();
        if operands.contains(&candidate.operand_a) && operands.contains(&candidate.operand_b) {
            factor *= OPERAND_RECENCY_PENALTY;
        }

        factor
    }

    pub fn score(&self, candidate: &ProblemIdentity, ctx: &ScoringContext<'_>) -> CandidateScore {
        let op = candidate.operation;
        let norm = ctx
            .tracker
            .state(op)
            .and_then(|s| s.rolling_secs())
            .or_else(|| ctx.store.operation_mean_secs(op));
        let sibling = candidate.sibling().and_then(|s| ctx.store.get(&s));
        let focus = match ctx.focus {
            Some(pattern) if pattern.matches(candidate) => PATTERN_TARGET_BOOST,
            _ => 1.0,
        };

        CandidateScore {
            need: need_score(ctx.store.get(candidate), sibling, norm, ctx.now),
            pedagogical: pedagogy::weight_for(candidate, ctx.tier),
            variety: self.variety_factor(candidate),
            focus,
        }
    }

    /// Picks one candidate. Each operation gets a share of the draw equal to
    /// the mean need of its candidates, so a large operand space does not
    /// crowd out a small one; within an operation the pick is proportional
    /// to the full score.
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        candidates: &[ProblemIdentity],
        ctx: &ScoringContext<'_>,
        rng: &mut R,
    ) -> ProblemIdentity {
        if candidates.is_empty() {
            warn!("[Selector] Empty candidate set, serving 1 + 1");
            return ProblemIdentity::new(Operation::Addition, 1, 1);
        }

        let scores: Vec<CandidateScore> = candidates.iter().map(|c| self.score(c, ctx)).collect();
        let weights = operation_balanced_weights(candidates, &scores);
        let index = weighted_pick(&weights, rng).unwrap_or(0);

        let chosen = candidates[index];
        let total: f64 = weights.iter().filter(|w| w.is_finite()).sum();
        info!(
            "[Selector] Chose {} (score {:.3}, p={:.3}) from {} candidates",
            chosen,
            scores[index].total(),
            if total > 0.0 { weights[index] / total } else { 0.0 },
            candidates.len()
        );
        debug!(
            "[Selector] {} patterns: {:?}",
            chosen,
            pedagogy::matched_patterns(&chosen)
        );

        if self.recent.len() >= self.config.memory_len().max(1) {
            self.recent.pop_front();
        }
        self.recent.push_back(chosen);
        chosen
    }
}

/// Rescales scores so each operation's weights sum to the mean need of its
/// candidates. Operations whose scores are all zero drop out.
fn operation_balanced_weights(candidates: &[ProblemIdentity], scores: &[CandidateScore]) -> Vec<f64> {
    let mut per_op: BTreeMap<Operation, (f64, f64, usize)> = BTreeMap::new();
    for (candidate, score) in candidates.iter().zip(scores) {
        let entry = per_op.entry(candidate.operation).or_insert((0.0, 0.0, 0));
        entry.0 += score.total();
        if score.need.is_finite() {
            entry.1 += score.need;
        }
        entry.2 += 1;
    }

    candidates
        .iter()
        .zip(scores)
        .map(|(candidate, score)| {
            let (total, need, count) = per_op[&candidate.operation];
            if total > 0.0 && total.is_finite() {
                score.total() / total * need / count as f64
            } else {
                0.0
            }
        })
        .collect()
}

/// Index drawn with probability proportional to `weights`; uniform when no
/// weight is usable (all zero, negative or NaN). `None` only for an empty slice.
pub fn weighted_pick<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    match WeightedIndex::new(weights) {
        Ok(dist) => Some(dist.sample(rng)),
        Err(e) => {
            debug!("[Selector] Weights unusable ({}), choosing uniformly", e);
            Some(rng.gen_range(0..weights.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, TypingModel};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn record(outcomes: &[bool], now: DateTime<Utc>) -> PerformanceRecord {
        let correct = outcomes.iter().filter(|ok| **ok).count() as u32;
        PerformanceRecord {
            attempts: outcomes.len() as u32,
            correct,
            incorrect: outcomes.len() as u32 - correct,
            recent: outcomes.iter().copied().collect(),
            avg_normalized_secs: 2.0,
            last_seen: Some(now),
        }
    }

    #[test]
    fn recent_mistakes_outrank_a_clean_run() {
        let now = Utc::now();
        let missed = record(&[false, true, false, true, false], now);
        let clean = record(&[true; 5], now);
        let missed_need = need_score(Some(&missed), None, Some(2.0), now);
        let clean_need = need_score(Some(&clean), None, Some(2.0), now);
        assert!(missed_need > clean_need);
    }

    #[test]
    fn unseen_gets_moderate_need() {
        let now = Utc::now();
        let clean = record(&[true; 5], now);
        let unseen = need_score(None, None, None, now);
        assert_eq!(unseen, NEED_UNSEEN);
        assert!(unseen > need_score(Some(&clean), None, None, now));
        assert_eq!(need_score(Some(&PerformanceRecord::default()), None, None, now), NEED_UNSEEN);
    }

    #[test]
    fn slow_and_stale_problems_need_more() {
        let now = Utc::now();
        let fresh = record(&[true; 3], now);
        let mut slow = fresh.clone();
        slow.avg_normalized_secs = 6.0;
        assert!(need_score(Some(&slow), None, Some(2.0), now) > need_score(Some(&fresh), None, Some(2.0), now));

        let stale = record(&[true; 3], now - chrono::Duration::days(10));
        assert!(need_score(Some(&stale), None, None, now) > need_score(Some(&fresh), None, None, now));
    }

    #[test]
    fn sibling_misses_raise_need() {
        let now = Utc::now();
        let sibling = record(&[false, false], now);
        assert!(need_score(None, Some(&sibling), None, now) > need_score(None, None, None, now));
    }

    #[test]
    fn variety_penalizes_immediate_repeats() {
        let config = EngineConfig::default();
        let mut selector = Selector::new(&config.selection);
        let tracker = DifficultyTracker::new(&config);
        let store = PerformanceStore::new(TypingModel::default(), &config.selection);
        let ctx = ScoringContext {
            store: &store,
            tracker: &tracker,
            tier: SkillTier::Beginner,
            focus: None,
            now: Utc::now(),
        };
        let shown = ProblemIdentity::new(Operation::Addition, 6, 7);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(selector.select(&[shown], &ctx, &mut rng), shown);

        assert!(selector.variety_factor(&shown) <= REPEAT_PENALTY);
        assert!(selector.variety_factor(&shown.sibling().unwrap()) <= REPEAT_PENALTY);
        // Different answer and operands
        assert_eq!(selector.variety_factor(&ProblemIdentity::new(Operation::Addition, 2, 9)), 1.0);
        // Same answer, different pair
        assert_eq!(
            selector.variety_factor(&ProblemIdentity::new(Operation::Addition, 4, 9)),
            ANSWER_REPEAT_PENALTY
        );
    }

    #[test]
    fn focus_pattern_boosts_matching_candidates() {
        let config = EngineConfig::default();
        let selector = Selector::new(&config.selection);
        let tracker = DifficultyTracker::new(&config);
        let store = PerformanceStore::new(TypingModel::default(), &config.selection);
        let ctx = ScoringContext {
            store: &store,
            tracker: &tracker,
            tier: SkillTier::Intermediate,
            focus: Some(ErrorPattern::Carrying),
            now: Utc::now(),
        };
        let carry = ProblemIdentity::new(Operation::Addition, 17, 8);
        assert_eq!(selector.score(&carry, &ctx).focus, PATTERN_TARGET_BOOST);
        let plain = ProblemIdentity::new(Operation::Addition, 12, 3);
        assert_eq!(selector.score(&plain, &ctx).focus, 1.0);
    }

    #[test]
    fn same_seed_same_sequence() {
        let config = EngineConfig::default();
        let tracker = DifficultyTracker::new(&config);
        let store = PerformanceStore::new(TypingModel::default(), &config.selection);
        let candidates: Vec<_> = (2..9)
            .flat_map(|a| (2..9).map(move |b| ProblemIdentity::new(Operation::Multiplication, a, b)))
            .collect();
        let run = |seed: u64| {
            let mut selector = Selector::new(&config.selection);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| {
                    let ctx = ScoringContext {
                        store: &store,
                        tracker: &tracker,
                        tier: SkillTier::Beginner,
                        focus: None,
                        now: Utc::now(),
                    };
                    selector.select(&candidates, &ctx, &mut rng)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn memory_is_bounded() {
        let config = EngineConfig::default();
        let mut selector = Selector::new(&config.selection);
        let tracker = DifficultyTracker::new(&config);
        let store = PerformanceStore::new(TypingModel::default(), &config.selection);
        let ctx = ScoringContext {
            store: &store,
            tracker: &tracker,
            tier: SkillTier::Beginner,
            focus: None,
            now: Utc::now(),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let candidates = [
            ProblemIdentity::new(Operation::Addition, 3, 4),
            ProblemIdentity::new(Operation::Addition, 5, 6),
        ];
        for _ in 0..40 {
            selector.select(&candidates, &ctx, &mut rng);
        }
        assert_eq!(selector.recent_selections().len(), config.selection.memory_len());
    }

    #[test]
    fn unusable_weights_fall_back_to_uniform() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        assert_eq!(weighted_pick(&[], &mut rng), None);
        for weights in [[0.0; 4], [f64::NAN, 1.0, 2.0, 3.0]] {
            let mut counts = [0usize; 4];
            for _ in 0..4000 {
                counts[weighted_pick(&weights, &mut rng).unwrap()] += 1;
            }
            for count in counts {
                assert!((800..1200).contains(&count), "{:?}", counts);
            }
        }
    }

    #[test]
    fn heavier_weights_are_drawn_more_often() {
        let mut rng = ChaCha8Rng::seed_from_u64(32);
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            counts[weighted_pick(&[1.0, 1.0, 8.0], &mut rng).unwrap()] += 1;
        }
        assert!(counts[2] > 2000, "{:?}", counts);
    }

    #[test]
    fn repeatedly_missed_problem_is_chosen_more_often() {
        let config = EngineConfig::default();
        let tracker = DifficultyTracker::new(&config);
        let mut store = PerformanceStore::new(TypingModel::default(), &config.selection);
        let now = Utc::now();
        let missed = ProblemIdentity::new(Operation::Addition, 7, 5);
        for _ in 0..5 {
            store.update(missed, false, 3_000, now);
        }
        let candidates: Vec<_> = (2..10)
            .flat_map(|a| (2..10).map(move |b| ProblemIdentity::new(Operation::Addition, a, b)))
            .collect();
        let ctx = ScoringContext {
            store: &store,
            tracker: &tracker,
            tier: SkillTier::Beginner,
            focus: None,
            now,
        };

        let mut rng = ChaCha8Rng::seed_from_u64(33);
        let rounds = 4000;
        let mut hits = 0;
        for _ in 0..rounds {
            let mut selector = Selector::new(&config.selection);
            if selector.select(&candidates, &ctx, &mut rng) == missed {
                hits += 1;
            }
        }
        let uniform = rounds / candidates.len();
        assert!(hits > 2 * uniform, "{} picks against {} uniform", hits, uniform);
    }

    #[test]
    fn operations_share_the_draw_by_mean_need() {
        let config = EngineConfig::default();
        let tracker = DifficultyTracker::new(&config);
        let store = PerformanceStore::new(TypingModel::default(), &config.selection);
        let ctx = ScoringContext {
            store: &store,
            tracker: &tracker,
            tier: SkillTier::Beginner,
            focus: None,
            now: Utc::now(),
        };
        let selector = Selector::new(&config.selection);
        let mut candidates: Vec<_> = (1..=10)
            .flat_map(|a| (1..=10).map(move |b| ProblemIdentity::new(Operation::Addition, a, b)))
            .collect();
        candidates.push(ProblemIdentity::new(Operation::Division, 12, 4));
        candidates.push(ProblemIdentity::new(Operation::Division, 12, 3));

        let scores: Vec<_> = candidates.iter().map(|c| selector.score(c, &ctx)).collect();
        let weights = operation_balanced_weights(&candidates, &scores);
        let share = |op: Operation| -> f64 {
            candidates
                .iter()
                .zip(&weights)
                .filter(|(c, _)| c.operation == op)
                .map(|(_, w)| *w)
                .sum()
        };
        // Everything unseen, so both operations carry the same need.
        assert!((share(Operation::Addition) - NEED_UNSEEN).abs() < 1e-9);
        assert!((share(Operation::Division) - NEED_UNSEEN).abs() < 1e-9);
    }
}
