// src/constants.rs

// --- Time Constants ---
pub const DAY_SECONDS: f64 = 86400.0;

// --- Typing Overhead Model ---
pub const TYPING_BASE_SECS: f64 = 0.5; // Reading the prompt, reaching for keys
pub const TYPING_PER_CHAR_SECS: f64 = 0.2;
pub const NORMALIZED_TIME_FLOOR_SECS: f64 = 0.1;

// --- Difficulty Levels ---
pub const LEVEL_MIN: u8 = 1;
pub const LEVEL_MAX: u8 = 10;
pub const PROMOTE_STREAK_DEFAULT: u32 = 5;
pub const DEMOTE_STREAK_DEFAULT: u32 = 3;
pub const DIFFICULTY_WINDOW: usize = 20; // Answers kept for rolling accuracy/time

// Skill tier cut points (mean level across enabled operations)
pub const TIER_BEGINNER_MAX_LEVEL: f64 = 3.0;
pub const TIER_INTERMEDIATE_MAX_LEVEL: f64 = 7.0;

// --- Candidate Generation ---
pub const ENUMERATION_LIMIT: usize = 400; // Pairs per operation before sampling kicks in
pub const SAMPLE_SIZE: usize = 120;
pub const OPERAND_CEILING: i64 = 1_000_000; // Keeps every product inside i64
pub const TRIVIAL_SMALL_OPERAND: i64 = 5;
pub const TRIVIAL_SMALL_OPERAND_LEVEL: u8 = 3;

// Guaranteed-valid fallback ranges
pub const FALLBACK_MIN_OPERAND: i64 = 1;
pub const FALLBACK_MAX_OPERAND: i64 = 10;
pub const FALLBACK_MIN_FACTOR: i64 = 2;
pub const FALLBACK_MAX_QUOTIENT: i64 = 10;

// --- Performance Store ---
pub const RECENT_OUTCOME_CAPACITY: usize = 5;
pub const HISTORY_CAPACITY: usize = 50;

// --- Need Score ---
pub const NEED_BASE: f64 = 1.0;
pub const NEED_UNSEEN: f64 = 1.5; // Moderate, so new problems get explored
pub const NEED_FLOOR: f64 = 0.1;
pub const ACCURACY_WEIGHT: f64 = 2.0;
pub const RECENT_MISS_BOOST: f64 = 0.75; // Per miss in the recent-outcome window
pub const TIME_WEIGHT: f64 = 0.5;
pub const TIME_RATIO_CAP: f64 = 2.0;
pub const STALENESS_WEIGHT: f64 = 0.5;
pub const STALENESS_CAP: f64 = 2.0;
pub const SPACING_BASE_DAYS: f64 = 1.0;
pub const SPACING_ACCURACY_DAYS: f64 = 5.0;
pub const SIBLING_MISS_WEIGHT: f64 = 0.3;
pub const SIBLING_MISS_CAP: f64 = 1.0;

// --- Variety ---
pub const VARIETY_WINDOW: usize = 3;
pub const ANSWER_REPEAT_WINDOW: usize = 5;
pub const OPERAND_RECENCY_WINDOW: usize = 10;
pub const REPEAT_PENALTY: f64 = 0.05;
pub const ANSWER_REPEAT_PENALTY: f64 = 0.7;
pub const OPERAND_RECENCY_PENALTY: f64 = 0.85;

// --- Error Pattern Diagnosis ---
pub const DIAGNOSIS_MIN_ATTEMPTS: usize = 10;
pub const DIAGNOSIS_WINDOW: usize = 30;
pub const DIAGNOSIS_MIN_ERRORS: usize = 3;
pub const DIAGNOSIS_DOMINANCE: f64 = 0.2;
pub const PATTERN_TARGET_BOOST: f64 = 1.5;

// --- Pedagogical Weighting ---
pub const PATTERN_TABLE_VERSION: u32 = 1;
pub const PEDAGOGICAL_WEIGHT_MAX: f64 = 3.0;
