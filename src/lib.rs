// src/lib.rs

//! Adaptive problem selection and difficulty engine for arithmetic drills.

pub mod config;
pub mod constants;
pub mod database;
pub mod diagnosis;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod generator;
pub mod models;
pub mod pedagogy;
pub mod performance;
pub mod repository;
pub mod selector;
pub mod stats;

pub use config::{EngineConfig, OperationConfig, SelectionConfig, TypingModel};
pub use engine::Engine;
pub use error::{FastMathError, Result};
pub use models::{
    AnswerOutcome, LevelChange, Operation, Orientation, PerformanceRecord, ProblemIdentity,
    SkillTier,
};
pub use stats::{ProfileState, StatsSnapshot};
