//! # Habitroll Core Library
//!
//! Rewards habit completions on a variable-ratio schedule. Each completion
//! advances a per-habit streak, turns habit, user and streak into a weight,
//! draws from the reward catalog and advances cumulative ("piece-based")
//! reward progress. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Engine**: streak calculation, weight resolution, weighted selection,
//!   the progress state machine and the orchestrator composing them
//! - **Storage**: SQLite persistence with an append-only completion log, and
//!   TOML configuration
//!
//! ## Key Components
//!
//! - [`CompletionOrchestrator`]: caller-facing operations
//! - [`Database`]: persistence collaborator
//! - [`Config`]: application configuration

pub mod engine;
pub mod error;
pub mod model;
pub mod storage;

pub use engine::{
    CompletionOrchestrator, EngineSettings, ProgressTracker, RewardSelector, Selection,
    StreakCalculator, WeightResolver,
};
pub use error::{ConfigError, CoreError, DatabaseError, EntityKind, Result, ValidationError};
pub use model::{
    CompletionOutcome, CompletionRecord, Habit, HabitStreak, NewCompletion, NewHabit, NewReward,
    NewUser, ProgressStatus, ProgressView, Reward, RewardProgress, User,
};
pub use storage::{Config, Database};
