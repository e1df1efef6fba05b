//! Reward & streak engine.
//!
//! ## Pipeline
//!
//! ```text
//! complete -> StreakCalculator -> WeightResolver -> RewardSelector -> ProgressTracker
//!                                                                   -> CompletionRecord
//! ```
//!
//! The last two steps run in one immediate transaction; see
//! [`CompletionOrchestrator::complete`].

mod clock;
mod orchestrator;
mod progress;
mod selector;
mod streak;
mod weight;

pub use clock::{day_bounds, local_date};
pub use orchestrator::CompletionOrchestrator;
pub use progress::ProgressTracker;
pub use selector::{RewardSelector, Selection};
pub use streak::{next_streak, StreakCalculator};
pub use weight::WeightResolver;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Default bonus per streak day.
pub const DEFAULT_STREAK_RATE: f64 = 0.1;

/// Engine constants fixed for the lifetime of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub streak_rate: f64,
    /// Offset that defines where a calendar day starts.
    pub utc_offset: FixedOffset,
    /// Seed for reproducible draws; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            streak_rate: DEFAULT_STREAK_RATE,
            utc_offset: Utc.fix(),
            seed: None,
        }
    }
}

impl EngineSettings {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        local_date(at, self.utc_offset)
    }
}
