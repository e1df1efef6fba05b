//! Domain types for users, habits, the reward catalog and the audit log.

mod completion;
mod entities;
mod progress;
mod reward;

pub use completion::{CompletionOutcome, CompletionRecord, HabitStreak, NewCompletion};
pub use entities::{Habit, NewHabit, NewUser, User};
pub use progress::{ProgressStatus, ProgressView, RewardProgress};
pub use reward::{NewReward, Reward};

use crate::error::ValidationError;

/// Weights scale selection odds multiplicatively, so zero, negative and
/// non-finite values are rejected at the management boundary.
pub(crate) fn validate_weight(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidWeight { field, value })
    }
}

pub(crate) fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(())
    }
}
