use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProgressView, Reward};

/// Append-only audit entry written once per completion.
///
/// Streaks and daily piece counts are derived from these rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: i64,
    pub user_id: i64,
    pub habit_id: i64,
    pub reward_id: Option<i64>,
    pub completed_at: DateTime<Utc>,
    pub streak_count: u32,
    /// Habit weight at the time of completion.
    pub habit_weight: f64,
    pub total_weight: f64,
    pub reward_granted: bool,
}

/// A completion record that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompletion {
    pub user_id: i64,
    pub habit_id: i64,
    pub reward_id: Option<i64>,
    pub completed_at: DateTime<Utc>,
    pub streak_count: u32,
    pub habit_weight: f64,
    pub total_weight: f64,
}

impl NewCompletion {
    pub fn reward_granted(&self) -> bool {
        self.reward_id.is_some()
    }
}

/// Result of a single habit completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub completion_id: i64,
    pub streak: u32,
    pub total_weight: f64,
    pub reward: Option<Reward>,
    pub progress: Option<ProgressView>,
}

/// Displayed streak for one habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStreak {
    pub habit_id: i64,
    pub habit_name: String,
    pub streak: u32,
    pub last_completed_at: Option<DateTime<Utc>>,
}
