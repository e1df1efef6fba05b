//! Cumulative reward progress and its derived status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Reward;

/// Lifecycle of a (user, reward) pair.
///
/// ```text
/// PENDING -> ACHIEVED -> CLAIMED -> PENDING (next piece starts a new cycle)
/// ```
///
/// Never stored; always derived with [`ProgressStatus::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    Pending,
    Achieved,
    Claimed,
}

impl ProgressStatus {
    pub fn derive(pieces_earned: u32, pieces_required: u32, claimed: bool) -> Self {
        if claimed {
            ProgressStatus::Claimed
        } else if pieces_earned >= pieces_required {
            ProgressStatus::Achieved
        } else {
            ProgressStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::Pending => "PENDING",
            ProgressStatus::Achieved => "ACHIEVED",
            ProgressStatus::Claimed => "CLAIMED",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted progress row for one (user, reward) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardProgress {
    pub user_id: i64,
    pub reward_id: i64,
    pub pieces_earned: u32,
    pub claimed: bool,
    pub updated_at: DateTime<Utc>,
}

impl RewardProgress {
    /// Fresh row for a pair that has never earned a piece.
    pub fn empty(user_id: i64, reward_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            reward_id,
            pieces_earned: 0,
            claimed: false,
            updated_at: now,
        }
    }

    pub fn status(&self, pieces_required: u32) -> ProgressStatus {
        ProgressStatus::derive(self.pieces_earned, pieces_required, self.claimed)
    }
}

/// Progress joined with its reward, as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    pub reward_id: i64,
    pub reward_name: String,
    pub pieces_earned: u32,
    pub pieces_required: u32,
    pub claimed: bool,
    pub status: ProgressStatus,
    /// `pieces_earned * piece_value` when the reward carries a value.
    pub earned_value: Option<f64>,
}

impl ProgressView {
    pub fn new(reward: &Reward, progress: &RewardProgress) -> Self {
        Self {
            reward_id: reward.id,
            reward_name: reward.name.clone(),
            pieces_earned: progress.pieces_earned,
            pieces_required: reward.pieces_required,
            claimed: progress.claimed,
            status: progress.status(reward.pieces_required),
            earned_value: reward
                .piece_value
                .map(|value| value * f64::from(progress.pieces_earned)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_status() {
        assert_eq!(ProgressStatus::derive(0, 3, false), ProgressStatus::Pending);
        assert_eq!(ProgressStatus::derive(2, 3, false), ProgressStatus::Pending);
        assert_eq!(ProgressStatus::derive(3, 3, false), ProgressStatus::Achieved);
        // claimed wins regardless of the counter
        assert_eq!(ProgressStatus::derive(0, 3, true), ProgressStatus::Claimed);
        assert_eq!(ProgressStatus::derive(3, 3, true), ProgressStatus::Claimed);
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&ProgressStatus::Achieved).unwrap();
        assert_eq!(json, "\"ACHIEVED\"");
    }
}
