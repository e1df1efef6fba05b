//! Cumulative progress state machine.
//!
//! ## State Transitions
//!
//! ```text
//! PENDING --award--> PENDING | ACHIEVED
//! ACHIEVED --claim--> CLAIMED (pieces reset to 0)
//! CLAIMED --award--> PENDING (new cycle, pieces = 1) | ACHIEVED (instant rewards)
//! ```
//!
//! The transition functions are pure; [`ProgressTracker`] loads, applies and
//! stores them. Callers own the surrounding transaction.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, Result};
use crate::model::{ProgressStatus, Reward, RewardProgress};
use crate::storage::Database;

/// Add one piece, starting a new cycle first if the reward was claimed.
///
/// Refuses to go past `pieces_required` while unclaimed.
pub fn apply_award(
    mut progress: RewardProgress,
    reward: &Reward,
    now: DateTime<Utc>,
) -> Result<RewardProgress> {
    match progress.status(reward.pieces_required) {
        ProgressStatus::Achieved => Err(CoreError::InvalidStateTransition {
            reward_id: reward.id,
            status: ProgressStatus::Achieved,
            action: "award a piece to",
        }),
        ProgressStatus::Claimed => {
            progress.claimed = false;
            progress.pieces_earned = 1;
            progress.updated_at = now;
            Ok(progress)
        }
        ProgressStatus::Pending => {
            progress.pieces_earned = (progress.pieces_earned + 1).min(reward.pieces_required);
            progress.updated_at = now;
            Ok(progress)
        }
    }
}

/// Redeem an achieved reward: `claimed = true`, counter back to 0.
pub fn apply_claim(
    mut progress: RewardProgress,
    reward: &Reward,
    now: DateTime<Utc>,
) -> Result<RewardProgress> {
    let status = progress.status(reward.pieces_required);
    if status != ProgressStatus::Achieved {
        return Err(CoreError::InvalidStateTransition {
            reward_id: reward.id,
            status,
            action: "claim",
        });
    }
    progress.claimed = true;
    progress.pieces_earned = 0;
    progress.updated_at = now;
    Ok(progress)
}

/// Take back one piece and clear `claimed`.
///
/// A claimed row is first restored to its pre-claim count.
pub fn apply_revert(
    mut progress: RewardProgress,
    reward: &Reward,
    now: DateTime<Utc>,
) -> Result<RewardProgress> {
    if progress.claimed {
        progress.claimed = false;
        progress.pieces_earned = reward.pieces_required;
    }
    if progress.pieces_earned == 0 {
        return Err(CoreError::InvalidStateTransition {
            reward_id: reward.id,
            status: ProgressStatus::Pending,
            action: "revert a piece of",
        });
    }
    progress.pieces_earned -= 1;
    progress.updated_at = now;
    Ok(progress)
}

/// Loads, transitions and stores progress rows.
pub struct ProgressTracker<'a> {
    db: &'a Database,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn load(&self, user_id: i64, reward_id: i64, now: DateTime<Utc>) -> Result<RewardProgress> {
        Ok(self
            .db
            .get_progress(user_id, reward_id)?
            .unwrap_or_else(|| RewardProgress::empty(user_id, reward_id, now)))
    }

    /// Award one piece; the row is created on first use.
    pub fn award_piece(
        &self,
        user_id: i64,
        reward: &Reward,
        now: DateTime<Utc>,
    ) -> Result<RewardProgress> {
        let progress = apply_award(self.load(user_id, reward.id, now)?, reward, now)?;
        self.db.upsert_progress(&progress)?;
        Ok(progress)
    }

    pub fn claim(
        &self,
        user_id: i64,
        reward: &Reward,
        now: DateTime<Utc>,
    ) -> Result<RewardProgress> {
        let progress = apply_claim(self.load(user_id, reward.id, now)?, reward, now)?;
        self.db.upsert_progress(&progress)?;
        Ok(progress)
    }

    /// Administrative undo of one awarded piece.
    pub fn revert(
        &self,
        user_id: i64,
        reward: &Reward,
        now: DateTime<Utc>,
    ) -> Result<RewardProgress> {
        let progress = apply_revert(self.load(user_id, reward.id, now)?, reward, now)?;
        self.db.upsert_progress(&progress)?;
        Ok(progress)
    }
}
