//! Completion pipeline and the caller-facing operations.
//!
//! ## Usage
//!
//! ```ignore
//! let db = Database::open()?;
//! let mut engine = CompletionOrchestrator::new(db, config.engine_settings()?);
//! let outcome = engine.complete(user_id, habit_id, Utc::now())?;
//! ```

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;

use super::clock::day_bounds;
use super::progress::ProgressTracker;
use super::selector::RewardSelector;
use super::streak::StreakCalculator;
use super::weight::WeightResolver;
use super::EngineSettings;
use crate::error::{CoreError, EntityKind, Result};
use crate::model::{
    CompletionOutcome, CompletionRecord, Habit, HabitStreak, NewCompletion, ProgressView, Reward,
    User,
};
use crate::storage::Database;

/// Runs completions against one database handle.
///
/// Owns its random source so draws are reproducible when seeded.
pub struct CompletionOrchestrator<R = Mcg128Xsl64> {
    db: Database,
    settings: EngineSettings,
    weights: WeightResolver,
    selector: RewardSelector,
    rng: R,
}

impl CompletionOrchestrator<Mcg128Xsl64> {
    /// Seeded from `settings.seed`, or from OS entropy when unset.
    pub fn new(db: Database, settings: EngineSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self::with_rng(db, settings, rng)
    }
}

impl<R: Rng> CompletionOrchestrator<R> {
    pub fn with_rng(db: Database, settings: EngineSettings, rng: R) -> Self {
        Self {
            db,
            weights: WeightResolver::new(settings.streak_rate),
            selector: RewardSelector::new(),
            settings,
            rng,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn require_user(&self, user_id: i64) -> Result<User> {
        self.db.get_user(user_id)?.ok_or(CoreError::NotFound {
            entity: EntityKind::User,
            id: user_id,
        })
    }

    fn require_active_user(&self, user_id: i64) -> Result<User> {
        let user = self.require_user(user_id)?;
        if !user.active {
            return Err(CoreError::Inactive {
                entity: EntityKind::User,
                id: user_id,
            });
        }
        Ok(user)
    }

    fn require_active_habit(&self, habit_id: i64) -> Result<Habit> {
        let habit = self.db.get_habit(habit_id)?.ok_or(CoreError::NotFound {
            entity: EntityKind::Habit,
            id: habit_id,
        })?;
        if !habit.active {
            return Err(CoreError::Inactive {
                entity: EntityKind::Habit,
                id: habit_id,
            });
        }
        Ok(habit)
    }

    fn require_reward(db: &Database, reward_id: i64) -> Result<Reward> {
        db.get_reward(reward_id)?.ok_or(CoreError::NotFound {
            entity: EntityKind::Reward,
            id: reward_id,
        })
    }

    /// Record a habit completion and draw a reward for it.
    ///
    /// Validation happens first and writes nothing. Everything after it,
    /// from the streak lookup to the audit insert, runs in one immediate
    /// transaction: a failure leaves progress and the completion log as
    /// they were.
    pub fn complete(
        &mut self,
        user_id: i64,
        habit_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let user = self.require_active_user(user_id)?;
        let habit = self.require_active_habit(habit_id)?;

        let settings = self.settings;
        let weights = self.weights;
        let selector = self.selector;
        let rng = &mut self.rng;

        let outcome = self.db.immediate_transaction(|db| {
            let today = settings.local_date(completed_at);
            let streak = StreakCalculator::new(db, settings.utc_offset)
                .calculate_next_streak(user.id, habit.id, today)?;
            let total_weight = weights.total_weight(&habit, &user, streak);

            let (day_start, day_end) = day_bounds(today, settings.utc_offset);
            let todays_counts = db.piece_counts_between(user.id, day_start, day_end)?;
            let progress_rows = db.progress_by_reward(user.id)?;
            let catalog = db.list_active_rewards()?;

            let selection =
                selector.select(&catalog, total_weight, &progress_rows, &todays_counts, rng);
            let granted = selection.granted().cloned();

            let progress = match &granted {
                Some(reward) => {
                    let row = ProgressTracker::new(db).award_piece(user.id, reward, completed_at)?;
                    Some(ProgressView::new(reward, &row))
                }
                None => None,
            };

            let record = db.insert_completion(&NewCompletion {
                user_id: user.id,
                habit_id: habit.id,
                reward_id: granted.as_ref().map(|reward| reward.id),
                completed_at,
                streak_count: streak,
                habit_weight: habit.weight,
                total_weight,
            })?;

            Ok(CompletionOutcome {
                completion_id: record.id,
                streak,
                total_weight,
                reward: granted,
                progress,
            })
        })?;

        tracing::info!(
            "completion {}: user {} habit {} streak {} weight {:.3} reward {}",
            outcome.completion_id,
            user.id,
            habit.id,
            outcome.streak,
            outcome.total_weight,
            outcome
                .reward
                .as_ref()
                .map_or_else(|| "none".to_string(), |reward| reward.name.clone())
        );
        Ok(outcome)
    }

    /// Displayed streak for every active habit, never recomputed from dates.
    pub fn current_streaks(&self, user_id: i64) -> Result<Vec<HabitStreak>> {
        let user = self.require_user(user_id)?;
        let calculator = StreakCalculator::new(&self.db, self.settings.utc_offset);

        self.db
            .list_habits(false)?
            .into_iter()
            .map(|habit| -> Result<HabitStreak> {
                let last_completed_at = self
                    .db
                    .latest_completion(user.id, habit.id)?
                    .map(|record| record.completed_at);
                Ok(HabitStreak {
                    streak: calculator.current_streak(user.id, habit.id)?,
                    habit_id: habit.id,
                    habit_name: habit.name,
                    last_completed_at,
                })
            })
            .collect()
    }

    /// Redeem an ACHIEVED reward.
    pub fn claim(&self, user_id: i64, reward_id: i64) -> Result<ProgressView> {
        let user = self.require_user(user_id)?;
        let view = self.db.immediate_transaction(|db| {
            let reward = Self::require_reward(db, reward_id)?;
            let row = ProgressTracker::new(db).claim(user.id, &reward, Utc::now())?;
            Ok(ProgressView::new(&reward, &row))
        })?;
        tracing::info!("user {} claimed reward {}", user.id, reward_id);
        Ok(view)
    }

    pub fn list_active_rewards(&self) -> Result<Vec<Reward>> {
        self.db.list_active_rewards()
    }

    pub fn progress_for_user(&self, user_id: i64) -> Result<Vec<ProgressView>> {
        let user = self.require_user(user_id)?;
        self.db.progress_views(user.id)
    }

    /// Newest-first completion log for a user.
    pub fn history(&self, user_id: i64, limit: u32) -> Result<Vec<CompletionRecord>> {
        let user = self.require_user(user_id)?;
        self.db.list_completions(user.id, limit)
    }

    /// Administrative undo of one completion.
    ///
    /// Deletes the record and, if it granted a piece, takes that piece back,
    /// both in one transaction. Streaks and daily counts follow from the log.
    ///
    /// The piece always comes off the current progress row. Reverting a
    /// completion whose cycle was already claimed therefore decrements the
    /// cycle in progress, not the redeemed one.
    pub fn revert_completion(&self, completion_id: i64) -> Result<CompletionRecord> {
        let record = self.db.immediate_transaction(|db| {
            let record = db.get_completion(completion_id)?.ok_or(CoreError::NotFound {
                entity: EntityKind::Completion,
                id: completion_id,
            })?;
            if let (true, Some(reward_id)) = (record.reward_granted, record.reward_id) {
                let reward = Self::require_reward(db, reward_id)?;
                ProgressTracker::new(db).revert(record.user_id, &reward, Utc::now())?;
            }
            db.delete_completion(record.id)?;
            Ok(record)
        })?;
        tracing::info!(
            "reverted completion {} (user {}, habit {})",
            record.id,
            record.user_id,
            record.habit_id
        );
        Ok(record)
    }
}
