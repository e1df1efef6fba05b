//! Per-(user, habit) streaks derived from the completion log.
//!
//! Two accessors with different semantics:
//! - [`StreakCalculator::calculate_next_streak`] is the only one allowed when
//!   writing a new completion; it looks at dates.
//! - [`StreakCalculator::current_streak`] is for display and returns the last
//!   recorded value untouched, so a habit skipped today is not shown as
//!   silently advanced.

use chrono::{Duration, FixedOffset, NaiveDate};

use super::clock::local_date;
use crate::error::Result;
use crate::storage::Database;

/// Streak for a completion on `today`, given the previous completion's
/// calendar date and streak count.
pub fn next_streak(previous: Option<(NaiveDate, u32)>, today: NaiveDate) -> u32 {
    match previous {
        None => 1,
        Some((last_day, streak)) if last_day == today => streak,
        Some((last_day, streak)) if last_day + Duration::days(1) == today => streak + 1,
        Some(_) => 1,
    }
}

pub struct StreakCalculator<'a> {
    db: &'a Database,
    utc_offset: FixedOffset,
}

impl<'a> StreakCalculator<'a> {
    pub fn new(db: &'a Database, utc_offset: FixedOffset) -> Self {
        Self { db, utc_offset }
    }

    /// Streak value to store on a completion dated `today`.
    ///
    /// Same-day re-completion keeps the streak, yesterday extends it, any
    /// larger gap restarts at 1.
    pub fn calculate_next_streak(
        &self,
        user_id: i64,
        habit_id: i64,
        today: NaiveDate,
    ) -> Result<u32> {
        let previous = self
            .db
            .latest_completion(user_id, habit_id)?
            .map(|record| (local_date(record.completed_at, self.utc_offset), record.streak_count));
        Ok(next_streak(previous, today))
    }

    /// Last recorded streak, or 0 when the habit was never completed.
    pub fn current_streak(&self, user_id: i64, habit_id: i64) -> Result<u32> {
        Ok(self
            .db
            .latest_completion(user_id, habit_id)?
            .map_or(0, |record| record.streak_count))
    }
}
