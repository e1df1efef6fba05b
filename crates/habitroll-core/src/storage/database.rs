//! SQLite-backed persistence for the reward engine.
//!
//! Provides persistent storage for:
//! - Users, habits and the reward catalog
//! - Per-(user, reward) progress rows
//! - The append-only completion log that streaks and daily caps derive from

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, EntityKind, Result};
use crate::model::{
    CompletionRecord, Habit, NewCompletion, NewHabit, NewReward, NewUser, ProgressStatus,
    ProgressView, Reward, RewardProgress, User,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str = "id, name, weight, active, created_at";
const HABIT_COLUMNS: &str = "id, name, weight, category, active, created_at";
const REWARD_COLUMNS: &str = "id, name, weight, pieces_required, piece_value, max_daily_claims, \
     is_nothing, active, created_at";
const COMPLETION_COLUMNS: &str = "id, user_id, habit_id, reward_id, completed_at, streak_count, \
     habit_weight, total_weight, reward_granted";

// === Helper Functions ===

/// Fixed-width RFC3339 so that string comparison orders timestamps.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drop sub-microsecond precision, matching what [`format_timestamp`] stores.
fn truncate_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(dt.nanosecond() / 1_000 * 1_000).unwrap_or(dt)
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        weight: row.get(2)?,
        active: row.get(3)?,
        created_at: parse_timestamp(row, 4)?,
    })
}

fn row_to_habit(row: &Row) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        name: row.get(1)?,
        weight: row.get(2)?,
        category: row.get(3)?,
        active: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

fn row_to_reward(row: &Row) -> rusqlite::Result<Reward> {
    let max_daily_claims: Option<u32> = row.get(5)?;
    Ok(Reward {
        id: row.get(0)?,
        name: row.get(1)?,
        weight: row.get(2)?,
        pieces_required: row.get(3)?,
        piece_value: row.get(4)?,
        max_daily_claims: max_daily_claims.filter(|cap| *cap > 0),
        is_nothing: row.get(6)?,
        active: row.get(7)?,
        created_at: parse_timestamp(row, 8)?,
    })
}

fn row_to_completion(row: &Row) -> rusqlite::Result<CompletionRecord> {
    Ok(CompletionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        habit_id: row.get(2)?,
        reward_id: row.get(3)?,
        completed_at: parse_timestamp(row, 4)?,
        streak_count: row.get(5)?,
        habit_weight: row.get(6)?,
        total_weight: row.get(7)?,
        reward_granted: row.get(8)?,
    })
}

fn row_to_progress(row: &Row) -> rusqlite::Result<RewardProgress> {
    Ok(RewardProgress {
        user_id: row.get(0)?,
        reward_id: row.get(1)?,
        pieces_earned: row.get(2)?,
        claimed: row.get(3)?,
        updated_at: parse_timestamp(row, 4)?,
    })
}

fn not_found(entity: EntityKind, id: i64) -> CoreError {
    CoreError::NotFound { entity, id }
}

/// SQLite database for habitroll.
///
/// One connection per handle; open several handles on the same file for
/// concurrent writers. Writes that must be atomic go through
/// [`Database::immediate_transaction`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/habitroll.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("habitroll.db"))
    }

    /// Open (creating if needed) the database file at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Run `f` inside `BEGIN IMMEDIATE`, committing on `Ok` and rolling back on `Err`.
    ///
    /// The immediate write lock is taken before `f` reads anything, so two
    /// handles cannot both act on the same pre-transaction snapshot.
    pub fn immediate_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(self) {
            Ok(value) => {
                if let Err(err) = self.conn.execute_batch("COMMIT;") {
                    self.rollback("commit failed");
                    return Err(err.into());
                }
                Ok(value)
            }
            Err(err) => {
                self.rollback(&err.to_string());
                Err(err)
            }
        }
    }

    fn rollback(&self, reason: &str) {
        tracing::warn!("rolling back transaction: {}", reason);
        if let Err(e) = self.conn.execute_batch("ROLLBACK;") {
            tracing::warn!("rollback failed: {}", e);
        }
    }

    // === Users ===

    pub fn create_user(&self, user: &NewUser) -> Result<User> {
        user.validate()?;
        self.conn.execute(
            "INSERT INTO users (name, weight, active, created_at) VALUES (?1, ?2, 1, ?3)",
            params![user.name.trim(), user.weight, format_timestamp(Utc::now())],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)?.ok_or_else(|| not_found(EntityKind::User, id))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_user)
            .optional()?)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn set_user_active(&self, id: i64, active: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(not_found(EntityKind::User, id));
        }
        Ok(())
    }

    pub fn set_user_weight(&self, id: i64, weight: f64) -> Result<()> {
        crate::model::validate_weight("user.weight", weight)?;
        let changed = self.conn.execute(
            "UPDATE users SET weight = ?1 WHERE id = ?2",
            params![weight, id],
        )?;
        if changed == 0 {
            return Err(not_found(EntityKind::User, id));
        }
        Ok(())
    }

    // === Habits ===

    pub fn create_habit(&self, habit: &NewHabit) -> Result<Habit> {
        habit.validate()?;
        self.conn.execute(
            "INSERT INTO habits (name, weight, category, active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                habit.name.trim(),
                habit.weight,
                habit.category,
                format_timestamp(Utc::now()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_habit(id)?.ok_or_else(|| not_found(EntityKind::Habit, id))
    }

    pub fn get_habit(&self, id: i64) -> Result<Option<Habit>> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_habit)
            .optional()?)
    }

    /// List habits ordered by id, optionally including disabled ones.
    pub fn list_habits(&self, include_inactive: bool) -> Result<Vec<Habit>> {
        let sql = if include_inactive {
            format!("SELECT {HABIT_COLUMNS} FROM habits ORDER BY id")
        } else {
            format!("SELECT {HABIT_COLUMNS} FROM habits WHERE active = 1 ORDER BY id")
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let habits = stmt
            .query_map([], row_to_habit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(habits)
    }

    pub fn update_habit(&self, id: i64, habit: &NewHabit) -> Result<Habit> {
        habit.validate()?;
        let changed = self.conn.execute(
            "UPDATE habits SET name = ?1, weight = ?2, category = ?3 WHERE id = ?4",
            params![habit.name.trim(), habit.weight, habit.category, id],
        )?;
        if changed == 0 {
            return Err(not_found(EntityKind::Habit, id));
        }
        self.get_habit(id)?.ok_or_else(|| not_found(EntityKind::Habit, id))
    }

    pub fn set_habit_active(&self, id: i64, active: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE habits SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(not_found(EntityKind::Habit, id));
        }
        Ok(())
    }

    // === Rewards ===

    pub fn create_reward(&self, reward: &NewReward) -> Result<Reward> {
        reward.validate()?;
        self.conn.execute(
            "INSERT INTO rewards
                (name, weight, pieces_required, piece_value, max_daily_claims, is_nothing,
                 active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
            params![
                reward.name.trim(),
                reward.weight,
                reward.pieces_required,
                reward.piece_value,
                reward.max_daily_claims.filter(|cap| *cap > 0),
                reward.is_nothing,
                format_timestamp(Utc::now()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_reward(id)?.ok_or_else(|| not_found(EntityKind::Reward, id))
    }

    pub fn get_reward(&self, id: i64) -> Result<Option<Reward>> {
        let sql = format!("SELECT {REWARD_COLUMNS} FROM rewards WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_reward)
            .optional()?)
    }

    pub fn list_rewards(&self) -> Result<Vec<Reward>> {
        let sql = format!("SELECT {REWARD_COLUMNS} FROM rewards ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rewards = stmt
            .query_map([], row_to_reward)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rewards)
    }

    /// The catalog a completion draws from.
    pub fn list_active_rewards(&self) -> Result<Vec<Reward>> {
        let sql = format!("SELECT {REWARD_COLUMNS} FROM rewards WHERE active = 1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rewards = stmt
            .query_map([], row_to_reward)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rewards)
    }

    pub fn set_reward_active(&self, id: i64, active: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE rewards SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(not_found(EntityKind::Reward, id));
        }
        Ok(())
    }

    // === Completion log ===

    /// Most recent completion of `habit_id` by `user_id`.
    pub fn latest_completion(
        &self,
        user_id: i64,
        habit_id: i64,
    ) -> Result<Option<CompletionRecord>> {
        let sql = format!(
            "SELECT {COMPLETION_COLUMNS} FROM completions
             WHERE user_id = ?1 AND habit_id = ?2
             ORDER BY completed_at DESC, id DESC
             LIMIT 1"
        );
        Ok(self
            .conn
            .query_row(&sql, params![user_id, habit_id], row_to_completion)
            .optional()?)
    }

    /// Pieces awarded to `user_id` per reward within `[start, end)`.
    ///
    /// Counts every awarding completion regardless of later claims.
    pub fn piece_counts_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<i64, u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT reward_id, COUNT(*)
             FROM completions
             WHERE user_id = ?1
               AND reward_id IS NOT NULL
               AND reward_granted = 1
               AND completed_at >= ?2
               AND completed_at < ?3
             GROUP BY reward_id",
        )?;
        let rows = stmt.query_map(
            params![user_id, format_timestamp(start), format_timestamp(end)],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, u32>(1)?)),
        )?;

        let mut counts = HashMap::new();
        for row in rows {
            let (reward_id, count) = row?;
            counts.insert(reward_id, count);
        }
        Ok(counts)
    }

    pub fn insert_completion(&self, record: &NewCompletion) -> Result<CompletionRecord> {
        self.conn.execute(
            "INSERT INTO completions
                (user_id, habit_id, reward_id, completed_at, streak_count,
                 habit_weight, total_weight, reward_granted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.user_id,
                record.habit_id,
                record.reward_id,
                format_timestamp(record.completed_at),
                record.streak_count,
                record.habit_weight,
                record.total_weight,
                record.reward_granted(),
            ],
        )?;
        Ok(CompletionRecord {
            id: self.conn.last_insert_rowid(),
            user_id: record.user_id,
            habit_id: record.habit_id,
            reward_id: record.reward_id,
            completed_at: truncate_micros(record.completed_at),
            streak_count: record.streak_count,
            habit_weight: record.habit_weight,
            total_weight: record.total_weight,
            reward_granted: record.reward_granted(),
        })
    }

    pub fn get_completion(&self, id: i64) -> Result<Option<CompletionRecord>> {
        let sql = format!("SELECT {COMPLETION_COLUMNS} FROM completions WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_completion)
            .optional()?)
    }

    /// Delete a completion. Only administrative reversal should call this.
    pub fn delete_completion(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM completions WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(not_found(EntityKind::Completion, id));
        }
        Ok(())
    }

    /// Newest-first completion history for a user.
    pub fn list_completions(&self, user_id: i64, limit: u32) -> Result<Vec<CompletionRecord>> {
        let sql = format!(
            "SELECT {COMPLETION_COLUMNS} FROM completions
             WHERE user_id = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![user_id, limit], row_to_completion)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count_completions(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM completions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // === Progress ===

    pub fn get_progress(&self, user_id: i64, reward_id: i64) -> Result<Option<RewardProgress>> {
        Ok(self
            .conn
            .query_row(
                "SELECT user_id, reward_id, pieces_earned, claimed, updated_at
                 FROM reward_progress
                 WHERE user_id = ?1 AND reward_id = ?2",
                params![user_id, reward_id],
                row_to_progress,
            )
            .optional()?)
    }

    /// All progress rows for a user, keyed by reward id.
    pub fn progress_by_reward(&self, user_id: i64) -> Result<HashMap<i64, RewardProgress>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, reward_id, pieces_earned, claimed, updated_at
             FROM reward_progress
             WHERE user_id = ?1",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_progress)?;
        let mut progress = HashMap::new();
        for row in rows {
            let row = row?;
            progress.insert(row.reward_id, row);
        }
        Ok(progress)
    }

    pub fn upsert_progress(&self, progress: &RewardProgress) -> Result<()> {
        self.conn.execute(
            "INSERT INTO reward_progress (user_id, reward_id, pieces_earned, claimed, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, reward_id) DO UPDATE SET
                pieces_earned = excluded.pieces_earned,
                claimed = excluded.claimed,
                updated_at = excluded.updated_at",
            params![
                progress.user_id,
                progress.reward_id,
                progress.pieces_earned,
                progress.claimed,
                format_timestamp(progress.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Progress rows joined with their rewards, ordered by reward id.
    pub fn progress_views(&self, user_id: i64) -> Result<Vec<ProgressView>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, p.pieces_earned, r.pieces_required, p.claimed, r.piece_value
             FROM reward_progress p
             JOIN rewards r ON r.id = p.reward_id
             WHERE p.user_id = ?1
             ORDER BY r.id",
        )?;
        let views = stmt
            .query_map(params![user_id], |row| {
                let pieces_earned: u32 = row.get(2)?;
                let pieces_required: u32 = row.get(3)?;
                let claimed: bool = row.get(4)?;
                let piece_value: Option<f64> = row.get(5)?;
                Ok(ProgressView {
                    reward_id: row.get(0)?,
                    reward_name: row.get(1)?,
                    pieces_earned,
                    pieces_required,
                    claimed,
                    status: ProgressStatus::derive(pieces_earned, pieces_required, claimed),
                    earned_value: piece_value.map(|v| v * pieces_earned as f64),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(views)
    }
}
