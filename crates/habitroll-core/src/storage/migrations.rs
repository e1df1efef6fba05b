//! Database schema migrations for habitroll.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, habits, reward catalog, progress and the completion log.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            weight      REAL NOT NULL DEFAULT 1.0,
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            weight      REAL NOT NULL DEFAULT 1.0,
            category    TEXT NOT NULL DEFAULT 'general',
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rewards (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            name             TEXT NOT NULL,
            weight           REAL NOT NULL DEFAULT 1.0,
            pieces_required  INTEGER NOT NULL DEFAULT 1 CHECK (pieces_required >= 1),
            piece_value      REAL,
            max_daily_claims INTEGER,
            active           INTEGER NOT NULL DEFAULT 1,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reward_progress (
            user_id       INTEGER NOT NULL REFERENCES users(id),
            reward_id     INTEGER NOT NULL REFERENCES rewards(id),
            pieces_earned INTEGER NOT NULL DEFAULT 0 CHECK (pieces_earned >= 0),
            claimed       INTEGER NOT NULL DEFAULT 0,
            updated_at    TEXT NOT NULL,
            PRIMARY KEY (user_id, reward_id)
        );

        CREATE TABLE IF NOT EXISTS completions (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id        INTEGER NOT NULL REFERENCES users(id),
            habit_id       INTEGER NOT NULL REFERENCES habits(id),
            reward_id      INTEGER REFERENCES rewards(id),
            completed_at   TEXT NOT NULL,
            streak_count   INTEGER NOT NULL,
            habit_weight   REAL NOT NULL,
            total_weight   REAL NOT NULL,
            reward_granted INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_completions_user_habit
            ON completions(user_id, habit_id, completed_at);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: "no reward" sentinel flag and the daily-cap index.
///
/// Adds:
/// - rewards.is_nothing: drawing the entry grants nothing
/// - idx_completions_user_reward: serves per-day piece counting
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE rewards ADD COLUMN is_nothing INTEGER NOT NULL DEFAULT 0;

         CREATE INDEX IF NOT EXISTS idx_completions_user_reward
            ON completions(user_id, reward_id, completed_at);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let has_is_nothing: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('rewards') WHERE name = 'is_nothing'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(has_is_nothing, 1);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    /// A v1 database keeps its rows and gains the sentinel column.
    #[test]
    fn test_incremental_migration() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO rewards (name, weight, created_at)
             VALUES ('Coffee', 2.0, '2024-01-01T12:00:00.000000Z')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 2);

        let is_nothing: bool = conn
            .query_row("SELECT is_nothing FROM rewards WHERE name = 'Coffee'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(!is_nothing);
    }
}
