//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;
use crate::models::{catalog, group, message};

/// Current schema version
const SCHEMA_VERSION: i32 = 3;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (2)", [])?;
    }

    if current_version < 3 {
        migrate_v3(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (3)", [])?;
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- USERS
        -- One row per account; onboarding fields stay NULL until set
        -- ============================================
        CREATE TABLE users (
            uid TEXT PRIMARY KEY DEFAULT ('user-' || lower(hex(randomblob(8)))),
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            display_name TEXT,
            age INTEGER,                         -- years
            gender TEXT CHECK(gender IN ('male', 'female', 'other')),
            height REAL,                         -- cm
            weight REAL,                         -- kg
            target TEXT CHECK(target IN ('lose', 'maintain', 'gain')),
            activity_level TEXT CHECK(activity_level IN
                ('sedentary', 'light', 'moderate', 'active', 'very_active')),
            current_diet_id TEXT,
            package_id TEXT,
            team_id TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Single row: the account that is currently signed in
        CREATE TABLE active_session (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            uid TEXT NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
            started_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- CATALOG
        -- Diet packages and diet programs
        -- ============================================
        CREATE TABLE packages (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            goal TEXT NOT NULL CHECK(goal IN ('lose_weight', 'maintain', 'gain_muscle')),
            description TEXT NOT NULL,
            rules_json TEXT NOT NULL DEFAULT '[]',
            allowed_foods_json TEXT NOT NULL DEFAULT '[]',
            forbidden_foods_json TEXT NOT NULL DEFAULT '[]',
            sample_day_json TEXT NOT NULL
        );

        CREATE TABLE diet_programs (
            id TEXT PRIMARY KEY,                 -- doubles as the macro split key
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            icon TEXT NOT NULL,
            difficulty TEXT NOT NULL CHECK(difficulty IN ('easy', 'medium', 'hard')),
            duration_weeks INTEGER NOT NULL
        );

        CREATE TABLE diet_daily_plans (
            program_id TEXT NOT NULL REFERENCES diet_programs(id) ON DELETE CASCADE,
            day INTEGER NOT NULL CHECK(day BETWEEN 1 AND 7),
            total_calories REAL NOT NULL,
            PRIMARY KEY (program_id, day)
        );

        CREATE TABLE diet_plan_meals (
            id TEXT NOT NULL,
            program_id TEXT NOT NULL,
            day INTEGER NOT NULL,
            name TEXT NOT NULL,
            calories REAL NOT NULL,
            protein REAL NOT NULL,
            carbs REAL NOT NULL,
            fat REAL NOT NULL,
            image TEXT,
            meal_type TEXT NOT NULL CHECK(meal_type IN ('breakfast', 'lunch', 'dinner', 'snack')),
            sort_order INTEGER NOT NULL,
            PRIMARY KEY (program_id, day, id),
            FOREIGN KEY (program_id, day)
                REFERENCES diet_daily_plans(program_id, day) ON DELETE CASCADE
        );

        -- ============================================
        -- TRACKING
        -- Keyed by user uid only: demo mode keeps profiles outside SQLite
        -- ============================================
        CREATE TABLE daily_tracking (
            user_uid TEXT NOT NULL,
            date TEXT NOT NULL,                  -- ISO date: "2025-01-09"
            calories REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,     -- grams
            carbs REAL NOT NULL DEFAULT 0,       -- grams
            fat REAL NOT NULL DEFAULT 0,         -- grams
            water_liters REAL NOT NULL DEFAULT 0,
            steps INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_uid, date)
        );

        CREATE TABLE history_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_uid TEXT NOT NULL,
            date TEXT NOT NULL,
            weight REAL NOT NULL,                -- kg
            notes TEXT,
            calories REAL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_history_user_date ON history_entries(user_uid, date);
        "#,
    )?;

    Ok(())
}

/// Migration v2: Seed the default package and diet program catalog
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    let seeded = catalog::seed_default_catalog(conn)?;
    tracing::info!("Seeded {} catalog records", seeded);
    Ok(())
}

/// Migration v3: Community groups and the coaching inbox
fn migrate_v3(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- COMMUNITY
        -- Groups and a shared inbox; timestamps are Unix ms
        -- ============================================
        CREATE TABLE groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            member_count INTEGER NOT NULL DEFAULT 0,
            description TEXT NOT NULL,
            next_session TEXT,
            image TEXT
        );

        CREATE TABLE conversations (
            id TEXT PRIMARY KEY,
            participant_name TEXT NOT NULL,
            last_message TEXT NOT NULL DEFAULT '',
            unread_count INTEGER NOT NULL DEFAULT 0,
            avatar TEXT,
            timestamp INTEGER NOT NULL
        );

        CREATE TABLE messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            sender_id TEXT NOT NULL,
            sender_name TEXT NOT NULL,
            text TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            is_mine INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX idx_messages_conversation ON messages(conversation_id, timestamp);
        "#,
    )?;

    let groups = group::seed_default_groups(conn)?;
    let conversations = message::seed_default_inbox(conn, chrono::Utc::now().timestamp_millis())?;
    tracing::info!("Seeded {} groups and {} conversations", groups, conversations);
    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());

        run_migrations(&conn).unwrap();
        let packages: i64 = conn
            .query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(packages, 3);
        let messages: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(messages, 3);
    }
}
