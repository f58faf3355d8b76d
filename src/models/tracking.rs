//! Daily tracking model
//!
//! What a user consumed and did on a given date: calories and macros
//! eaten, water drunk and steps walked.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// A day of tracked intake and activity for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTracking {
    pub user_uid: String,
    pub date: String, // ISO date: "2025-01-09"
    pub calories: f64,
    pub protein: f64, // grams
    pub carbs: f64,   // grams
    pub fat: f64,     // grams
    pub water_liters: f64,
    pub steps: u32,
}

/// Food intake to add to a day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeLog {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl DailyTracking {
    /// An untouched day
    pub fn empty(user_uid: &str, date: &str) -> Self {
        Self {
            user_uid: user_uid.to_string(),
            date: date.to_string(),
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            water_liters: 0.0,
            steps: 0,
        }
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_uid: row.get("user_uid")?,
            date: row.get("date")?,
            calories: row.get("calories")?,
            protein: row.get("protein")?,
            carbs: row.get("carbs")?,
            fat: row.get("fat")?,
            water_liters: row.get("water_liters")?,
            steps: row.get("steps")?,
        })
    }

    /// Get a day, or an empty record if nothing was tracked yet
    pub fn get(conn: &Connection, user_uid: &str, date: &str) -> DbResult<Self> {
        let mut stmt =
            conn.prepare("SELECT * FROM daily_tracking WHERE user_uid = ?1 AND date = ?2")?;

        match stmt.query_row([user_uid, date], Self::from_row) {
            Ok(day) => Ok(day),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Self::empty(user_uid, date)),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_row(conn: &Connection, user_uid: &str, date: &str) -> DbResult<()> {
        conn.execute(
            "INSERT OR IGNORE INTO daily_tracking (user_uid, date) VALUES (?1, ?2)",
            [user_uid, date],
        )?;
        Ok(())
    }

    /// Add water (liters; negative removes). The total is kept to two
    /// decimals and never drops below zero.
    pub fn add_water(conn: &Connection, user_uid: &str, date: &str, liters: f64) -> DbResult<Self> {
        Self::ensure_row(conn, user_uid, date)?;
        let current = Self::get(conn, user_uid, date)?.water_liters;
        let total = round_to_hundredths((current + liters).max(0.0));

        conn.execute(
            r#"
            UPDATE daily_tracking SET water_liters = ?1, updated_at = datetime('now')
            WHERE user_uid = ?2 AND date = ?3
            "#,
            params![total, user_uid, date],
        )?;

        Self::get(conn, user_uid, date)
    }

    /// Replace the step count for the day
    pub fn set_steps(conn: &Connection, user_uid: &str, date: &str, steps: u32) -> DbResult<Self> {
        Self::ensure_row(conn, user_uid, date)?;
        conn.execute(
            r#"
            UPDATE daily_tracking SET steps = ?1, updated_at = datetime('now')
            WHERE user_uid = ?2 AND date = ?3
            "#,
            params![steps, user_uid, date],
        )?;

        Self::get(conn, user_uid, date)
    }

    /// Accumulate food intake into the day's totals
    pub fn log_intake(conn: &Connection, user_uid: &str, date: &str, intake: &IntakeLog) -> DbResult<Self> {
        Self::ensure_row(conn, user_uid, date)?;
        conn.execute(
            r#"
            UPDATE daily_tracking SET
                calories = calories + ?1,
                protein = protein + ?2,
                carbs = carbs + ?3,
                fat = fat + ?4,
                updated_at = datetime('now')
            WHERE user_uid = ?5 AND date = ?6
            "#,
            params![intake.calories, intake.protein, intake.carbs, intake.fat, user_uid, date],
        )?;

        Self::get(conn, user_uid, date)
    }

    /// Delete every tracked day for a user
    pub fn delete_for_user(conn: &Connection, user_uid: &str) -> DbResult<usize> {
        Ok(conn.execute("DELETE FROM daily_tracking WHERE user_uid = ?1", [user_uid])?)
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_untracked_day_is_empty() {
        let conn = conn();
        let day = DailyTracking::get(&conn, "u1", "2025-01-09").unwrap();
        assert_eq!(day, DailyTracking::empty("u1", "2025-01-09"));
    }

    #[test]
    fn test_water_accumulates_to_two_decimals() {
        let conn = conn();
        DailyTracking::add_water(&conn, "u1", "2025-01-09", 0.25).unwrap();
        DailyTracking::add_water(&conn, "u1", "2025-01-09", 0.1).unwrap();
        let day = DailyTracking::add_water(&conn, "u1", "2025-01-09", 0.2).unwrap();
        assert_eq!(day.water_liters, 0.55);

        let day = DailyTracking::add_water(&conn, "u1", "2025-01-09", -5.0).unwrap();
        assert_eq!(day.water_liters, 0.0);
    }

    #[test]
    fn test_steps_replace_and_intake_adds() {
        let conn = conn();
        DailyTracking::set_steps(&conn, "u1", "2025-01-09", 4000).unwrap();
        let day = DailyTracking::set_steps(&conn, "u1", "2025-01-09", 5430).unwrap();
        assert_eq!(day.steps, 5430);

        let meal = IntakeLog { calories: 500.0, protein: 40.0, carbs: 20.0, fat: 25.0 };
        DailyTracking::log_intake(&conn, "u1", "2025-01-09", &meal).unwrap();
        let day = DailyTracking::log_intake(&conn, "u1", "2025-01-09", &meal).unwrap();
        assert_eq!(day.calories, 1000.0);
        assert_eq!(day.fat, 50.0);
        assert_eq!(day.steps, 5430);

        // other users and dates are untouched
        assert_eq!(DailyTracking::get(&conn, "u2", "2025-01-09").unwrap().calories, 0.0);
        assert_eq!(DailyTracking::get(&conn, "u1", "2025-01-10").unwrap().steps, 0);
    }

    #[test]
    fn test_delete_for_user() {
        let conn = conn();
        DailyTracking::set_steps(&conn, "u1", "2025-01-09", 10).unwrap();
        DailyTracking::set_steps(&conn, "u1", "2025-01-10", 10).unwrap();
        assert_eq!(DailyTracking::delete_for_user(&conn, "u1").unwrap(), 2);
    }
}
