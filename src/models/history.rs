//! Weight history model

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// A weigh-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_uid: String,
    pub date: String,
    pub weight: f64, // kg
    pub notes: Option<String>,
    pub calories: Option<f64>,
    pub created_at: String,
}

/// Data for recording a weigh-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntryCreate {
    pub date: String,
    pub weight: f64,
    pub notes: Option<String>,
    pub calories: Option<f64>,
}

impl HistoryEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_uid: row.get("user_uid")?,
            date: row.get("date")?,
            weight: row.get("weight")?,
            notes: row.get("notes")?,
            calories: row.get("calories")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn create(conn: &Connection, user_uid: &str, data: &HistoryEntryCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO history_entries (user_uid, date, weight, notes, calories)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![user_uid, data.date, data.weight, data.notes, data.calories],
        )?;

        let id = conn.last_insert_rowid();
        let mut stmt = conn.prepare("SELECT * FROM history_entries WHERE id = ?1")?;
        stmt.query_row([id], Self::from_row).map_err(DbError::from)
    }

    /// Newest first
    pub fn list_for_user(conn: &Connection, user_uid: &str, limit: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM history_entries WHERE user_uid = ?1 ORDER BY date DESC, id DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![user_uid, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn delete_for_user(conn: &Connection, user_uid: &str) -> DbResult<usize> {
        Ok(conn.execute("DELETE FROM history_entries WHERE user_uid = ?1", [user_uid])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    #[test]
    fn test_history_newest_first() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for (date, weight) in [("2023-10-01", 80.0), ("2023-10-15", 78.5), ("2023-10-08", 79.0)] {
            let entry = HistoryEntryCreate {
                date: date.into(),
                weight,
                notes: None,
                calories: None,
            };
            HistoryEntry::create(&conn, "u1", &entry).unwrap();
        }

        let entries = HistoryEntry::list_for_user(&conn, "u1", 10).unwrap();
        let dates: Vec<&str> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["2023-10-15", "2023-10-08", "2023-10-01"]);

        assert_eq!(HistoryEntry::list_for_user(&conn, "u1", 1).unwrap().len(), 1);
        assert!(HistoryEntry::list_for_user(&conn, "u2", 10).unwrap().is_empty());
    }
}
