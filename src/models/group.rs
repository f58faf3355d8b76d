//! Group model
//!
//! Community groups users can browse.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// A community group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub member_count: u32,
    pub description: String,
    pub next_session: Option<String>, // free text, e.g. "Wed, 8:00 PM"
    pub image: Option<String>,
}

impl Group {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            member_count: row.get("member_count")?,
            description: row.get("description")?,
            next_session: row.get("next_session")?,
            image: row.get("image")?,
        })
    }

    /// Insert a group unless one with the same id already exists
    pub fn insert(conn: &Connection, group: &Group) -> DbResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO groups (id, name, member_count, description, next_session, image)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                group.id,
                group.name,
                group.member_count,
                group.description,
                group.next_session,
                group.image,
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM groups ORDER BY id")?;
        let groups = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    pub fn get_by_id(conn: &Connection, id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM groups WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(group) => Ok(Some(group)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn default_groups() -> Vec<Group> {
    let group = |id: &str, name: &str, members: u32, description: &str, next: &str| Group {
        id: id.into(),
        name: name.into(),
        member_count: members,
        description: description.into(),
        next_session: Some(next.into()),
        image: None,
    };

    vec![
        group("g1", "Morning Cardio Crew", 15, "We run every morning at 7 AM.", "Tomorrow, 7:00 AM"),
        group("g2", "Keto Warriors", 42, "Support group for Keto diet beginners.", "Wed, 8:00 PM"),
        group("g3", "Yoga & Chill", 28, "Relaxing yoga sessions for stress relief.", "Fri, 6:00 PM"),
    ]
}

/// Insert the default groups, returning how many were new
pub fn seed_default_groups(conn: &Connection) -> DbResult<usize> {
    let mut inserted = 0;
    for group in default_groups() {
        if Group::insert(conn, &group)? {
            inserted += 1;
        }
    }
    Ok(inserted)
}
