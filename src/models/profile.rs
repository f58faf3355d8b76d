//! User profile model
//!
//! The account record that onboarding fills in and the nutrition
//! calculator reads. Body metrics stay optional until the user supplies
//! them; `CompleteProfile` is the validated form with every metric present.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// Biological sex used by the BMR formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// Weight goal driving the calorie adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightGoal {
    Lose,
    Maintain,
    Gain,
}

impl WeightGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightGoal::Lose => "lose",
            WeightGoal::Maintain => "maintain",
            WeightGoal::Gain => "gain",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lose" | "lose_weight" => Some(WeightGoal::Lose),
            "maintain" => Some(WeightGoal::Maintain),
            "gain" | "gain_muscle" => Some(WeightGoal::Gain),
            _ => None,
        }
    }
}

/// Self-reported activity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "active" => Some(ActivityLevel::Active),
            "very_active" => Some(ActivityLevel::VeryActive),
            _ => None,
        }
    }
}

/// A user account with its onboarding data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub height: Option<f64>, // cm
    pub weight: Option<f64>, // kg
    pub target: Option<WeightGoal>,
    pub activity_level: Option<ActivityLevel>,
    pub current_diet_id: Option<String>,
    pub package_id: Option<String>,
    pub team_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial profile update; only `Some` fields are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub target: Option<WeightGoal>,
    pub activity_level: Option<ActivityLevel>,
    pub current_diet_id: Option<String>,
    pub package_id: Option<String>,
    pub team_id: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }
}

/// A profile whose body metrics are all present and positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompleteProfile {
    pub age: u32,
    pub gender: Gender,
    pub height: f64,
    pub weight: f64,
    pub target: Option<WeightGoal>,
    pub activity_level: Option<ActivityLevel>,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl UserProfile {
    /// A fresh in-memory profile with only identity fields set
    pub fn new(uid: impl Into<String>, email: impl Into<String>, display_name: Option<String>) -> Self {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            uid: uid.into(),
            email: email.into(),
            display_name,
            age: None,
            gender: None,
            height: None,
            weight: None,
            target: None,
            activity_level: None,
            current_diet_id: None,
            package_id: None,
            team_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Positive weight in kg, if known
    pub fn weight_kg(&self) -> Option<f64> {
        positive(self.weight)
    }

    /// Whether age, height and weight are all present and positive.
    ///
    /// This is the onboarding gate; gender is not part of it.
    pub fn has_body_metrics(&self) -> bool {
        self.age.is_some_and(|a| a > 0) && positive(self.height).is_some() && positive(self.weight).is_some()
    }

    /// Whether a diet package has been chosen
    pub fn has_package(&self) -> bool {
        self.package_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Validate into a `CompleteProfile`, or `None` if any metric is missing
    pub fn complete(&self) -> Option<CompleteProfile> {
        Some(CompleteProfile {
            age: self.age.filter(|a| *a > 0)?,
            gender: self.gender?,
            height: positive(self.height)?,
            weight: positive(self.weight)?,
            target: self.target,
            activity_level: self.activity_level,
        })
    }

    /// Merge an update into this profile
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(ref v) = update.display_name {
            self.display_name = Some(v.clone());
        }
        if let Some(v) = update.age {
            self.age = Some(v);
        }
        if let Some(v) = update.gender {
            self.gender = Some(v);
        }
        if let Some(v) = update.height {
            self.height = Some(v);
        }
        if let Some(v) = update.weight {
            self.weight = Some(v);
        }
        if let Some(v) = update.target {
            self.target = Some(v);
        }
        if let Some(v) = update.activity_level {
            self.activity_level = Some(v);
        }
        if let Some(ref v) = update.current_diet_id {
            self.current_diet_id = Some(v.clone());
        }
        if let Some(ref v) = update.package_id {
            self.package_id = Some(v.clone());
        }
        if let Some(ref v) = update.team_id {
            self.team_id = Some(v.clone());
        }
        self.updated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    }

    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let gender: Option<String> = row.get("gender")?;
        let target: Option<String> = row.get("target")?;
        let activity_level: Option<String> = row.get("activity_level")?;

        Ok(Self {
            uid: row.get("uid")?,
            email: row.get("email")?,
            display_name: row.get("display_name")?,
            age: row.get("age")?,
            gender: gender.as_deref().and_then(Gender::from_str),
            height: row.get("height")?,
            weight: row.get("weight")?,
            target: target.as_deref().and_then(WeightGoal::from_str),
            activity_level: activity_level.as_deref().and_then(ActivityLevel::from_str),
            current_diet_id: row.get("current_diet_id")?,
            package_id: row.get("package_id")?,
            team_id: row.get("team_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new account with only identity fields
    pub fn create(conn: &Connection, email: &str, display_name: Option<&str>) -> DbResult<Self> {
        let uid: String = conn.query_row(
            "INSERT INTO users (email, display_name) VALUES (?1, ?2) RETURNING uid",
            params![email.trim(), display_name],
            |row| row.get(0),
        )?;

        Self::get_by_uid(conn, &uid)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a profile by uid
    pub fn get_by_uid(conn: &Connection, uid: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM users WHERE uid = ?1")?;

        match stmt.query_row([uid], Self::from_row) {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a profile by email (case-insensitive)
    pub fn get_by_email(conn: &Connection, email: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM users WHERE email = ?1")?;

        match stmt.query_row([email.trim()], Self::from_row) {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a partial update, returning the stored profile
    pub fn update(conn: &Connection, uid: &str, data: &ProfileUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! set_field {
            ($column:literal, $value:expr) => {
                if let Some(v) = $value {
                    params_vec.push(Box::new(v));
                    updates.push(format!("{} = ?{}", $column, params_vec.len()));
                }
            };
        }

        set_field!("display_name", data.display_name.clone());
        set_field!("age", data.age);
        set_field!("gender", data.gender.map(|g| g.as_str()));
        set_field!("height", data.height);
        set_field!("weight", data.weight);
        set_field!("target", data.target.map(|t| t.as_str()));
        set_field!("activity_level", data.activity_level.map(|a| a.as_str()));
        set_field!("current_diet_id", data.current_diet_id.clone());
        set_field!("package_id", data.package_id.clone());
        set_field!("team_id", data.team_id.clone());

        if updates.is_empty() {
            return Self::get_by_uid(conn, uid);
        }

        params_vec.push(Box::new(uid.to_string()));
        let sql = format!(
            "UPDATE users SET {}, updated_at = datetime('now') WHERE uid = ?{}",
            updates.join(", "),
            params_vec.len()
        );

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_uid(conn, uid)
    }

    /// Delete an account
    pub fn delete(conn: &Connection, uid: &str) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM users WHERE uid = ?1", [uid])?;
        Ok(rows > 0)
    }
}

/// The persisted "who is signed in" marker (single row table)
pub struct ActiveSession;

impl ActiveSession {
    pub fn get(conn: &Connection) -> DbResult<Option<String>> {
        match conn.query_row("SELECT uid FROM active_session WHERE id = 1", [], |row| row.get(0)) {
            Ok(uid) => Ok(Some(uid)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(conn: &Connection, uid: &str) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT INTO active_session (id, uid)
            VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET
                uid = excluded.uid,
                started_at = datetime('now')
            "#,
            [uid],
        )?;
        Ok(())
    }

    pub fn clear(conn: &Connection) -> DbResult<()> {
        conn.execute("DELETE FROM active_session", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn onboarded(uid: &str) -> UserProfile {
        let mut profile = UserProfile::new(uid, "a@example.com", None);
        profile.apply(&ProfileUpdate {
            age: Some(25),
            gender: Some(Gender::Male),
            height: Some(175.0),
            weight: Some(70.0),
            ..Default::default()
        });
        profile
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!(Gender::from_str("Female"), Some(Gender::Female));
        assert_eq!(WeightGoal::from_str("lose_weight"), Some(WeightGoal::Lose));
        assert_eq!(ActivityLevel::from_str("very-active"), Some(ActivityLevel::VeryActive));
        assert_eq!(ActivityLevel::from_str("couch"), None);
    }

    #[test]
    fn test_body_metrics_gate() {
        let mut profile = UserProfile::new("u1", "a@example.com", None);
        assert!(!profile.has_body_metrics());

        profile.apply(&ProfileUpdate {
            age: Some(30),
            height: Some(160.0),
            weight: Some(0.0),
            ..Default::default()
        });
        assert!(!profile.has_body_metrics());

        profile.apply(&ProfileUpdate { weight: Some(55.0), ..Default::default() });
        assert!(profile.has_body_metrics());
        // gender is still missing
        assert!(profile.complete().is_none());
    }

    #[test]
    fn test_complete_profile() {
        let complete = onboarded("u1").complete().unwrap();
        assert_eq!(complete.age, 25);
        assert_eq!(complete.gender, Gender::Male);
        assert_eq!(complete.target, None);
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let mut profile = onboarded("u1");
        profile.apply(&ProfileUpdate { package_id: Some("pkg_basic".into()), ..Default::default() });
        assert_eq!(profile.age, Some(25));
        assert!(profile.has_package());
    }

    #[test]
    fn test_create_update_delete() {
        let conn = conn();
        let created = UserProfile::create(&conn, "Jo@Example.com", Some("Jo")).unwrap();
        assert!(created.uid.starts_with("user-"));
        assert_eq!(created.display_name.as_deref(), Some("Jo"));

        let found = UserProfile::get_by_email(&conn, "jo@example.com").unwrap().unwrap();
        assert_eq!(found.uid, created.uid);

        let update = ProfileUpdate {
            age: Some(41),
            gender: Some(Gender::Female),
            activity_level: Some(ActivityLevel::Light),
            ..Default::default()
        };
        let updated = UserProfile::update(&conn, &created.uid, &update).unwrap().unwrap();
        assert_eq!(updated.age, Some(41));
        assert_eq!(updated.gender, Some(Gender::Female));
        assert_eq!(updated.activity_level, Some(ActivityLevel::Light));
        assert_eq!(updated.display_name.as_deref(), Some("Jo"));

        assert!(UserProfile::delete(&conn, &created.uid).unwrap());
        assert!(UserProfile::get_by_uid(&conn, &created.uid).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let conn = conn();
        UserProfile::create(&conn, "dup@example.com", None).unwrap();
        assert!(UserProfile::create(&conn, "DUP@example.com", None).is_err());
    }

    #[test]
    fn test_active_session_cascades_on_delete() {
        let conn = conn();
        let user = UserProfile::create(&conn, "s@example.com", None).unwrap();
        ActiveSession::set(&conn, &user.uid).unwrap();
        assert_eq!(ActiveSession::get(&conn).unwrap(), Some(user.uid.clone()));

        UserProfile::delete(&conn, &user.uid).unwrap();
        assert_eq!(ActiveSession::get(&conn).unwrap(), None);
    }
}
