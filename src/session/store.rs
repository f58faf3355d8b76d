//! Profile stores
//!
//! `ProfileStore` is the capability the session layer needs from storage:
//! accounts, profiles and the persisted "signed in" marker. Two backends
//! implement it and one is picked at startup: SQLite for real use, memory
//! for demos and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{
    ActiveSession, ActivityLevel, DailyTracking, Gender, HistoryEntry, ProfileUpdate, UserProfile,
    WeightGoal,
};

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("No account registered for {0}")]
    UnknownAccount(String),

    #[error("An account already exists for {0}")]
    DuplicateEmail(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),

    #[error("No user is signed in")]
    NotSignedIn,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Account and profile storage
pub trait ProfileStore: Send + Sync {
    /// Backend name for status output
    fn name(&self) -> &'static str;

    fn create_profile(&self, email: &str, display_name: Option<&str>) -> StoreResult<UserProfile>;

    fn find_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>>;

    fn get_profile(&self, uid: &str) -> StoreResult<Option<UserProfile>>;

    /// Merge `update` into the stored profile and return the result
    fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> StoreResult<UserProfile>;

    /// Remove an account; returns false if it did not exist
    fn delete_profile(&self, uid: &str) -> StoreResult<bool>;

    /// The uid persisted as signed in, if any
    fn load_session(&self) -> StoreResult<Option<String>>;

    fn save_session(&self, uid: Option<&str>) -> StoreResult<()>;
}

fn normalize_email(email: &str) -> StoreResult<String> {
    let trimmed = email.trim();
    let valid = trimmed
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        return Err(StoreError::InvalidEmail(email.to_string()));
    }
    Ok(trimmed.to_lowercase())
}

// ============================================================================
// SQLite
// ============================================================================

/// Profiles stored in the `users` table
#[derive(Clone)]
pub struct SqliteProfileStore {
    database: Database,
}

impl SqliteProfileStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

impl ProfileStore for SqliteProfileStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn create_profile(&self, email: &str, display_name: Option<&str>) -> StoreResult<UserProfile> {
        let email = normalize_email(email)?;
        let conn = self.database.get_conn()?;
        if UserProfile::get_by_email(&conn, &email)?.is_some() {
            return Err(StoreError::DuplicateEmail(email));
        }
        Ok(UserProfile::create(&conn, &email, display_name)?)
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>> {
        let email = normalize_email(email)?;
        Ok(self.database.with_conn(|conn| UserProfile::get_by_email(conn, &email))?)
    }

    fn get_profile(&self, uid: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.database.with_conn(|conn| UserProfile::get_by_uid(conn, uid))?)
    }

    fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> StoreResult<UserProfile> {
        self.database
            .with_conn(|conn| UserProfile::update(conn, uid, update))?
            .ok_or_else(|| StoreError::ProfileNotFound(uid.to_string()))
    }

    fn delete_profile(&self, uid: &str) -> StoreResult<bool> {
        let deleted = self.database.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            DailyTracking::delete_for_user(&tx, uid)?;
            HistoryEntry::delete_for_user(&tx, uid)?;
            let deleted = UserProfile::delete(&tx, uid)?;
            tx.commit()?;
            Ok(deleted)
        })?;
        Ok(deleted)
    }

    fn load_session(&self) -> StoreResult<Option<String>> {
        Ok(self.database.with_conn(ActiveSession::get)?)
    }

    fn save_session(&self, uid: Option<&str>) -> StoreResult<()> {
        self.database.with_conn(|conn| match uid {
            Some(uid) => ActiveSession::set(conn, uid),
            None => ActiveSession::clear(conn),
        })?;
        Ok(())
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Email of the account `MemoryProfileStore::with_demo_account` seeds
pub const DEMO_EMAIL: &str = "demo@example.com";

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<String, UserProfile>,
    session: Option<String>,
    next_id: u64,
}

/// Profiles kept in a map; nothing is persisted
#[derive(Default)]
pub struct MemoryProfileStore {
    state: Mutex<MemoryState>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding one demo account with body metrics filled in but
    /// no package, so it lands on package selection after login
    pub fn with_demo_account() -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            let mut demo = UserProfile::new("mock-user-123", DEMO_EMAIL, Some("Demo User".into()));
            demo.apply(&ProfileUpdate {
                age: Some(25),
                gender: Some(Gender::Male),
                height: Some(175.0),
                weight: Some(70.0),
                activity_level: Some(ActivityLevel::Moderate),
                target: Some(WeightGoal::Maintain),
                ..Default::default()
            });
            state.profiles.insert(demo.uid.clone(), demo);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProfileStore for MemoryProfileStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn create_profile(&self, email: &str, display_name: Option<&str>) -> StoreResult<UserProfile> {
        let email = normalize_email(email)?;
        let mut state = self.lock();
        if state.profiles.values().any(|p| p.email.eq_ignore_ascii_case(&email)) {
            return Err(StoreError::DuplicateEmail(email));
        }

        let uid = loop {
            state.next_id += 1;
            let candidate = format!("mock-user-{}", state.next_id);
            if !state.profiles.contains_key(&candidate) {
                break candidate;
            }
        };
        let profile = UserProfile::new(uid.clone(), email, display_name.map(str::to_string));
        state.profiles.insert(uid, profile.clone());
        Ok(profile)
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>> {
        let email = normalize_email(email)?;
        let state = self.lock();
        Ok(state
            .profiles
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(&email))
            .cloned())
    }

    fn get_profile(&self, uid: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.lock().profiles.get(uid).cloned())
    }

    fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> StoreResult<UserProfile> {
        let mut state = self.lock();
        let profile = state
            .profiles
            .get_mut(uid)
            .ok_or_else(|| StoreError::ProfileNotFound(uid.to_string()))?;
        profile.apply(update);
        Ok(profile.clone())
    }

    fn delete_profile(&self, uid: &str) -> StoreResult<bool> {
        let mut state = self.lock();
        if state.session.as_deref() == Some(uid) {
            state.session = None;
        }
        Ok(state.profiles.remove(uid).is_some())
    }

    fn load_session(&self) -> StoreResult<Option<String>> {
        Ok(self.lock().session.clone())
    }

    fn save_session(&self, uid: Option<&str>) -> StoreResult<()> {
        self.lock().session = uid.map(str::to_string);
        Ok(())
    }
}
