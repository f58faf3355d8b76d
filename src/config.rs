//! Runtime configuration
//!
//! Everything is read from environment variables at startup.

use std::path::PathBuf;

/// Environment variable overriding the SQLite database location
pub const DATABASE_PATH_VAR: &str = "DIETRACK_DATABASE_PATH";

/// Environment variable selecting the profile store backend
pub const STORE_VAR: &str = "DIETRACK_STORE";

/// Which profile store backs the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Profiles and sessions persisted in SQLite
    Sqlite,
    /// Everything in memory, seeded with a demo profile; nothing survives a restart
    Memory,
}

impl StoreKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" => Some(StoreKind::Sqlite),
            "memory" | "mock" | "demo" => Some(StoreKind::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Sqlite => "sqlite",
            StoreKind::Memory => "memory",
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub store: StoreKind,
}

impl Config {
    /// Build the configuration from the process environment
    pub fn from_env() -> Self {
        let store = match std::env::var(STORE_VAR) {
            Ok(value) => StoreKind::from_str(&value).unwrap_or_else(|| {
                tracing::warn!("Unknown {} value '{}', using sqlite", STORE_VAR, value);
                StoreKind::Sqlite
            }),
            Err(_) => StoreKind::Sqlite,
        };

        Self {
            database_path: database_path(),
            store,
        }
    }
}

/// Get the database path from environment or use `<project>/data/dietrack.db`
pub fn database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            // Go up from target/release or target/debug to project root
            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
                    path = grandparent.to_path_buf();
                }
            }

            path.push("data");
            path.push("dietrack.db");
            path
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_from_str() {
        assert_eq!(StoreKind::from_str("sqlite"), Some(StoreKind::Sqlite));
        assert_eq!(StoreKind::from_str(" Memory "), Some(StoreKind::Memory));
        assert_eq!(StoreKind::from_str("mock"), Some(StoreKind::Memory));
        assert_eq!(StoreKind::from_str("firestore"), None);
    }

    #[test]
    fn test_database_path_ends_with_file_name() {
        if std::env::var(DATABASE_PATH_VAR).is_err() {
            assert!(database_path().ends_with("data/dietrack.db"));
        }
    }
}
