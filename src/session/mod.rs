//! Session layer
//!
//! The signed-in user, their profile and the stores behind them.

pub mod manager;
pub mod store;

pub use manager::{AuthUser, ListenerId, SessionManager, SessionSnapshot};
pub use store::{
    MemoryProfileStore, ProfileStore, SqliteProfileStore, StoreError, StoreResult, DEMO_EMAIL,
};
