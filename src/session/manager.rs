//! Session manager
//!
//! Owns the signed-in user and their profile for the lifetime of the
//! process, and fans out auth changes to registered listeners. Created at
//! startup, torn down with `shutdown`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::store::{ProfileStore, StoreError, StoreResult};
use crate::models::{ProfileUpdate, UserProfile};
use crate::onboarding::{self, OnboardingState, Route, RouterInput};

/// The identity of the signed-in account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<&UserProfile> for AuthUser {
    fn from(profile: &UserProfile) -> Self {
        Self {
            uid: profile.uid.clone(),
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
        }
    }
}

/// Handle returned by `subscribe`
pub type ListenerId = u64;

type AuthListener = Arc<dyn Fn(Option<&AuthUser>) + Send + Sync>;

#[derive(Debug)]
struct SessionState {
    user: Option<AuthUser>,
    profile: Option<UserProfile>,
    /// True until the first auth resolution (and its profile fetch) finishes
    loading: bool,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub user: Option<AuthUser>,
    pub profile: Option<UserProfile>,
    pub loading: bool,
    pub onboarding_state: OnboardingState,
}

pub struct SessionManager {
    store: Arc<dyn ProfileStore>,
    state: Mutex<SessionState>,
    listeners: Mutex<Vec<(ListenerId, AuthListener)>>,
    next_listener_id: AtomicU64,
}

impl SessionManager {
    /// A manager in the loading state; call `start` to resolve auth
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SessionState {
                user: None,
                profile: None,
                loading: true,
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Restore the persisted session, if any, and leave the loading state.
    ///
    /// A persisted uid whose profile no longer exists is discarded. Storage
    /// errors never keep the manager loading: an unreadable session counts
    /// as signed out, and an unreadable profile keeps the user signed in
    /// with no profile.
    pub fn start(&self) -> Option<AuthUser> {
        let uid = match self.store.load_session() {
            Ok(uid) => uid,
            Err(e) => {
                tracing::warn!("Error loading persisted session: {}", e);
                None
            }
        };

        let (user, profile) = match uid {
            Some(uid) => match self.store.get_profile(&uid) {
                Ok(Some(profile)) => (Some(AuthUser::from(&profile)), Some(profile)),
                Ok(None) => {
                    tracing::warn!("Discarding session for missing account {}", uid);
                    if let Err(e) = self.store.save_session(None) {
                        tracing::warn!("Error clearing session: {}", e);
                    }
                    (None, None)
                }
                Err(e) => {
                    tracing::warn!("Error fetching profile {}: {}", uid, e);
                    let user = AuthUser {
                        uid,
                        email: String::new(),
                        display_name: None,
                    };
                    (Some(user), None)
                }
            },
            None => (None, None),
        };

        {
            let mut state = self.lock_state();
            state.user = user.clone();
            state.profile = profile;
            state.loading = false;
        }

        match &user {
            Some(u) => tracing::info!("Restored session for {}", u.uid),
            None => tracing::info!("No active session"),
        }
        self.notify(user.as_ref());
        user
    }

    /// Drop all listeners and forget the in-memory session
    pub fn shutdown(&self) {
        self.lock_listeners().clear();
        let mut state = self.lock_state();
        state.user = None;
        state.profile = None;
        state.loading = true;
        tracing::info!("Session manager shut down");
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Register an auth-change callback. Once loading has finished it is
    /// invoked immediately with the current user.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Option<&AuthUser>) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener: AuthListener = Arc::new(listener);
        self.lock_listeners().push((id, listener.clone()));

        let (loading, user) = {
            let state = self.lock_state();
            (state.loading, state.user.clone())
        };
        if !loading {
            listener(user.as_ref());
        }
        id
    }

    /// Remove a callback; returns false for unknown ids
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    fn notify(&self, user: Option<&AuthUser>) {
        // Callbacks run without holding the lock so they may call back in.
        let listeners: Vec<AuthListener> =
            self.lock_listeners().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(user);
        }
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// Create an account and sign it in
    pub fn register(&self, email: &str, display_name: Option<&str>) -> StoreResult<UserProfile> {
        let profile = self.store.create_profile(email, display_name)?;
        tracing::info!("Registered account {}", profile.email);
        self.sign_in(&profile)?;
        Ok(self.profile().unwrap_or(profile))
    }

    /// Sign in an existing account by email
    pub fn login(&self, email: &str) -> StoreResult<AuthUser> {
        let profile = self
            .store
            .find_by_email(email)?
            .ok_or_else(|| StoreError::UnknownAccount(email.trim().to_string()))?;
        self.sign_in(&profile)
    }

    /// Persist and publish a sign-in. The profile is re-read; if that
    /// fails the user is still signed in, with no profile.
    fn sign_in(&self, account: &UserProfile) -> StoreResult<AuthUser> {
        self.store.save_session(Some(&account.uid))?;
        let profile = self.fetch_profile(&account.uid);
        let user = AuthUser::from(account);

        {
            let mut state = self.lock_state();
            state.user = Some(user.clone());
            state.profile = profile;
            state.loading = false;
        }
        tracing::info!("Signed in {}", user.email);
        self.notify(Some(&user));
        Ok(user)
    }

    pub fn logout(&self) -> StoreResult<()> {
        self.store.save_session(None)?;
        let previous = {
            let mut state = self.lock_state();
            state.profile = None;
            state.user.take()
        };
        if let Some(user) = previous {
            tracing::info!("Signed out {}", user.email);
        }
        self.notify(None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    /// Load a profile, treating fetch failures as "no profile"
    fn fetch_profile(&self, uid: &str) -> Option<UserProfile> {
        match self.store.get_profile(uid) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Error fetching profile {}: {}", uid, e);
                None
            }
        }
    }

    /// Store a fetched profile only if `uid` is still the signed-in user
    fn set_profile_for(&self, uid: &str, profile: Option<UserProfile>) -> bool {
        let mut state = self.lock_state();
        if state.user.as_ref().map(|u| u.uid.as_str()) != Some(uid) {
            tracing::debug!("Dropping profile for {}; session changed", uid);
            return false;
        }
        if let Some(p) = &profile {
            state.user = Some(AuthUser::from(p));
        }
        state.profile = profile;
        true
    }

    /// Re-read the signed-in user's profile from the store
    pub fn refresh_profile(&self) -> Option<UserProfile> {
        let uid = self.lock_state().user.as_ref().map(|u| u.uid.clone())?;
        let profile = self.fetch_profile(&uid);
        if !self.set_profile_for(&uid, profile.clone()) {
            return None;
        }
        profile
    }

    /// Apply a partial update to the signed-in user's profile
    pub fn update_profile(&self, update: &ProfileUpdate) -> StoreResult<UserProfile> {
        let user = self.require_user()?;
        let profile = self.store.update_profile(&user.uid, update)?;
        self.set_profile_for(&user.uid, Some(profile.clone()));
        Ok(profile)
    }

    /// Delete the signed-in account and sign out
    pub fn delete_account(&self) -> StoreResult<bool> {
        let user = self.require_user()?;
        let deleted = self.store.delete_profile(&user.uid)?;
        tracing::info!("Deleted account {}", user.email);
        self.logout()?;
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn current_user(&self) -> Option<AuthUser> {
        self.lock_state().user.clone()
    }

    pub fn require_user(&self) -> StoreResult<AuthUser> {
        self.current_user().ok_or(StoreError::NotSignedIn)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.lock_state().profile.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            user: state.user.clone(),
            profile: state.profile.clone(),
            loading: state.loading,
            onboarding_state: OnboardingState::evaluate(state.user.is_some(), state.profile.as_ref()),
        }
    }

    /// Onboarding redirect for the given screen path
    pub fn route_for(&self, current_path: &str) -> Option<Route> {
        let segments = onboarding::parse_path(current_path);
        let state = self.lock_state();
        onboarding::decide(&RouterInput {
            user_present: state.user.is_some(),
            profile: state.profile.as_ref(),
            loading: state.loading,
            current_path: &segments,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, AuthListener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    use crate::db::DbError;
    use crate::models::Gender;
    use crate::session::store::{MemoryProfileStore, DEMO_EMAIL};

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemoryProfileStore::with_demo_account()))
    }

    fn recorder(manager: &SessionManager) -> (ListenerId, Arc<Mutex<Vec<Option<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = manager.subscribe(move |user| {
            sink.lock().unwrap().push(user.map(|u| u.email.clone()));
        });
        (id, seen)
    }

    #[test]
    fn test_loading_until_started() {
        let manager = manager();
        assert!(manager.snapshot().loading);
        assert_eq!(manager.route_for("/(tabs)"), None);

        manager.start();
        assert!(!manager.snapshot().loading);
        assert_eq!(manager.route_for("/(tabs)"), Some(Route::Login));
    }

    #[test]
    fn test_listener_lifecycle() {
        let manager = manager();
        let (id, seen) = recorder(&manager);
        // not called while loading
        assert!(seen.lock().unwrap().is_empty());

        manager.start();
        manager.login(DEMO_EMAIL).unwrap();
        manager.logout().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some(DEMO_EMAIL.to_string()), None]
        );

        assert!(manager.unsubscribe(id));
        assert!(!manager.unsubscribe(id));
        manager.login(DEMO_EMAIL).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_subscribe_after_start_fires_immediately() {
        let manager = manager();
        manager.start();
        manager.login(DEMO_EMAIL).unwrap();
        let (_, seen) = recorder(&manager);
        assert_eq!(*seen.lock().unwrap(), vec![Some(DEMO_EMAIL.to_string())]);
    }

    #[test]
    fn test_onboarding_flow() {
        let manager = manager();
        manager.start();

        manager.register("new@example.com", Some("New")).unwrap();
        assert_eq!(manager.snapshot().onboarding_state, OnboardingState::ProfileIncomplete);
        assert_eq!(manager.route_for("/(auth)/register"), Some(Route::ProfileSetup));

        manager
            .update_profile(&ProfileUpdate {
                age: Some(28),
                height: Some(165.0),
                weight: Some(60.0),
                gender: Some(Gender::Female),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            manager.route_for("/(onboarding)/profile-setup"),
            Some(Route::PackageSelection)
        );

        manager
            .update_profile(&ProfileUpdate { package_id: Some("pkg_basic".into()), ..Default::default() })
            .unwrap();
        assert_eq!(manager.route_for("/(onboarding)/package-selection"), Some(Route::AppRoot));
        assert_eq!(manager.snapshot().onboarding_state, OnboardingState::Ready);
    }

    #[test]
    fn test_unknown_login_and_signed_out_update() {
        let manager = manager();
        manager.start();
        assert!(matches!(manager.login("ghost@example.com"), Err(StoreError::UnknownAccount(_))));
        assert!(matches!(
            manager.update_profile(&ProfileUpdate::default()),
            Err(StoreError::NotSignedIn)
        ));
    }

    #[test]
    fn test_session_restored_on_start() {
        let store: Arc<dyn ProfileStore> = Arc::new(MemoryProfileStore::with_demo_account());
        let first = SessionManager::new(store.clone());
        first.start();
        first.login(DEMO_EMAIL).unwrap();
        first.shutdown();
        assert_eq!(first.listener_count(), 0);

        let second = SessionManager::new(store);
        let restored = second.start().unwrap();
        assert_eq!(restored.email, DEMO_EMAIL);
        assert!(second.profile().unwrap().has_body_metrics());
    }

    #[test]
    fn test_delete_account_signs_out() {
        let manager = manager();
        manager.start();
        manager.register("bye@example.com", None).unwrap();
        assert!(manager.delete_account().unwrap());
        assert!(manager.current_user().is_none());
        assert!(matches!(manager.login("bye@example.com"), Err(StoreError::UnknownAccount(_))));
    }

    type ReadHook = Box<dyn FnOnce() + Send>;

    /// Memory store whose profile reads can fail or run a hook mid-read
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryProfileStore,
        fail_reads: AtomicBool,
        on_read: Mutex<Option<ReadHook>>,
    }

    impl ProfileStore for FlakyStore {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn create_profile(&self, email: &str, display_name: Option<&str>) -> StoreResult<UserProfile> {
            self.inner.create_profile(email, display_name)
        }

        fn find_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>> {
            self.inner.find_by_email(email)
        }

        fn get_profile(&self, uid: &str) -> StoreResult<Option<UserProfile>> {
            let hook = self.on_read.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Db(DbError::Sqlite(rusqlite::Error::InvalidQuery)));
            }
            self.inner.get_profile(uid)
        }

        fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> StoreResult<UserProfile> {
            self.inner.update_profile(uid, update)
        }

        fn delete_profile(&self, uid: &str) -> StoreResult<bool> {
            self.inner.delete_profile(uid)
        }

        fn load_session(&self) -> StoreResult<Option<String>> {
            self.inner.load_session()
        }

        fn save_session(&self, uid: Option<&str>) -> StoreResult<()> {
            self.inner.save_session(uid)
        }
    }

    fn flaky_store() -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: MemoryProfileStore::with_demo_account(),
            ..Default::default()
        })
    }

    #[test]
    fn test_profile_fetch_error_keeps_user_signed_in() {
        let store = flaky_store();
        store.fail_reads.store(true, Ordering::SeqCst);
        let manager = SessionManager::new(store.clone());
        manager.start();

        let user = manager.login(DEMO_EMAIL).unwrap();
        assert_eq!(user.email, DEMO_EMAIL);
        assert_eq!(manager.current_user(), Some(user));
        assert!(manager.profile().is_none());
        assert_eq!(manager.snapshot().onboarding_state, OnboardingState::ProfileIncomplete);
        assert_eq!(manager.route_for("/(tabs)"), Some(Route::ProfileSetup));
    }

    #[test]
    fn test_start_survives_profile_fetch_error() {
        let store = flaky_store();
        store.save_session(Some("mock-user-123")).unwrap();
        store.fail_reads.store(true, Ordering::SeqCst);
        let manager = SessionManager::new(store.clone());

        let restored = manager.start().unwrap();
        assert_eq!(restored.uid, "mock-user-123");
        assert!(!manager.snapshot().loading);
        assert_eq!(manager.route_for("/(tabs)"), Some(Route::ProfileSetup));

        store.fail_reads.store(false, Ordering::SeqCst);
        assert!(manager.refresh_profile().is_some());
        assert_eq!(manager.current_user().unwrap().email, DEMO_EMAIL);
        assert_eq!(manager.route_for("/(tabs)"), Some(Route::PackageSelection));
    }

    #[test]
    fn test_stale_profile_read_is_dropped() {
        let store = flaky_store();
        store.create_profile("other@example.com", Some("Other")).unwrap();
        let manager = Arc::new(SessionManager::new(store.clone()));
        manager.start();
        manager.login(DEMO_EMAIL).unwrap();

        // another sign-in lands while the demo profile is being read
        let switcher = manager.clone();
        *store.on_read.lock().unwrap() = Some(Box::new(move || {
            switcher.login("other@example.com").unwrap();
        }));

        assert!(manager.refresh_profile().is_none());
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.user.unwrap().email, "other@example.com");
        assert_eq!(snapshot.profile.unwrap().email, "other@example.com");
    }
}
