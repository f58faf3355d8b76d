//! Session and Profile MCP Tools
//!
//! Registration, sign-in, profile edits, onboarding routing and target
//! calculation.

use serde::Serialize;

use crate::db::Database;
use crate::models::{
    ActivityLevel, DailyTracking, Gender, HistoryEntry, ProfileUpdate, UserProfile, WeightGoal,
};
use crate::nutrition::{basal_metabolic_rate, total_daily_energy_expenditure, DailyTargets};
use crate::onboarding::OnboardingState;
use crate::session::{AuthUser, SessionManager, SessionSnapshot};

/// Profile fields as received from a tool call; enums still as strings
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub display_name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub target: Option<String>,
    pub activity_level: Option<String>,
    pub current_diet_id: Option<String>,
    pub package_id: Option<String>,
    pub team_id: Option<String>,
}

/// Response for register/login
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub user: AuthUser,
    pub onboarding_state: OnboardingState,
    pub next_route: Option<&'static str>,
}

/// Response for logout/delete_account
#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub success: bool,
    pub message: String,
}

/// Response for resolve_route
#[derive(Debug, Serialize)]
pub struct ResolveRouteResponse {
    pub current_path: String,
    pub onboarding_state: OnboardingState,
    pub redirect: Option<&'static str>,
}

/// Response for calculate_targets
#[derive(Debug, Serialize)]
pub struct CalculateTargetsResponse {
    /// "session", "adhoc" or "defaults"
    pub source: &'static str,
    pub complete: bool,
    pub bmr: Option<f64>,
    pub tdee: Option<f64>,
    pub targets: DailyTargets,
}

fn positive_f64(name: &str, value: Option<f64>) -> Result<Option<f64>, String> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(format!("{} must be a positive number", name)),
        other => Ok(other),
    }
}

/// Validate tool input into a `ProfileUpdate`
pub fn build_profile_update(fields: ProfileFields) -> Result<ProfileUpdate, String> {
    let gender = match fields.gender.as_deref() {
        Some(s) => Some(Gender::from_str(s).ok_or_else(|| format!("Unknown gender '{}'", s))?),
        None => None,
    };
    let target = match fields.target.as_deref() {
        Some(s) => Some(WeightGoal::from_str(s).ok_or_else(|| format!("Unknown target '{}'", s))?),
        None => None,
    };
    let activity_level = match fields.activity_level.as_deref() {
        Some(s) => Some(
            ActivityLevel::from_str(s).ok_or_else(|| format!("Unknown activity level '{}'", s))?,
        ),
        None => None,
    };
    if fields.age == Some(0) {
        return Err("age must be a positive number".to_string());
    }

    Ok(ProfileUpdate {
        display_name: fields.display_name,
        age: fields.age,
        gender,
        height: positive_f64("height", fields.height)?,
        weight: positive_f64("weight", fields.weight)?,
        target,
        activity_level,
        current_diet_id: fields.current_diet_id,
        package_id: fields.package_id,
        team_id: fields.team_id,
    })
}

fn sign_in_response(session: &SessionManager, user: AuthUser) -> SignInResponse {
    let snapshot = session.snapshot();
    SignInResponse {
        user,
        onboarding_state: snapshot.onboarding_state,
        next_route: snapshot.onboarding_state.gate().map(|r| r.path()),
    }
}

// ============================================================================
// Session Tools
// ============================================================================

pub fn register(session: &SessionManager, email: &str, display_name: Option<&str>) -> Result<SignInResponse, String> {
    let profile = session
        .register(email, display_name)
        .map_err(|e| format!("Failed to register: {}", e))?;
    Ok(sign_in_response(session, AuthUser::from(&profile)))
}

pub fn login(session: &SessionManager, email: &str) -> Result<SignInResponse, String> {
    let user = session.login(email).map_err(|e| format!("Failed to sign in: {}", e))?;
    Ok(sign_in_response(session, user))
}

pub fn logout(session: &SessionManager) -> Result<SignOutResponse, String> {
    let was_signed_in = session.current_user().is_some();
    session.logout().map_err(|e| format!("Failed to sign out: {}", e))?;
    Ok(SignOutResponse {
        success: true,
        message: if was_signed_in {
            "Signed out".to_string()
        } else {
            "No user was signed in".to_string()
        },
    })
}

pub fn current_session(session: &SessionManager) -> SessionSnapshot {
    session.snapshot()
}

// ============================================================================
// Profile Tools
// ============================================================================

pub fn get_profile(session: &SessionManager) -> Result<UserProfile, String> {
    session.require_user().map_err(|e| e.to_string())?;
    session
        .refresh_profile()
        .ok_or_else(|| "Profile could not be loaded".to_string())
}

pub fn update_profile(session: &SessionManager, fields: ProfileFields) -> Result<UserProfile, String> {
    let update = build_profile_update(fields)?;
    if update.is_empty() {
        return Err("No profile fields provided".to_string());
    }
    session
        .update_profile(&update)
        .map_err(|e| format!("Failed to update profile: {}", e))
}

/// Delete the signed-in account and every tracking and history row it owns
pub fn delete_account(session: &SessionManager, db: &Database) -> Result<SignOutResponse, String> {
    let uid = session.require_user().map(|u| u.uid).map_err(|e| e.to_string())?;
    let deleted = session
        .delete_account()
        .map_err(|e| format!("Failed to delete account: {}", e))?;

    // Memory-mode profiles still track into this database
    let (days, entries) = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let days = DailyTracking::delete_for_user(&tx, &uid)?;
            let entries = HistoryEntry::delete_for_user(&tx, &uid)?;
            tx.commit()?;
            Ok((days, entries))
        })
        .map_err(|e| format!("Account deleted but its data could not be removed: {}", e))?;
    tracing::debug!("Removed {} tracked days and {} history entries for {}", days, entries, uid);
    Ok(SignOutResponse {
        success: deleted,
        message: if deleted {
            "Account deleted".to_string()
        } else {
            "Account was already gone".to_string()
        },
    })
}

// ============================================================================
// Onboarding & Targets
// ============================================================================

pub fn resolve_route(session: &SessionManager, current_path: &str) -> ResolveRouteResponse {
    ResolveRouteResponse {
        current_path: current_path.to_string(),
        onboarding_state: session.snapshot().onboarding_state,
        redirect: session.route_for(current_path).map(|r| r.path()),
    }
}

/// Targets for the session profile, with any ad-hoc fields laid over it
pub fn calculate_targets(session: &SessionManager, overrides: ProfileFields) -> Result<CalculateTargetsResponse, String> {
    let update = build_profile_update(overrides)?;
    let base = session.profile();

    let (source, profile) = match (base, update.is_empty()) {
        (base, false) => {
            let mut profile = base.unwrap_or_else(|| UserProfile::new("adhoc", "", None));
            profile.apply(&update);
            ("adhoc", Some(profile))
        }
        (Some(profile), true) => ("session", Some(profile)),
        (None, true) => ("defaults", None),
    };

    let complete = profile.as_ref().and_then(UserProfile::complete);
    Ok(CalculateTargetsResponse {
        source,
        complete: complete.is_some(),
        bmr: complete.as_ref().map(basal_metabolic_rate),
        tdee: complete.as_ref().map(total_daily_energy_expenditure),
        targets: DailyTargets::for_profile(profile.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::db::migrations::run_migrations;
    use crate::models::HistoryEntryCreate;
    use crate::session::{MemoryProfileStore, DEMO_EMAIL};

    fn session() -> SessionManager {
        let session = SessionManager::new(Arc::new(MemoryProfileStore::with_demo_account()));
        session.start();
        session
    }

    #[test]
    fn test_build_profile_update_validates() {
        let update = build_profile_update(ProfileFields {
            gender: Some("female".into()),
            activity_level: Some("very_active".into()),
            weight: Some(61.5),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(update.gender, Some(Gender::Female));
        assert_eq!(update.activity_level, Some(ActivityLevel::VeryActive));

        assert!(build_profile_update(ProfileFields { gender: Some("x".into()), ..Default::default() }).is_err());
        assert!(build_profile_update(ProfileFields { height: Some(-1.0), ..Default::default() }).is_err());
        assert!(build_profile_update(ProfileFields { age: Some(0), ..Default::default() }).is_err());
    }

    #[test]
    fn test_login_reports_next_gate() {
        let session = session();
        let response = login(&session, DEMO_EMAIL).unwrap();
        assert_eq!(response.onboarding_state, OnboardingState::PackageUnselected);
        assert_eq!(response.next_route, Some("/(onboarding)/package-selection"));
    }

    #[test]
    fn test_register_then_update() {
        let session = session();
        let response = register(&session, "kim@example.com", Some("Kim")).unwrap();
        assert_eq!(response.next_route, Some("/(onboarding)/profile-setup"));

        let profile = update_profile(
            &session,
            ProfileFields { age: Some(40), height: Some(170.0), weight: Some(72.0), ..Default::default() },
        )
        .unwrap();
        assert!(profile.has_body_metrics());
        assert!(update_profile(&session, ProfileFields::default()).is_err());
    }

    #[test]
    fn test_calculate_targets_sources() {
        let session = session();
        let defaults = calculate_targets(&session, ProfileFields::default()).unwrap();
        assert_eq!(defaults.source, "defaults");
        assert_eq!(defaults.targets.calories, 2000);

        login(&session, DEMO_EMAIL).unwrap();
        let own = calculate_targets(&session, ProfileFields::default()).unwrap();
        assert_eq!(own.source, "session");
        assert_eq!(own.targets.calories, 2594);
        assert_eq!(own.bmr, Some(1673.75));

        let lose = calculate_targets(
            &session,
            ProfileFields { target: Some("lose".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(lose.source, "adhoc");
        assert_eq!(lose.targets.calories, 2094);
        // overrides are not persisted
        assert_eq!(session.profile().unwrap().target, Some(WeightGoal::Maintain));
    }

    #[test]
    fn test_resolve_route_signed_out() {
        let session = session();
        let response = resolve_route(&session, "/(tabs)");
        assert_eq!(response.redirect, Some("/(auth)/login"));
        assert_eq!(response.onboarding_state, OnboardingState::Unauthenticated);
    }

    #[test]
    fn test_delete_account_removes_tracking_in_memory_mode() {
        let session = session();
        let db = Database::in_memory().unwrap();
        db.with_conn(run_migrations).unwrap();

        let user = register(&session, "gone@example.com", None).unwrap().user;
        let entry = HistoryEntryCreate {
            date: "2025-01-09".into(),
            weight: 70.0,
            notes: None,
            calories: None,
        };
        db.with_conn(|conn| {
            DailyTracking::add_water(conn, &user.uid, "2025-01-09", 1.0)?;
            HistoryEntry::create(conn, &user.uid, &entry)?;
            Ok(())
        })
        .unwrap();

        let response = delete_account(&session, &db).unwrap();
        assert!(response.success);
        assert!(session.current_user().is_none());

        let remaining: (i64, i64) = db
            .with_conn(|conn| {
                let days = conn.query_row(
                    "SELECT COUNT(*) FROM daily_tracking WHERE user_uid = ?1",
                    [&user.uid],
                    |row| row.get(0),
                )?;
                let entries = conn.query_row(
                    "SELECT COUNT(*) FROM history_entries WHERE user_uid = ?1",
                    [&user.uid],
                    |row| row.get(0),
                )?;
                Ok((days, entries))
            })
            .unwrap();
        assert_eq!(remaining, (0, 0));

        assert!(delete_account(&session, &db).is_err());
    }
}
