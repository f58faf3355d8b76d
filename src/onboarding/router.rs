//! Onboarding router
//!
//! Decides which screen a user must be on given auth presence, profile
//! completeness and the current screen path. Gates are checked in order:
//! signed in, body metrics filled, package chosen. Nothing redirects while
//! auth or the profile fetch is still loading, and a redirect to the screen
//! the user is already on is suppressed.

use serde::Serialize;

use crate::models::UserProfile;

/// Where a user stands in onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    Unauthenticated,
    ProfileIncomplete,
    PackageUnselected,
    Ready,
}

impl OnboardingState {
    /// Classify a session. A missing profile counts as incomplete.
    pub fn evaluate(user_present: bool, profile: Option<&UserProfile>) -> Self {
        if !user_present {
            return OnboardingState::Unauthenticated;
        }
        match profile {
            Some(p) if !p.has_body_metrics() => OnboardingState::ProfileIncomplete,
            None => OnboardingState::ProfileIncomplete,
            Some(p) if !p.has_package() => OnboardingState::PackageUnselected,
            Some(_) => OnboardingState::Ready,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingState::Unauthenticated => "unauthenticated",
            OnboardingState::ProfileIncomplete => "profile_incomplete",
            OnboardingState::PackageUnselected => "package_unselected",
            OnboardingState::Ready => "ready",
        }
    }

    /// The gate screen for transient states; `Ready` has none
    pub fn gate(&self) -> Option<Route> {
        match self {
            OnboardingState::Unauthenticated => Some(Route::Login),
            OnboardingState::ProfileIncomplete => Some(Route::ProfileSetup),
            OnboardingState::PackageUnselected => Some(Route::PackageSelection),
            OnboardingState::Ready => None,
        }
    }
}

/// Top-level screen groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenGroup {
    Auth,
    Onboarding,
    Tabs,
    Other,
}

impl ScreenGroup {
    /// Group of a path, from its first segment
    pub fn of(segments: &[String]) -> Self {
        match segments.first().map(String::as_str) {
            Some("(auth)") | Some("auth") => ScreenGroup::Auth,
            Some("(onboarding)") => ScreenGroup::Onboarding,
            Some("(tabs)") => ScreenGroup::Tabs,
            _ => ScreenGroup::Other,
        }
    }
}

/// Redirect targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    ProfileSetup,
    PackageSelection,
    AppRoot,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/(auth)/login",
            Route::ProfileSetup => "/(onboarding)/profile-setup",
            Route::PackageSelection => "/(onboarding)/package-selection",
            Route::AppRoot => "/(tabs)",
        }
    }

    /// Whether the user is already on this route
    pub fn is_current(&self, segments: &[String]) -> bool {
        let group = ScreenGroup::of(segments);
        let screen = segments.get(1).map(String::as_str);
        match self {
            Route::Login => group == ScreenGroup::Auth,
            Route::ProfileSetup => group == ScreenGroup::Onboarding && screen == Some("profile-setup"),
            Route::PackageSelection => {
                group == ScreenGroup::Onboarding && screen == Some("package-selection")
            }
            Route::AppRoot => group == ScreenGroup::Tabs,
        }
    }
}

/// Split a screen path into segments: `/(onboarding)/profile-setup` ->
/// `["(onboarding)", "profile-setup"]`
pub fn parse_path(path: &str) -> Vec<String> {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Everything the routing decision depends on
#[derive(Debug, Clone, Copy)]
pub struct RouterInput<'a> {
    pub user_present: bool,
    pub profile: Option<&'a UserProfile>,
    pub loading: bool,
    pub current_path: &'a [String],
}

/// Compute the redirect, if any, for the given input
pub fn decide(input: &RouterInput<'_>) -> Option<Route> {
    if input.loading {
        return None;
    }

    let state = OnboardingState::evaluate(input.user_present, input.profile);
    let group = ScreenGroup::of(input.current_path);

    let redirect = match state.gate() {
        Some(gate) if gate.is_current(input.current_path) => None,
        Some(gate) => Some(gate),
        None if matches!(group, ScreenGroup::Auth | ScreenGroup::Onboarding) => Some(Route::AppRoot),
        None => None,
    };

    if let Some(route) = redirect {
        tracing::debug!(
            state = state.as_str(),
            from = %input.current_path.join("/"),
            to = route.path(),
            "Onboarding redirect"
        );
    }
    redirect
}

/// Navigation primitive the router drives
pub trait Navigator {
    fn current_segments(&self) -> Vec<String>;
    fn replace(&mut self, route: Route);
}

/// Re-evaluate routing against a navigator, replacing the screen if needed
pub fn sync<N: Navigator>(
    navigator: &mut N,
    user_present: bool,
    profile: Option<&UserProfile>,
    loading: bool,
) -> Option<Route> {
    let segments = navigator.current_segments();
    let redirect = decide(&RouterInput {
        user_present,
        profile,
        loading,
        current_path: &segments,
    });
    if let Some(route) = redirect {
        navigator.replace(route);
    }
    redirect
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, ProfileUpdate};

    fn path(p: &str) -> Vec<String> {
        parse_path(p)
    }

    fn profile(complete: bool, package: bool) -> UserProfile {
        let mut profile = UserProfile::new("u1", "a@example.com", None);
        if complete {
            profile.apply(&ProfileUpdate {
                age: Some(30),
                height: Some(180.0),
                weight: Some(80.0),
                gender: Some(Gender::Male),
                ..Default::default()
            });
        }
        if package {
            profile.apply(&ProfileUpdate { package_id: Some("pkg_basic".into()), ..Default::default() });
        }
        profile
    }

    fn run(user: bool, profile: Option<&UserProfile>, current: &str) -> Option<Route> {
        let segments = path(current);
        decide(&RouterInput {
            user_present: user,
            profile,
            loading: false,
            current_path: &segments,
        })
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(path("/(onboarding)/profile-setup"), vec!["(onboarding)", "profile-setup"]);
        assert!(path("/").is_empty());
    }

    #[test]
    fn test_loading_suppresses_redirects() {
        let segments = path("/(tabs)");
        let input = RouterInput { user_present: false, profile: None, loading: true, current_path: &segments };
        assert_eq!(decide(&input), None);
    }

    #[test]
    fn test_signed_out_goes_to_login() {
        assert_eq!(run(false, None, "/(tabs)"), Some(Route::Login));
        assert_eq!(run(false, None, "/"), Some(Route::Login));
        assert_eq!(run(false, None, "/(onboarding)/profile-setup"), Some(Route::Login));
        assert_eq!(run(false, None, "/(auth)/register"), None);
        assert_eq!(run(false, None, "/auth/login"), None);
    }

    #[test]
    fn test_incomplete_profile_goes_to_setup() {
        let p = profile(false, true);
        assert_eq!(run(true, Some(&p), "/(tabs)"), Some(Route::ProfileSetup));
        assert_eq!(run(true, Some(&p), "/(onboarding)/package-selection"), Some(Route::ProfileSetup));
        // missing profile fails closed
        assert_eq!(run(true, None, "/(auth)/login"), Some(Route::ProfileSetup));
    }

    #[test]
    fn test_no_redirect_loop_on_setup_screen() {
        let p = profile(false, false);
        assert_eq!(run(true, Some(&p), "/(onboarding)/profile-setup"), None);
    }

    #[test]
    fn test_package_gate_after_profile_gate() {
        let p = profile(true, false);
        assert_eq!(run(true, Some(&p), "/(tabs)"), Some(Route::PackageSelection));
        assert_eq!(run(true, Some(&p), "/(onboarding)/profile-setup"), Some(Route::PackageSelection));
        assert_eq!(run(true, Some(&p), "/(onboarding)/package-selection"), None);
    }

    #[test]
    fn test_ready_user_leaves_auth_and_onboarding() {
        let p = profile(true, true);
        assert_eq!(run(true, Some(&p), "/(auth)"), Some(Route::AppRoot));
        assert_eq!(run(true, Some(&p), "/(onboarding)/package-selection"), Some(Route::AppRoot));
        assert_eq!(run(true, Some(&p), "/(tabs)/history"), None);
        assert_eq!(run(true, Some(&p), "/water"), None);
    }

    #[test]
    fn test_states() {
        assert_eq!(OnboardingState::evaluate(false, None), OnboardingState::Unauthenticated);
        assert_eq!(OnboardingState::evaluate(true, None), OnboardingState::ProfileIncomplete);
        assert_eq!(
            OnboardingState::evaluate(true, Some(&profile(true, false))),
            OnboardingState::PackageUnselected
        );
        assert_eq!(OnboardingState::evaluate(true, Some(&profile(true, true))), OnboardingState::Ready);
        assert_eq!(OnboardingState::Ready.gate(), None);
    }

    struct FakeNavigator {
        segments: Vec<String>,
        replacements: usize,
    }

    impl Navigator for FakeNavigator {
        fn current_segments(&self) -> Vec<String> {
            self.segments.clone()
        }

        fn replace(&mut self, route: Route) {
            self.segments = parse_path(route.path());
            self.replacements += 1;
        }
    }

    #[test]
    fn test_sync_settles_after_one_redirect() {
        let mut nav = FakeNavigator { segments: path("/(tabs)"), replacements: 0 };
        let p = profile(false, false);

        assert_eq!(sync(&mut nav, true, Some(&p), false), Some(Route::ProfileSetup));
        assert_eq!(sync(&mut nav, true, Some(&p), false), None);
        assert_eq!(sync(&mut nav, true, Some(&p), false), None);
        assert_eq!(nav.replacements, 1);
        assert_eq!(nav.segments, path("/(onboarding)/profile-setup"));
    }

    #[test]
    fn test_sync_walks_the_whole_flow() {
        let mut nav = FakeNavigator { segments: path("/"), replacements: 0 };

        sync(&mut nav, false, None, false);
        assert_eq!(nav.segments, path("/(auth)/login"));

        sync(&mut nav, true, Some(&profile(false, false)), false);
        assert_eq!(nav.segments, path("/(onboarding)/profile-setup"));

        sync(&mut nav, true, Some(&profile(true, false)), false);
        assert_eq!(nav.segments, path("/(onboarding)/package-selection"));

        sync(&mut nav, true, Some(&profile(true, true)), false);
        assert_eq!(nav.segments, path("/(tabs)"));
        assert_eq!(nav.replacements, 4);
    }
}
