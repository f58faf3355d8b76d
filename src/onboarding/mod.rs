//! Onboarding flow
//!
//! Routing gates between sign-in, profile setup, package selection and the app.

pub mod router;

pub use router::{
    decide, parse_path, sync, Navigator, OnboardingState, Route, RouterInput, ScreenGroup,
};
