//! Dietrack Library
//!
//! Diet onboarding, daily nutrition targets and tracking.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod onboarding;
pub mod session;
pub mod tools;
