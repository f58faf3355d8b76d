//! Dietrack Tools module
//!
//! MCP tool implementations for onboarding, targets, daily tracking and community.

pub mod catalog;
pub mod community;
pub mod profile;
pub mod status;
pub mod tracking;
