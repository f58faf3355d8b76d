//! Data models
//!
//! Rust structs representing database entities.

pub mod catalog;
pub mod group;
mod history;
pub mod message;
mod profile;
mod tracking;

pub use catalog::{
    DailyPlan, DietPackage, DietProgram, Difficulty, MealType, PackageGoal, PlanMeal, SampleDay,
};
pub use group::Group;
pub use history::{HistoryEntry, HistoryEntryCreate};
pub use message::{Conversation, Message};
pub use profile::{
    ActiveSession, ActivityLevel, CompleteProfile, Gender, ProfileUpdate, UserProfile, WeightGoal,
};
pub use tracking::{DailyTracking, IntakeLog};
