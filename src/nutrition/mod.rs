//! Nutrition calculation module
//!
//! Daily target derivation (water, calories, macros) and progress views.

pub mod calculator;
pub mod targets;

pub use calculator::{
    activity_multiplier, basal_metabolic_rate, calorie_target, daily_calorie_target, macro_split,
    total_daily_energy_expenditure, water_target, DietType, MacroRatios, MacroSplit,
};
pub use targets::{DailyStats, DailyTargets, Progress, DEFAULT_STEP_TARGET};
