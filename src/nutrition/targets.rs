//! Daily targets and progress
//!
//! Combines calculator output with a day's tracked values into the
//! current/target pairs shown on the dashboard.

use serde::Serialize;

use super::calculator::{daily_calorie_target, macro_split, water_target, DietType, MacroSplit};
use crate::models::{DailyTracking, UserProfile};

/// Fixed daily step goal
pub const DEFAULT_STEP_TARGET: u32 = 10_000;

/// All targets derived from a profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTargets {
    pub calories: i64,
    pub macros: MacroSplit,
    pub diet_type: DietType,
    pub water_liters: f64,
    pub steps: u32,
}

impl DailyTargets {
    /// Targets for a profile; a missing profile gets every default
    pub fn for_profile(profile: Option<&UserProfile>) -> Self {
        let diet_key = profile.and_then(|p| p.current_diet_id.as_deref());
        let calories = daily_calorie_target(profile);

        Self {
            calories,
            macros: macro_split(calories, diet_key),
            diet_type: DietType::from_key(diet_key),
            water_liters: water_target(profile.and_then(|p| p.weight)),
            steps: DEFAULT_STEP_TARGET,
        }
    }
}

/// A current value measured against its target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub current: f64,
    pub target: f64,
}

impl Progress {
    pub fn new(current: f64, target: f64) -> Self {
        Self { current, target }
    }

    /// Whole percent of target reached, capped at 100
    pub fn percent(&self) -> u32 {
        if self.target <= 0.0 {
            return 0;
        }
        let percent = (self.current / self.target * 100.0).round();
        percent.clamp(0.0, 100.0) as u32
    }
}

/// Dashboard view of one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: String,
    pub calories: Progress,
    pub protein: Progress,
    pub carbs: Progress,
    pub fat: Progress,
    pub water: Progress, // liters
    pub steps: Progress,
}

impl DailyStats {
    pub fn new(targets: &DailyTargets, tracked: &DailyTracking) -> Self {
        Self {
            date: tracked.date.clone(),
            calories: Progress::new(tracked.calories, targets.calories as f64),
            protein: Progress::new(tracked.protein, targets.macros.protein as f64),
            carbs: Progress::new(tracked.carbs, targets.macros.carbs as f64),
            fat: Progress::new(tracked.fat, targets.macros.fat as f64),
            water: Progress::new(tracked.water_liters, targets.water_liters),
            steps: Progress::new(f64::from(tracked.steps), f64::from(targets.steps)),
        }
    }
}
