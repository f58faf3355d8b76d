//! Nutrition target calculator
//!
//! Pure, total functions deriving daily targets from a profile: hydration,
//! calories (Mifflin-St Jeor BMR scaled by activity and adjusted for the
//! weight goal) and the macro split for a diet type. Missing inputs fall
//! back to fixed defaults instead of failing.

use serde::{Deserialize, Serialize};

use crate::models::{ActivityLevel, CompleteProfile, Gender, UserProfile, WeightGoal};

// ============================================================================
// Constants
// ============================================================================

/// Water target when no usable weight is known
pub const DEFAULT_WATER_TARGET_LITERS: f64 = 2.5;
/// Recommended intake per kilogram of body weight
pub const WATER_ML_PER_KG: f64 = 35.0;

/// Calorie target when any body metric is missing
pub const DEFAULT_CALORIE_TARGET: i64 = 2000;
/// Daily deficit or surplus applied for lose/gain goals
pub const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;
/// Multiplier used when no activity level is set
pub const DEFAULT_ACTIVITY_MULTIPLIER: f64 = 1.55;

pub const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
pub const KCAL_PER_GRAM_CARBS: f64 = 4.0;
pub const KCAL_PER_GRAM_FAT: f64 = 9.0;

/// Round to the nearest integer, halves toward positive infinity
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

// ============================================================================
// Water
// ============================================================================

/// Daily water target in liters, rounded to one decimal.
///
/// Absent, zero or negative weights yield `DEFAULT_WATER_TARGET_LITERS`.
pub fn water_target(weight_kg: Option<f64>) -> f64 {
    match weight_kg {
        Some(weight) if weight.is_finite() && weight > 0.0 => {
            let ml = weight * WATER_ML_PER_KG;
            // tenths of a liter = ml / 100
            round_half_up(ml / 100.0) as f64 / 10.0
        }
        _ => DEFAULT_WATER_TARGET_LITERS,
    }
}

// ============================================================================
// Calories
// ============================================================================

/// Activity multiplier applied to BMR
pub fn activity_multiplier(level: Option<ActivityLevel>) -> f64 {
    match level {
        Some(ActivityLevel::Sedentary) => 1.2,
        Some(ActivityLevel::Light) => 1.375,
        Some(ActivityLevel::Moderate) => 1.55,
        Some(ActivityLevel::Active) => 1.725,
        Some(ActivityLevel::VeryActive) => 1.9,
        None => DEFAULT_ACTIVITY_MULTIPLIER,
    }
}

/// Basal metabolic rate (Mifflin-St Jeor), kcal/day.
///
/// Anything other than male uses the female constant.
pub fn basal_metabolic_rate(profile: &CompleteProfile) -> f64 {
    let base = 10.0 * profile.weight + 6.25 * profile.height - 5.0 * f64::from(profile.age);
    match profile.gender {
        Gender::Male => base + 5.0,
        Gender::Female | Gender::Other => base - 161.0,
    }
}

/// Total daily energy expenditure, kcal/day
pub fn total_daily_energy_expenditure(profile: &CompleteProfile) -> f64 {
    basal_metabolic_rate(profile) * activity_multiplier(profile.activity_level)
}

/// Daily calorie target for a validated profile.
///
/// Not floored at any minimum: small bodies with a lose goal can go very low.
pub fn calorie_target(profile: &CompleteProfile) -> i64 {
    let tdee = total_daily_energy_expenditure(profile);
    let adjusted = match profile.target {
        Some(WeightGoal::Lose) => tdee - GOAL_ADJUSTMENT_KCAL,
        Some(WeightGoal::Gain) => tdee + GOAL_ADJUSTMENT_KCAL,
        Some(WeightGoal::Maintain) | None => tdee,
    };
    round_half_up(adjusted)
}

/// Daily calorie target, `DEFAULT_CALORIE_TARGET` unless weight, height,
/// age and gender are all present
pub fn daily_calorie_target(profile: Option<&UserProfile>) -> i64 {
    profile
        .and_then(UserProfile::complete)
        .map(|complete| calorie_target(&complete))
        .unwrap_or(DEFAULT_CALORIE_TARGET)
}

// ============================================================================
// Macros
// ============================================================================

/// Diet types with their own macro ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    Balanced,
    Keto,
    Vegan,
    Paleo,
}

/// Share of calories from each macronutrient
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroRatios {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl DietType {
    /// Resolve a diet key; keys match exactly and anything else is `Balanced`
    pub fn from_key(key: Option<&str>) -> Self {
        match key {
            Some("keto") => DietType::Keto,
            Some("vegan") => DietType::Vegan,
            Some("paleo") => DietType::Paleo,
            _ => DietType::Balanced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DietType::Balanced => "balanced",
            DietType::Keto => "keto",
            DietType::Vegan => "vegan",
            DietType::Paleo => "paleo",
        }
    }

    pub fn ratios(&self) -> MacroRatios {
        let (protein, carbs, fat) = match self {
            DietType::Balanced => (0.30, 0.40, 0.30),
            DietType::Keto => (0.25, 0.05, 0.70),
            DietType::Vegan => (0.20, 0.50, 0.30),
            DietType::Paleo => (0.40, 0.20, 0.40),
        };
        MacroRatios { protein, carbs, fat }
    }
}

/// Daily macronutrient targets in grams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

/// Split a calorie target into macro grams for a diet type
pub fn macro_split(calories: i64, diet_type: Option<&str>) -> MacroSplit {
    let ratios = DietType::from_key(diet_type).ratios();
    let calories = calories as f64;

    MacroSplit {
        protein: round_half_up(calories * ratios.protein / KCAL_PER_GRAM_PROTEIN),
        carbs: round_half_up(calories * ratios.carbs / KCAL_PER_GRAM_CARBS),
        fat: round_half_up(calories * ratios.fat / KCAL_PER_GRAM_FAT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileUpdate;

    fn reference_profile(target: Option<WeightGoal>) -> UserProfile {
        let mut profile = UserProfile::new("u1", "ref@example.com", None);
        profile.apply(&ProfileUpdate {
            age: Some(25),
            gender: Some(Gender::Male),
            height: Some(175.0),
            weight: Some(70.0),
            activity_level: Some(ActivityLevel::Moderate),
            target,
            ..Default::default()
        });
        profile
    }

    #[test]
    fn test_water_target_defaults() {
        assert_eq!(water_target(None), 2.5);
        assert_eq!(water_target(Some(0.0)), 2.5);
        assert_eq!(water_target(Some(-12.0)), 2.5);
        assert_eq!(water_target(Some(f64::NAN)), 2.5);
    }

    #[test]
    fn test_water_target_rounding() {
        assert_eq!(water_target(Some(70.0)), 2.5); // 2.45 rounds up
        assert_eq!(water_target(Some(57.0)), 2.0); // 1.995
        assert_eq!(water_target(Some(60.0)), 2.1);
        assert_eq!(water_target(Some(100.0)), 3.5);
        // exact halves round up, with no binary drift
        assert_eq!(water_target(Some(10.0)), 0.4); // 0.35
        assert_eq!(water_target(Some(90.0)), 3.2); // 3.15
    }

    #[test]
    fn test_calories_default_on_missing_inputs() {
        assert_eq!(daily_calorie_target(None), DEFAULT_CALORIE_TARGET);

        let mut profile = reference_profile(None);
        profile.gender = None;
        assert_eq!(daily_calorie_target(Some(&profile)), 2000);

        let mut profile = reference_profile(None);
        profile.height = None;
        assert_eq!(daily_calorie_target(Some(&profile)), 2000);

        let mut profile = reference_profile(None);
        profile.age = Some(0);
        assert_eq!(daily_calorie_target(Some(&profile)), 2000);
    }

    #[test]
    fn test_reference_profile_calories() {
        let complete = reference_profile(None).complete().unwrap();
        assert_eq!(basal_metabolic_rate(&complete), 1673.75);
        assert_eq!(total_daily_energy_expenditure(&complete), 2594.3125);

        assert_eq!(daily_calorie_target(Some(&reference_profile(Some(WeightGoal::Maintain)))), 2594);
        assert_eq!(daily_calorie_target(Some(&reference_profile(None))), 2594);
        assert_eq!(daily_calorie_target(Some(&reference_profile(Some(WeightGoal::Lose)))), 2094);
        assert_eq!(daily_calorie_target(Some(&reference_profile(Some(WeightGoal::Gain)))), 3094);
    }

    #[test]
    fn test_female_and_other_use_female_constant() {
        let mut profile = reference_profile(None);
        profile.gender = Some(Gender::Female);
        let female = basal_metabolic_rate(&profile.complete().unwrap());
        profile.gender = Some(Gender::Other);
        let other = basal_metabolic_rate(&profile.complete().unwrap());
        assert_eq!(female, 1673.75 - 5.0 - 161.0);
        assert_eq!(female, other);
    }

    #[test]
    fn test_activity_multipliers() {
        assert_eq!(activity_multiplier(Some(ActivityLevel::Sedentary)), 1.2);
        assert_eq!(activity_multiplier(Some(ActivityLevel::VeryActive)), 1.9);
        assert_eq!(activity_multiplier(None), 1.55);

        let mut profile = reference_profile(None);
        profile.activity_level = None;
        assert_eq!(daily_calorie_target(Some(&profile)), 2594);
    }

    #[test]
    fn test_no_calorie_floor() {
        let mut profile = reference_profile(Some(WeightGoal::Lose));
        profile.apply(&ProfileUpdate {
            gender: Some(Gender::Female),
            weight: Some(35.0),
            height: Some(120.0),
            age: Some(80),
            activity_level: Some(ActivityLevel::Sedentary),
            ..Default::default()
        });
        // bmr = 350 + 750 - 400 - 161 = 539; 539 * 1.2 - 500 = 146.8
        assert_eq!(daily_calorie_target(Some(&profile)), 147);
    }

    #[test]
    fn test_keto_split() {
        let split = macro_split(2000, Some("keto"));
        assert_eq!(split, MacroSplit { protein: 125, carbs: 25, fat: 156 });
    }

    #[test]
    fn test_balanced_is_default() {
        let balanced = macro_split(2000, Some("balanced"));
        assert_eq!(balanced, MacroSplit { protein: 150, carbs: 200, fat: 67 });
        assert_eq!(macro_split(2000, Some("unknown_type")), balanced);
        assert_eq!(macro_split(2000, None), balanced);
    }

    #[test]
    fn test_vegan_and_paleo_splits() {
        assert_eq!(macro_split(1800, Some("vegan")), MacroSplit { protein: 90, carbs: 225, fat: 60 });
        assert_eq!(macro_split(2594, Some("paleo")), MacroSplit { protein: 259, carbs: 130, fat: 115 });
    }

    #[test]
    fn test_diet_type_keys() {
        assert_eq!(DietType::from_key(Some("keto")), DietType::Keto);
        assert_eq!(DietType::from_key(Some(" KETO ")), DietType::Balanced);
        assert_eq!(DietType::from_key(Some("Paleo")), DietType::Balanced);
        assert_eq!(
            macro_split(2000, Some("Paleo")),
            MacroSplit { protein: 150, carbs: 200, fat: 67 }
        );
        assert_eq!(DietType::from_key(Some("mediterranean")), DietType::Balanced);
        let r = DietType::Vegan.ratios();
        assert!((r.protein + r.carbs + r.fat - 1.0).abs() < 1e-9);
    }
}
