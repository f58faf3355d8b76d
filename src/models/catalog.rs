//! Diet catalog models
//!
//! Diet packages (the plan a user commits to during onboarding) and diet
//! programs (meal plans whose id selects the macro split).

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Goal a package is designed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageGoal {
    LoseWeight,
    Maintain,
    GainMuscle,
}

impl PackageGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageGoal::LoseWeight => "lose_weight",
            PackageGoal::Maintain => "maintain",
            PackageGoal::GainMuscle => "gain_muscle",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lose_weight" | "lose" => Some(PackageGoal::LoseWeight),
            "maintain" => Some(PackageGoal::Maintain),
            "gain_muscle" | "gain" => Some(PackageGoal::GainMuscle),
            _ => None,
        }
    }
}

/// Example meals for one day of a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDay {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub snacks: Vec<String>,
}

/// A diet package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietPackage {
    pub id: String,
    pub name: String,
    pub goal: PackageGoal,
    pub description: String,
    pub rules: Vec<String>,
    pub allowed_foods: Vec<String>,
    pub forbidden_foods: Vec<String>,
    pub sample_day: SampleDay,
}

/// How hard a program is to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Meal slot within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "snack" | "snacks" => Some(MealType::Snack),
            _ => None,
        }
    }
}

/// A meal inside a program's daily plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMeal {
    pub id: String,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub image: Option<String>,
    pub meal_type: MealType,
}

/// One day (1..=7) of a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub day: u32,
    pub total_calories: f64,
    pub meals: Vec<PlanMeal>,
}

/// A diet program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietProgram {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub difficulty: Difficulty,
    pub duration_weeks: u32,
    pub daily_plans: Vec<DailyPlan>,
}

// ============================================================================
// Packages
// ============================================================================

impl DietPackage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let goal: String = row.get("goal")?;
        let rules: String = row.get("rules_json")?;
        let allowed: String = row.get("allowed_foods_json")?;
        let forbidden: String = row.get("forbidden_foods_json")?;
        let sample_day: String = row.get("sample_day_json")?;

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            goal: PackageGoal::from_str(&goal).unwrap_or(PackageGoal::Maintain),
            description: row.get("description")?,
            rules: json_column(&rules)?,
            allowed_foods: json_column(&allowed)?,
            forbidden_foods: json_column(&forbidden)?,
            sample_day: json_column(&sample_day)?,
        })
    }

    /// Insert a package unless one with the same id already exists
    pub fn insert(conn: &Connection, package: &DietPackage) -> DbResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO packages
                (id, name, goal, description, rules_json, allowed_foods_json,
                 forbidden_foods_json, sample_day_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                package.id,
                package.name,
                package.goal.as_str(),
                package.description,
                serde_json::to_string(&package.rules)?,
                serde_json::to_string(&package.allowed_foods)?,
                serde_json::to_string(&package.forbidden_foods)?,
                serde_json::to_string(&package.sample_day)?,
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM packages ORDER BY name")?;
        let packages = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(packages)
    }

    pub fn get_by_id(conn: &Connection, id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM packages WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(package) => Ok(Some(package)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn json_column<T: serde::de::DeserializeOwned>(raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ============================================================================
// Programs
// ============================================================================

impl DietProgram {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let difficulty: String = row.get("difficulty")?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            icon: row.get("icon")?,
            difficulty: Difficulty::from_str(&difficulty).unwrap_or(Difficulty::Medium),
            duration_weeks: row.get("duration_weeks")?,
            daily_plans: Vec::new(),
        })
    }

    /// Insert a program with its plans and meals unless the id already exists
    pub fn insert(conn: &Connection, program: &DietProgram) -> DbResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO diet_programs
                (id, name, description, icon, difficulty, duration_weeks)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                program.id,
                program.name,
                program.description,
                program.icon,
                program.difficulty.as_str(),
                program.duration_weeks,
            ],
        )?;
        if rows == 0 {
            return Ok(false);
        }

        for plan in &program.daily_plans {
            conn.execute(
                "INSERT INTO diet_daily_plans (program_id, day, total_calories) VALUES (?1, ?2, ?3)",
                params![program.id, plan.day, plan.total_calories],
            )?;
            for (order, meal) in plan.meals.iter().enumerate() {
                conn.execute(
                    r#"
                    INSERT INTO diet_plan_meals
                        (id, program_id, day, name, calories, protein, carbs, fat,
                         image, meal_type, sort_order)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    "#,
                    params![
                        meal.id,
                        program.id,
                        plan.day,
                        meal.name,
                        meal.calories,
                        meal.protein,
                        meal.carbs,
                        meal.fat,
                        meal.image,
                        meal.meal_type.as_str(),
                        order as i64,
                    ],
                )?;
            }
        }

        Ok(true)
    }

    /// List programs without their daily plans
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM diet_programs ORDER BY name")?;
        let programs = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(programs)
    }

    /// Get a program with its daily plans and meals
    pub fn get_by_id(conn: &Connection, id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM diet_programs WHERE id = ?1")?;
        let mut program = match stmt.query_row([id], Self::from_row) {
            Ok(program) => program,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut plans_stmt = conn.prepare(
            "SELECT day, total_calories FROM diet_daily_plans WHERE program_id = ?1 ORDER BY day",
        )?;
        let plans = plans_stmt
            .query_map([id], |row| {
                Ok(DailyPlan {
                    day: row.get(0)?,
                    total_calories: row.get(1)?,
                    meals: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut meals_stmt = conn.prepare(
            r#"
            SELECT id, name, calories, protein, carbs, fat, image, meal_type
            FROM diet_plan_meals
            WHERE program_id = ?1 AND day = ?2
            ORDER BY sort_order
            "#,
        )?;
        for mut plan in plans {
            plan.meals = meals_stmt
                .query_map(params![id, plan.day], |row| {
                    let meal_type: String = row.get(7)?;
                    Ok(PlanMeal {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        calories: row.get(2)?,
                        protein: row.get(3)?,
                        carbs: row.get(4)?,
                        fat: row.get(5)?,
                        image: row.get(6)?,
                        meal_type: MealType::from_str(&meal_type).unwrap_or(MealType::Snack),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            program.daily_plans.push(plan);
        }

        Ok(Some(program))
    }
}

// ============================================================================
// Seed data
// ============================================================================

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn meal(id: &str, name: &str, kcal: f64, p: f64, c: f64, f: f64, meal_type: MealType) -> PlanMeal {
    PlanMeal {
        id: id.to_string(),
        name: name.to_string(),
        calories: kcal,
        protein: p,
        carbs: c,
        fat: f,
        image: None,
        meal_type,
    }
}

fn with_image(mut meal: PlanMeal, url: &str) -> PlanMeal {
    meal.image = Some(url.to_string());
    meal
}

/// Packages offered during onboarding
pub fn default_packages() -> Vec<DietPackage> {
    vec![
        DietPackage {
            id: "pkg_basic".into(),
            name: "Basic Wellness".into(),
            goal: PackageGoal::Maintain,
            description: "A balanced diet for maintaining healthy weight.".into(),
            rules: strings(&["Drink 2L water", "No processed sugar"]),
            allowed_foods: strings(&["Vegetables", "Lean meat", "Fruits"]),
            forbidden_foods: strings(&["Fast food", "Soda"]),
            sample_day: SampleDay {
                breakfast: "Oatmeal with berries".into(),
                lunch: "Grilled chicken salad".into(),
                dinner: "Steamed fish with veggies".into(),
                snacks: strings(&["Almonds", "Apple"]),
            },
        },
        DietPackage {
            id: "pkg_weight_loss".into(),
            name: "Rapid Weight Loss".into(),
            goal: PackageGoal::LoseWeight,
            description: "High protein, low carb plan for effective weight loss.".into(),
            rules: strings(&["No carbs after 6PM", "High protein intake"]),
            allowed_foods: strings(&["Chicken breast", "Eggs", "Green leafy veg"]),
            forbidden_foods: strings(&["Rice", "Bread", "Sugar"]),
            sample_day: SampleDay {
                breakfast: "3 Boiled Eggs".into(),
                lunch: "Tuna Salad".into(),
                dinner: "Grilled Chicken Breast".into(),
                snacks: strings(&["Protein Shake"]),
            },
        },
        DietPackage {
            id: "pkg_muscle".into(),
            name: "Muscle Gain".into(),
            goal: PackageGoal::GainMuscle,
            description: "Calorie surplus with high protein for muscle building.".into(),
            rules: strings(&["Eat every 3 hours", "Pre/Post workout meals"]),
            allowed_foods: strings(&["Red meat", "Rice", "Potatoes", "Chicken"]),
            forbidden_foods: strings(&["Empty calories"]),
            sample_day: SampleDay {
                breakfast: "4 Eggs + Oatmeal".into(),
                lunch: "Steak and Rice".into(),
                dinner: "Salmon and Potatoes".into(),
                snacks: strings(&["Greek Yogurt", "Protein Bar"]),
            },
        },
    ]
}

/// Programs whose ids match the macro split diet types
pub fn default_programs() -> Vec<DietProgram> {
    use MealType::*;

    vec![
        DietProgram {
            id: "balanced".into(),
            name: "Balanced Diet".into(),
            description: "A well-rounded diet with a mix of macronutrients.".into(),
            icon: "scale-outline".into(),
            difficulty: Difficulty::Easy,
            duration_weeks: 4,
            daily_plans: vec![DailyPlan {
                day: 1,
                total_calories: 2000.0,
                meals: vec![
                    with_image(
                        meal("m1", "Oatmeal with Berries", 350.0, 12.0, 60.0, 6.0, Breakfast),
                        "https://images.unsplash.com/photo-1517673400267-0251440c45dc?w=400",
                    ),
                    meal("m2", "Grilled Chicken Salad", 500.0, 40.0, 20.0, 25.0, Lunch),
                    meal("m3", "Salmon with Quinoa", 600.0, 45.0, 45.0, 22.0, Dinner),
                    meal("m4", "Almonds", 150.0, 6.0, 5.0, 12.0, Snack),
                ],
            }],
        },
        DietProgram {
            id: "keto".into(),
            name: "Keto Diet".into(),
            description: "High fat, low carb diet for ketosis.".into(),
            icon: "egg-outline".into(),
            difficulty: Difficulty::Medium,
            duration_weeks: 4,
            daily_plans: vec![DailyPlan {
                day: 1,
                total_calories: 1800.0,
                meals: vec![
                    meal("k1", "Bacon and Eggs", 450.0, 25.0, 2.0, 35.0, Breakfast),
                    meal("k2", "Avocado Salad", 550.0, 10.0, 8.0, 45.0, Lunch),
                    meal("k3", "Steak with Butter", 700.0, 50.0, 0.0, 50.0, Dinner),
                ],
            }],
        },
        DietProgram {
            id: "vegan".into(),
            name: "Vegan Diet".into(),
            description: "Plant-based diet rich in fiber.".into(),
            icon: "leaf-outline".into(),
            difficulty: Difficulty::Medium,
            duration_weeks: 4,
            daily_plans: vec![DailyPlan {
                day: 1,
                total_calories: 1800.0,
                meals: vec![
                    meal("v1", "Smoothie Bowl", 400.0, 10.0, 70.0, 8.0, Breakfast),
                    meal("v2", "Lentil Soup", 450.0, 18.0, 60.0, 10.0, Lunch),
                    meal("v3", "Tofu Stir-fry", 500.0, 25.0, 40.0, 20.0, Dinner),
                ],
            }],
        },
        DietProgram {
            id: "paleo".into(),
            name: "Paleo Diet".into(),
            description: "Eat like a hunter-gatherer.".into(),
            icon: "nutrition-outline".into(),
            difficulty: Difficulty::Hard,
            duration_weeks: 4,
            daily_plans: vec![DailyPlan {
                day: 1,
                total_calories: 2000.0,
                meals: vec![
                    meal("p1", "Fruit Salad", 300.0, 2.0, 70.0, 1.0, Breakfast),
                    with_image(
                        meal("p2", "Grilled Chicken", 600.0, 60.0, 0.0, 30.0, Lunch),
                        "https://images.unsplash.com/photo-1532550907401-a500c9a57435?w=400",
                    ),
                    meal("p3", "Steak and Veggies", 700.0, 70.0, 10.0, 40.0, Dinner),
                ],
            }],
        },
    ]
}

/// Insert the default catalog, skipping records that already exist.
///
/// Returns the number of records inserted.
pub fn seed_default_catalog(conn: &Connection) -> DbResult<usize> {
    let mut inserted = 0;
    for package in default_packages() {
        if DietPackage::insert(conn, &package)? {
            inserted += 1;
        }
    }
    for program in default_programs() {
        if DietProgram::insert(conn, &program)? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_seed_is_idempotent() {
        let conn = conn();
        // migrations already seeded everything
        assert_eq!(seed_default_catalog(&conn).unwrap(), 0);
        assert_eq!(DietPackage::list(&conn).unwrap().len(), 3);
        assert_eq!(DietProgram::list(&conn).unwrap().len(), 4);
    }

    #[test]
    fn test_package_json_columns() {
        let conn = conn();
        let package = DietPackage::get_by_id(&conn, "pkg_muscle").unwrap().unwrap();
        assert_eq!(package.goal, PackageGoal::GainMuscle);
        assert_eq!(package.sample_day.snacks, vec!["Greek Yogurt", "Protein Bar"]);
        assert!(DietPackage::get_by_id(&conn, "pkg_missing").unwrap().is_none());
    }

    #[test]
    fn test_program_with_plans() {
        let conn = conn();
        let keto = DietProgram::get_by_id(&conn, "keto").unwrap().unwrap();
        assert_eq!(keto.difficulty, Difficulty::Medium);
        assert_eq!(keto.daily_plans.len(), 1);

        let meals = &keto.daily_plans[0].meals;
        let names: Vec<&str> = meals.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Bacon and Eggs", "Avocado Salad", "Steak with Butter"]);
        assert_eq!(meals[0].meal_type, MealType::Breakfast);
    }

    #[test]
    fn test_program_listing_skips_plans() {
        let conn = conn();
        let programs = DietProgram::list(&conn).unwrap();
        assert!(programs.iter().all(|p| p.daily_plans.is_empty()));
        let balanced = DietProgram::get_by_id(&conn, "balanced").unwrap().unwrap();
        assert_eq!(
            balanced.daily_plans[0].meals[0].image.as_deref(),
            Some("https://images.unsplash.com/photo-1517673400267-0251440c45dc?w=400")
        );
    }
}
