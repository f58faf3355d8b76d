//! Utility to set onboarding fields for an account and print its targets
//!
//! Usage: set_profile <email> [field=value ...]
//!
//! Fields: name, age, gender, height, weight, target, activity, diet, package.
//! The account is created if it does not exist yet.

use dietrack::config::database_path;
use dietrack::db::{migrations, Database};
use dietrack::nutrition::DailyTargets;
use dietrack::onboarding::OnboardingState;
use dietrack::session::{ProfileStore, SqliteProfileStore};
use dietrack::tools::profile::{build_profile_update, ProfileFields};

fn parse_fields(args: &[String]) -> Result<ProfileFields, String> {
    let mut fields = ProfileFields::default();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("Expected field=value, got '{}'", arg))?;
        let value = value.trim().to_string();
        match key.trim() {
            "name" => fields.display_name = Some(value),
            "age" => fields.age = Some(value.parse().map_err(|_| format!("Invalid age '{}'", value))?),
            "gender" => fields.gender = Some(value),
            "height" => fields.height = Some(value.parse().map_err(|_| format!("Invalid height '{}'", value))?),
            "weight" => fields.weight = Some(value.parse().map_err(|_| format!("Invalid weight '{}'", value))?),
            "target" => fields.target = Some(value),
            "activity" => fields.activity_level = Some(value),
            "diet" => fields.current_diet_id = Some(value),
            "package" => fields.package_id = Some(value),
            other => return Err(format!("Unknown field '{}'", other)),
        }
    }
    Ok(fields)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((email, rest)) = args.split_first() else {
        eprintln!("Usage: set_profile <email> [field=value ...]");
        std::process::exit(2);
    };
    let update = build_profile_update(parse_fields(rest)?)?;

    let db_path = database_path();
    println!("Database path: {}", db_path.display());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&db_path)?;
    database.with_conn(migrations::run_migrations)?;

    let store = SqliteProfileStore::new(database);
    let account = match store.find_by_email(email)? {
        Some(profile) => profile,
        None => {
            println!("Creating account for {}", email);
            store.create_profile(email, None)?
        }
    };

    let profile = if update.is_empty() {
        account
    } else {
        store.update_profile(&account.uid, &update)?
    };

    let targets = DailyTargets::for_profile(Some(&profile));
    println!("Profile for {} ({}):", profile.email, profile.uid);
    println!("  Age: {:?}", profile.age);
    println!("  Gender: {}", profile.gender.map(|g| g.as_str()).unwrap_or("-"));
    println!("  Height: {:?} cm", profile.height);
    println!("  Weight: {:?} kg", profile.weight);
    println!("  Target: {}", profile.target.map(|t| t.as_str()).unwrap_or("-"));
    println!("  Activity: {}", profile.activity_level.map(|a| a.as_str()).unwrap_or("-"));
    println!("  Package: {}", profile.package_id.as_deref().unwrap_or("-"));
    println!("  Onboarding: {}", OnboardingState::evaluate(true, Some(&profile)).as_str());
    println!("Daily targets ({} diet):", targets.diet_type.as_str());
    println!("  Calories: {} kcal", targets.calories);
    println!(
        "  Protein: {} g | Carbs: {} g | Fat: {} g",
        targets.macros.protein, targets.macros.carbs, targets.macros.fat
    );
    println!("  Water: {} L", targets.water_liters);
    println!("  Steps: {}", targets.steps);

    Ok(())
}
