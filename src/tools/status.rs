//! Dietrack Status Tool
//!
//! Provides runtime status information about the Dietrack service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Onboarding and tracking instructions for AI assistants
pub const ONBOARDING_INSTRUCTIONS: &str = r#"
# Dietrack Onboarding & Tracking Instructions

This guide explains how to take a user from sign-up to daily tracking with
the Dietrack tools.

## Onboarding Gates

A user must pass three gates, in order, before the main app is available:

| State | Meaning | Screen |
|-------|---------|--------|
| `unauthenticated` | nobody is signed in | `/(auth)/login` |
| `profile_incomplete` | age, height or weight missing | `/(onboarding)/profile-setup` |
| `package_unselected` | no diet package chosen | `/(onboarding)/package-selection` |
| `ready` | onboarding finished | `/(tabs)` |

`current_session` reports the state. `resolve_route(current_path)` returns the
screen the user must be moved to, or `null` if they may stay.

## Step-by-Step

1. **Sign in** with `login(email)`, or create an account with
   `register(email, display_name)`. Registration signs the user in.
2. **Profile setup**: `update_profile(age, height, weight, gender,
   activity_level, target)`. Height is centimeters, weight is kilograms.
   - gender: `male`, `female`, `other`
   - activity_level: `sedentary`, `light`, `moderate`, `active`, `very_active`
   - target: `lose`, `maintain`, `gain`
3. **Package selection**: `list_packages`, then `select_package(package_id)`.
4. Optionally pick a diet program: `list_diet_programs`, then
   `select_diet_program(program_id)`. The program decides the macro split
   (`balanced`, `keto`, `vegan`, `paleo`).

## Daily Targets

`calculate_targets` returns the water, calorie, macro and step goals for the
signed-in user. Pass any profile field to try a "what if" without saving it.

- Water: 35 ml per kg of body weight, in liters, one decimal. 2.5 L without a weight.
- Calories: Mifflin-St Jeor BMR times the activity multiplier, minus 500 to
  lose, plus 500 to gain. 2000 kcal when age, gender, height or weight is missing.
- Macros: grams from the calorie target and the diet's ratio
  (4 kcal/g protein and carbs, 9 kcal/g fat).
- Steps: 10,000.

## Tracking

Dates use ISO format `YYYY-MM-DD` and default to today.

| Task | Tool |
|------|------|
| Dashboard for a day | `get_daily_stats` |
| Drink water (negative to undo) | `add_water` |
| Record step count | `set_steps` |
| Log food intake | `log_intake` |
| Record a weigh-in | `add_history_entry` |
| Weigh-in history | `list_history` |

## Community

| Task | Tool |
|------|------|
| Browse groups | `list_groups`, `get_group(id)` |
| Inbox, most recent first | `list_conversations` |
| Read a thread | `get_messages(conversation_id)` |
| Reply | `send_message(conversation_id, text)` |

The inbox tools need a signed-in user.

## Account

- `logout` signs out; the account is kept.
- `delete_account` removes the account with all tracking and history.
"#;

/// Runtime status of the Dietrack service
#[derive(Debug, Clone, Serialize)]
pub struct DietrackStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Storage information
    pub profile_store: &'static str,
    pub database_path: Option<String>,
    pub database_size_bytes: Option<u64>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    profile_store: &'static str,
    /// `None` when running fully in memory
    database_path: Option<PathBuf>,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(profile_store: &'static str, database_path: Option<PathBuf>) -> Self {
        Self {
            start_time: Instant::now(),
            profile_store,
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> DietrackStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = self
            .database_path
            .as_ref()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|m| m.len());

        // Get process info
        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        DietrackStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            profile_store: self.profile_store,
            database_path: self.database_path.as_ref().map(|p| p.display().to_string()),
            database_size_bytes,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
