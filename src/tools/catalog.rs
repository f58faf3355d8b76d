//! Catalog MCP Tools
//!
//! Browsing and choosing diet packages and diet programs.

use serde::Serialize;

use crate::db::Database;
use crate::models::{DietPackage, DietProgram, ProfileUpdate, UserProfile};
use crate::nutrition::DailyTargets;
use crate::session::SessionManager;

/// Response for list_packages
#[derive(Debug, Serialize)]
pub struct ListPackagesResponse {
    pub packages: Vec<DietPackage>,
    pub selected: Option<String>,
}

/// Program summary for listing
#[derive(Debug, Serialize)]
pub struct ProgramSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub difficulty: String,
    pub duration_weeks: u32,
}

/// Response for list_diet_programs
#[derive(Debug, Serialize)]
pub struct ListProgramsResponse {
    pub programs: Vec<ProgramSummary>,
    pub current: Option<String>,
}

/// Response for select_package / select_diet_program
#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub selected: String,
    pub profile: UserProfile,
    pub targets: DailyTargets,
}

// ============================================================================
// Package Tools
// ============================================================================

pub fn list_packages(session: &SessionManager, db: &Database) -> Result<ListPackagesResponse, String> {
    let packages = db
        .with_conn(DietPackage::list)
        .map_err(|e| format!("Failed to list packages: {}", e))?;
    Ok(ListPackagesResponse {
        packages,
        selected: session.profile().and_then(|p| p.package_id),
    })
}

pub fn get_package(db: &Database, id: &str) -> Result<DietPackage, String> {
    db.with_conn(|conn| DietPackage::get_by_id(conn, id))
        .map_err(|e| format!("Failed to get package: {}", e))?
        .ok_or_else(|| format!("Package not found: {}", id))
}

/// Choose a package for the signed-in user, passing the last onboarding gate
pub fn select_package(session: &SessionManager, db: &Database, id: &str) -> Result<SelectionResponse, String> {
    session.require_user().map_err(|e| e.to_string())?;
    let package = get_package(db, id)?;

    let profile = session
        .update_profile(&ProfileUpdate { package_id: Some(package.id.clone()), ..Default::default() })
        .map_err(|e| format!("Failed to select package: {}", e))?;
    tracing::info!("Selected package {}", package.id);

    Ok(SelectionResponse {
        targets: DailyTargets::for_profile(Some(&profile)),
        selected: package.id,
        profile,
    })
}

// ============================================================================
// Program Tools
// ============================================================================

pub fn list_diet_programs(session: &SessionManager, db: &Database) -> Result<ListProgramsResponse, String> {
    let programs = db
        .with_conn(DietProgram::list)
        .map_err(|e| format!("Failed to list diet programs: {}", e))?;

    let programs = programs
        .into_iter()
        .map(|p| ProgramSummary {
            id: p.id,
            name: p.name,
            description: p.description,
            icon: p.icon,
            difficulty: p.difficulty.as_str().to_string(),
            duration_weeks: p.duration_weeks,
        })
        .collect();

    Ok(ListProgramsResponse {
        programs,
        current: session.profile().and_then(|p| p.current_diet_id),
    })
}

pub fn get_diet_program(db: &Database, id: &str) -> Result<DietProgram, String> {
    db.with_conn(|conn| DietProgram::get_by_id(conn, id))
        .map_err(|e| format!("Failed to get diet program: {}", e))?
        .ok_or_else(|| format!("Diet program not found: {}", id))
}

/// Make a program the user's current diet; this changes the macro split
pub fn select_diet_program(session: &SessionManager, db: &Database, id: &str) -> Result<SelectionResponse, String> {
    session.require_user().map_err(|e| e.to_string())?;
    let program = get_diet_program(db, id)?;

    let profile = session
        .update_profile(&ProfileUpdate { current_diet_id: Some(program.id.clone()), ..Default::default() })
        .map_err(|e| format!("Failed to select diet program: {}", e))?;
    tracing::info!("Selected diet program {}", program.id);

    Ok(SelectionResponse {
        targets: DailyTargets::for_profile(Some(&profile)),
        selected: program.id,
        profile,
    })
}
