//! Daily Tracking and History MCP Tools
//!
//! Tools for the dashboard: water, steps, food intake and weigh-ins.

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::models::{DailyTracking, HistoryEntry, HistoryEntryCreate, IntakeLog};
use crate::nutrition::{DailyStats, DailyTargets};
use crate::session::SessionManager;

/// Default number of history entries returned
pub const DEFAULT_HISTORY_LIMIT: i64 = 30;

/// Progress toward each target for a day
#[derive(Debug, Serialize)]
pub struct DailyStatsResponse {
    pub stats: DailyStats,
    pub percent: StatsPercent,
    pub targets: DailyTargets,
}

/// Whole percent of each target reached
#[derive(Debug, Serialize)]
pub struct StatsPercent {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    pub water: u32,
    pub steps: u32,
}

/// Response for list_history
#[derive(Debug, Serialize)]
pub struct ListHistoryResponse {
    pub entries: Vec<HistoryEntry>,
    pub limit: i64,
}

/// Normalize an optional `YYYY-MM-DD` date, defaulting to today (local time)
pub fn resolve_date(date: Option<&str>) -> Result<String, String> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map(|parsed| parsed.format("%Y-%m-%d").to_string())
            .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", d)),
        None => Ok(chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()),
    }
}

fn signed_in_uid(session: &SessionManager) -> Result<String, String> {
    session.require_user().map(|u| u.uid).map_err(|e| e.to_string())
}

fn stats_response(session: &SessionManager, tracked: &DailyTracking) -> DailyStatsResponse {
    let profile = session.profile();
    let targets = DailyTargets::for_profile(profile.as_ref());
    let stats = DailyStats::new(&targets, tracked);
    DailyStatsResponse {
        percent: StatsPercent {
            calories: stats.calories.percent(),
            protein: stats.protein.percent(),
            carbs: stats.carbs.percent(),
            fat: stats.fat.percent(),
            water: stats.water.percent(),
            steps: stats.steps.percent(),
        },
        stats,
        targets,
    }
}

// ============================================================================
// Daily Tracking Tools
// ============================================================================

pub fn get_daily_stats(session: &SessionManager, db: &Database, date: Option<&str>) -> Result<DailyStatsResponse, String> {
    let uid = signed_in_uid(session)?;
    let date = resolve_date(date)?;
    let tracked = db
        .with_conn(|conn| DailyTracking::get(conn, &uid, &date))
        .map_err(|e| format!("Failed to load tracking: {}", e))?;
    Ok(stats_response(session, &tracked))
}

pub fn add_water(session: &SessionManager, db: &Database, liters: f64, date: Option<&str>) -> Result<DailyStatsResponse, String> {
    if !liters.is_finite() {
        return Err("liters must be a number".to_string());
    }
    let uid = signed_in_uid(session)?;
    let date = resolve_date(date)?;
    let tracked = db
        .with_conn(|conn| DailyTracking::add_water(conn, &uid, &date, liters))
        .map_err(|e| format!("Failed to add water: {}", e))?;
    Ok(stats_response(session, &tracked))
}

pub fn set_steps(session: &SessionManager, db: &Database, steps: u32, date: Option<&str>) -> Result<DailyStatsResponse, String> {
    let uid = signed_in_uid(session)?;
    let date = resolve_date(date)?;
    let tracked = db
        .with_conn(|conn| DailyTracking::set_steps(conn, &uid, &date, steps))
        .map_err(|e| format!("Failed to set steps: {}", e))?;
    Ok(stats_response(session, &tracked))
}

pub fn log_intake(session: &SessionManager, db: &Database, intake: IntakeLog, date: Option<&str>) -> Result<DailyStatsResponse, String> {
    let values = [intake.calories, intake.protein, intake.carbs, intake.fat];
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err("Intake values must be non-negative numbers".to_string());
    }
    let uid = signed_in_uid(session)?;
    let date = resolve_date(date)?;
    let tracked = db
        .with_conn(|conn| DailyTracking::log_intake(conn, &uid, &date, &intake))
        .map_err(|e| format!("Failed to log intake: {}", e))?;
    Ok(stats_response(session, &tracked))
}

// ============================================================================
// History Tools
// ============================================================================

pub fn list_history(session: &SessionManager, db: &Database, limit: Option<i64>) -> Result<ListHistoryResponse, String> {
    let uid = signed_in_uid(session)?;
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 365);
    let entries = db
        .with_conn(|conn| HistoryEntry::list_for_user(conn, &uid, limit))
        .map_err(|e| format!("Failed to list history: {}", e))?;
    Ok(ListHistoryResponse { entries, limit })
}

pub fn add_history_entry(session: &SessionManager, db: &Database, mut data: HistoryEntryCreate) -> Result<HistoryEntry, String> {
    if !(data.weight.is_finite() && data.weight > 0.0) {
        return Err("weight must be a positive number".to_string());
    }
    let uid = signed_in_uid(session)?;
    data.date = resolve_date(Some(&data.date))?;
    db.with_conn(|conn| HistoryEntry::create(conn, &uid, &data))
        .map_err(|e| format!("Failed to add history entry: {}", e))
}
