//! Dietrack MCP Server Implementation
//!
//! Implements the MCP server with all Dietrack tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{HistoryEntryCreate, IntakeLog};
use crate::session::SessionManager;
use crate::tools::catalog;
use crate::tools::community;
use crate::tools::profile::{self, ProfileFields};
use crate::tools::status::StatusTracker;
use crate::tools::tracking;

/// Dietrack MCP Service
#[derive(Clone)]
pub struct DietrackService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    session: Arc<SessionManager>,
    database: Database,
    tool_router: ToolRouter<DietrackService>,
}

impl DietrackService {
    /// `database_path` is `None` when the catalog and tracking tables live in memory
    pub fn new(database_path: Option<PathBuf>, database: Database, session: Arc<SessionManager>) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(session.store_name(), database_path))),
            session,
            database,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Session & Profile Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RegisterParams {
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoginParams {
    pub email: String,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ProfileFieldsParams {
    pub display_name: Option<String>,
    /// Years
    pub age: Option<u32>,
    /// male, female, other
    pub gender: Option<String>,
    /// Centimeters
    pub height: Option<f64>,
    /// Kilograms
    pub weight: Option<f64>,
    /// lose, maintain, gain
    pub target: Option<String>,
    /// sedentary, light, moderate, active, very_active
    pub activity_level: Option<String>,
    /// Diet program id; also picks the macro split (balanced, keto, vegan, paleo)
    pub current_diet_id: Option<String>,
    pub package_id: Option<String>,
    pub team_id: Option<String>,
}

impl From<ProfileFieldsParams> for ProfileFields {
    fn from(p: ProfileFieldsParams) -> Self {
        Self {
            display_name: p.display_name,
            age: p.age,
            gender: p.gender,
            height: p.height,
            weight: p.weight,
            target: p.target,
            activity_level: p.activity_level,
            current_diet_id: p.current_diet_id,
            package_id: p.package_id,
            team_id: p.team_id,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ResolveRouteParams {
    /// Screen path, e.g. "/(tabs)" or "/(onboarding)/profile-setup"
    pub current_path: String,
}

// ============================================================================
// Catalog Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetByIdParams {
    pub id: String,
}

// ============================================================================
// Community Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConversationParams {
    pub conversation_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SendMessageParams {
    pub conversation_id: String,
    /// Message body, trimmed; at most 2000 characters
    pub text: String,
}

// ============================================================================
// Tracking Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DateParams {
    /// YYYY-MM-DD, defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddWaterParams {
    /// Liters to add; negative removes
    pub liters: f64,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetStepsParams {
    pub steps: u32,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogIntakeParams {
    #[serde(default)]
    pub calories: f64,
    /// Grams
    #[serde(default)]
    pub protein: f64,
    /// Grams
    #[serde(default)]
    pub carbs: f64,
    /// Grams
    #[serde(default)]
    pub fat: f64,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListHistoryParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddHistoryEntryParams {
    /// Kilograms
    pub weight: f64,
    /// YYYY-MM-DD, defaults to today
    pub date: Option<String>,
    pub calories: Option<f64>,
    pub notes: Option<String>,
}

// ============================================================================
// Tool Router
// ============================================================================

#[tool_router]
impl DietrackService {
    // --- Status ---

    #[tool(description = "Get the current status of the Dietrack service including build info, storage backend, and process information")]
    async fn dietrack_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status();
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get step-by-step instructions for onboarding a user and tracking their day. Call this when starting a session or when unsure how the tools fit together.")]
    fn onboarding_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::ONBOARDING_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(ONBOARDING_INSTRUCTIONS)]))
    }

    // --- Session ---

    #[tool(description = "Create an account and sign it in. Returns the onboarding state and the next screen.")]
    fn register(&self, Parameters(p): Parameters<RegisterParams>) -> Result<CallToolResult, McpError> {
        let result = profile::register(&self.session, &p.email, p.display_name.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Sign in an existing account by email. Returns the onboarding state and the next screen.")]
    fn login(&self, Parameters(p): Parameters<LoginParams>) -> Result<CallToolResult, McpError> {
        let result = profile::login(&self.session, &p.email).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Sign out the current user. The account is kept.")]
    fn logout(&self) -> Result<CallToolResult, McpError> {
        let result = profile::logout(&self.session).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Get the signed-in user, their profile, and their onboarding state")]
    fn current_session(&self) -> Result<CallToolResult, McpError> {
        to_result(&profile::current_session(&self.session))
    }

    // --- Profile ---

    #[tool(description = "Get the signed-in user's profile, freshly read from storage")]
    fn get_profile(&self) -> Result<CallToolResult, McpError> {
        let result = profile::get_profile(&self.session).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Update profile fields for the signed-in user. Only provided fields change. Age, height and weight complete the profile-setup step.")]
    fn update_profile(&self, Parameters(p): Parameters<ProfileFieldsParams>) -> Result<CallToolResult, McpError> {
        let result = profile::update_profile(&self.session, p.into()).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Permanently delete the signed-in account with all tracking and history, then sign out")]
    fn delete_account(&self) -> Result<CallToolResult, McpError> {
        let result = profile::delete_account(&self.session, &self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    // --- Onboarding & Targets ---

    #[tool(description = "Given the current screen path, return the screen the user must be redirected to (null if none)")]
    fn resolve_route(&self, Parameters(p): Parameters<ResolveRouteParams>) -> Result<CallToolResult, McpError> {
        to_result(&profile::resolve_route(&self.session, &p.current_path))
    }

    #[tool(description = "Calculate daily water, calorie, macro and step targets for the signed-in user. Any profile field given overrides the stored value for this calculation only.")]
    fn calculate_targets(&self, Parameters(p): Parameters<ProfileFieldsParams>) -> Result<CallToolResult, McpError> {
        let result = profile::calculate_targets(&self.session, p.into()).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    // --- Catalog ---

    #[tool(description = "List the diet packages a user can choose during onboarding")]
    fn list_packages(&self) -> Result<CallToolResult, McpError> {
        let result = catalog::list_packages(&self.session, &self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Get full details of a diet package including rules, allowed/forbidden foods and a sample day")]
    fn get_package(&self, Parameters(p): Parameters<GetByIdParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::get_package(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Choose a diet package for the signed-in user. This completes onboarding.")]
    fn select_package(&self, Parameters(p): Parameters<GetByIdParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::select_package(&self.session, &self.database, &p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "List diet programs (balanced, keto, vegan, paleo)")]
    fn list_diet_programs(&self) -> Result<CallToolResult, McpError> {
        let result = catalog::list_diet_programs(&self.session, &self.database)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Get a diet program with its daily meal plans")]
    fn get_diet_program(&self, Parameters(p): Parameters<GetByIdParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::get_diet_program(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Make a diet program the signed-in user's current diet. Changes the macro split of their targets.")]
    fn select_diet_program(&self, Parameters(p): Parameters<GetByIdParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::select_diet_program(&self.session, &self.database, &p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    // --- Tracking ---

    #[tool(description = "Get a day's tracked values against the user's targets (calories, macros, water, steps)")]
    fn get_daily_stats(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = tracking::get_daily_stats(&self.session, &self.database, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Add water in liters to a day (negative to remove). The total never drops below zero.")]
    fn add_water(&self, Parameters(p): Parameters<AddWaterParams>) -> Result<CallToolResult, McpError> {
        let result = tracking::add_water(&self.session, &self.database, p.liters, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Set the step count for a day")]
    fn set_steps(&self, Parameters(p): Parameters<SetStepsParams>) -> Result<CallToolResult, McpError> {
        let result = tracking::set_steps(&self.session, &self.database, p.steps, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Add food intake (calories and grams of protein, carbs, fat) to a day's totals")]
    fn log_intake(&self, Parameters(p): Parameters<LogIntakeParams>) -> Result<CallToolResult, McpError> {
        let intake = IntakeLog { calories: p.calories, protein: p.protein, carbs: p.carbs, fat: p.fat };
        let result = tracking::log_intake(&self.session, &self.database, intake, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    // --- History ---

    #[tool(description = "List the signed-in user's weigh-in history, newest first")]
    fn list_history(&self, Parameters(p): Parameters<ListHistoryParams>) -> Result<CallToolResult, McpError> {
        let result = tracking::list_history(&self.session, &self.database, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Record a weigh-in for the signed-in user")]
    fn add_history_entry(&self, Parameters(p): Parameters<AddHistoryEntryParams>) -> Result<CallToolResult, McpError> {
        let data = HistoryEntryCreate {
            date: p.date.unwrap_or_default(),
            weight: p.weight,
            notes: p.notes,
            calories: p.calories,
        };
        let result = tracking::add_history_entry(&self.session, &self.database, data)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    // --- Community ---

    #[tool(description = "List community groups with member counts and their next session")]
    fn list_groups(&self) -> Result<CallToolResult, McpError> {
        let result = community::list_groups(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Get a community group by id")]
    fn get_group(&self, Parameters(p): Parameters<GetByIdParams>) -> Result<CallToolResult, McpError> {
        let result = community::get_group(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "List the signed-in user's conversations with coaches and support, most recent first")]
    fn list_conversations(&self) -> Result<CallToolResult, McpError> {
        let result = community::list_conversations(&self.session, &self.database)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Get the messages of a conversation, oldest first. Unknown conversations have no messages.")]
    fn get_messages(&self, Parameters(p): Parameters<ConversationParams>) -> Result<CallToolResult, McpError> {
        let result = community::get_messages(&self.session, &self.database, &p.conversation_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }

    #[tool(description = "Send a message in a conversation as the signed-in user")]
    fn send_message(&self, Parameters(p): Parameters<SendMessageParams>) -> Result<CallToolResult, McpError> {
        let result = community::send_message(&self.session, &self.database, &p.conversation_id, &p.text)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for DietrackService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dietrack".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Dietrack".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Dietrack - Diet onboarding, daily targets and tracking. \
                 IMPORTANT: Call onboarding_instructions first. \
                 Session: register/login/logout/current_session. \
                 Profile: get_profile/update_profile/delete_account. \
                 Onboarding: resolve_route (login -> profile setup -> package selection -> app). \
                 Targets: calculate_targets (water, calories, macros, steps). \
                 Catalog: list/get/select_package, list/get/select_diet_program. \
                 Tracking: get_daily_stats, add_water, set_steps, log_intake. \
                 History: list_history, add_history_entry. \
                 Community: list_groups, get_group, list_conversations, get_messages, send_message."
                    .into(),
            ),
        }
    }
}
