//! Dietrack
//!
//! An MCP server for diet onboarding and daily nutrition tracking.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use dietrack::config::{Config, StoreKind};
use dietrack::db::{self, Database};
use dietrack::mcp::DietrackService;
use dietrack::session::{MemoryProfileStore, ProfileStore, SessionManager, SqliteProfileStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dietrack=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Print startup banner to stderr
    dietrack::build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env();
    eprintln!("Profile store: {}", config.store.as_str());

    let (database, database_path, store) = match config.store {
        StoreKind::Sqlite => {
            eprintln!("Database path: {}", config.database_path.display());

            // Ensure data directory exists
            if let Some(parent) = config.database_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let database = Database::new(&config.database_path)?;
            let store: Arc<dyn ProfileStore> = Arc::new(SqliteProfileStore::new(database.clone()));
            (database, Some(config.database_path.clone()), store)
        }
        StoreKind::Memory => {
            eprintln!("Running in memory with a demo account; nothing is persisted");
            let store: Arc<dyn ProfileStore> = Arc::new(MemoryProfileStore::with_demo_account());
            (Database::in_memory()?, None, store)
        }
    };

    // Run migrations (also seeds the package and program catalog)
    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    // Resolve the persisted session before serving any tool call
    let session = Arc::new(SessionManager::new(store));
    session.start();

    let service = DietrackService::new(database_path, database, session.clone());

    // Create stdio transport
    let transport = (stdin(), stdout());

    // Start the MCP server
    let server = service.serve(transport).await?;

    // Wait for the server to complete
    server.waiting().await?;

    session.shutdown();
    Ok(())
}
