//! Ravel HTTP Server Binary
//!
//! Standalone binary that serves the Ravel note graph as a REST API.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (port 4300, ./data/ravel.db)
//! cargo run -p ravel-server
//!
//! # Custom port and database location
//! RAVEL_PORT=4400 RAVEL_DB_PATH=/srv/ravel/notes.db cargo run -p ravel-server
//! ```
//!
//! # Environment Variables
//!
//! - `RAVEL_PORT`: Server port (default: 4300)
//! - `RAVEL_DB_PATH`: SQLite database file (default: ./data/ravel.db)
//! - `CORS_ALLOW_ORIGIN`: Extra allowed origin for the web client
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use ravel_core::db::{DatabaseService, NoteStore, TursoStore};
use ravel_core::services::{BacklinkService, NoteService, PresenceService, RelatedService};

const DEFAULT_PORT: u16 = 4300;
const DEFAULT_DB_PATH: &str = "./data/ravel.db";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port = env::var("RAVEL_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let db_path: PathBuf = env::var("RAVEL_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));

    // Ensure database directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!("📦 Database: {}", db_path.display());

    let db = Arc::new(DatabaseService::new(db_path).await?);
    let store: Arc<dyn NoteStore> = Arc::new(TursoStore::new(db));

    let notes = NoteService::new(store.clone());
    let backlinks = BacklinkService::new(store.clone());
    let related = RelatedService::new(store.clone());
    let presence = PresenceService::new(store);

    ravel_server::api::start_server(notes, backlinks, related, presence, port).await?;

    Ok(())
}
