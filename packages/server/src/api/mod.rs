//! HTTP API over the Ravel note graph
//!
//! The server exposes the core services as a REST API for the web client.
//! Endpoints are organized into modules, one per concern:
//! - `note_endpoints`: note CRUD, save, folders, periodic notes
//! - `link_endpoints`: backlinks, mentions, outgoing links, related notes
//! - `tag_endpoints`: tag listing and upsert
//! - `presence_endpoints`: viewer heartbeats
//!
//! Every service is a stateless handle over one shared store, so `AppState`
//! is a plain bundle of cheap clones.
//!
//! # Security
//!
//! - CORS restricted to the local web client (configurable via
//!   `CORS_ALLOW_ORIGIN`)
//! - No authentication (single-user, local-first deployment)

use axum::{
    http::{header, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use ravel_core::services::{BacklinkService, NoteService, PresenceService, RelatedService};

mod link_endpoints;
mod note_endpoints;
mod presence_endpoints;
mod tag_endpoints;

// Shared HTTP error handling
mod http_error;

// Re-export HttpError for use by endpoint modules
pub use http_error::HttpError;

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub notes: NoteService,
    pub backlinks: BacklinkService,
    pub related: RelatedService,
    pub presence: PresenceService,
}

/// Create the main application router with all endpoint modules
///
/// Each endpoint module contributes its routes independently via
/// `.merge()`, so a new concern lands as a new module plus one line here.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(note_endpoints::routes(state.clone()))
        .merge(link_endpoints::routes(state.clone()))
        .merge(tag_endpoints::routes(state.clone()))
        .merge(presence_endpoints::routes(state))
        .layer(cors_layer())
}

/// Create CORS layer for the local web client
///
/// Allows requests from the dev and preview ports of the bundled web
/// client. Deployments serving the client from another origin set
/// `CORS_ALLOW_ORIGIN` instead.
fn cors_layer() -> CorsLayer {
    let default_origins = [
        "http://localhost:5173", // Vite dev server
        "http://localhost:4173", // Vite preview
    ];

    let origins: Vec<header::HeaderValue> =
        if let Ok(custom_origin) = std::env::var("CORS_ALLOW_ORIGIN") {
            vec![custom_origin
                .parse::<header::HeaderValue>()
                .expect("Invalid CORS_ALLOW_ORIGIN - must be valid HTTP origin")]
        } else {
            default_origins
                .iter()
                .map(|o| o.parse::<header::HeaderValue>().unwrap())
                .collect()
        };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
        .allow_credentials(false)
}

/// Start the HTTP server
///
/// # Arguments
///
/// * `notes` - Note service instance
/// * `backlinks` - Backlink service instance
/// * `related` - Related-notes service instance
/// * `presence` - Presence service instance
/// * `port` - Port to listen on
///
/// # Errors
///
/// Returns error if the server fails to bind or start.
pub async fn start_server(
    notes: NoteService,
    backlinks: BacklinkService,
    related: RelatedService,
    presence: PresenceService,
    port: u16,
) -> anyhow::Result<()> {
    let state = AppState {
        notes,
        backlinks,
        related,
        presence,
    };
    let app = create_router(state);

    let addr = format!("127.0.0.1:{}", port);
    tracing::info!("🚀 Ravel server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
