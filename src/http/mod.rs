// SPDX-License-Identifier: MIT OR Apache-2.0

//! Axum HTTP surface for the configuration server.
//!
//! ## URL layout
//!
//! ```text
//! GET  /actuator/health
//! GET  /{application}/{profiles}
//! GET  /{application}/{profiles}/{label}
//! GET  /{application}-{profiles}.{json|yml|yaml|properties}
//! GET  /{label}/{application}-{profiles}.{json|yml|yaml|properties}
//! ```
//!
//! The first two forms answer with the environment JSON (property sources
//! in precedence order). The document forms answer with the merged,
//! expanded configuration rendered in the requested format.

mod handlers;
mod render;

use std::future::Future;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::info;

use crate::domain::{ConfigError, Result};
use crate::service::ConfigServer;

pub use render::Format;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler.
///
/// Cheap to clone, the server is reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// The configuration server answering requests.
    pub server: Arc<ConfigServer>,
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Builds the axum router for `server`.
pub fn router(server: Arc<ConfigServer>) -> Router {
    Router::new()
        .route("/actuator/health",                  get(handlers::health))
        .route("/{document}",                       get(handlers::document))
        .route("/{first}/{second}",                 get(handlers::environment_or_labelled_document))
        .route("/{application}/{profiles}/{label}", get(handlers::labelled_environment))
        .with_state(AppState { server })
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Binds `bind_addr` and serves until `shutdown` completes.
pub async fn serve<F>(server: Arc<ConfigServer>, bind_addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind_addr).await.map_err(|e| ConfigError::Settings {
        message: format!("failed to bind {bind_addr}: {e}"),
        source: Some(Box::new(e)),
    })?;

    info!(%bind_addr, "configuration server listening");

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("configuration server shut down");
    Ok(())
}
