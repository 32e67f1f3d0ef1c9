//! Exam-prep content backend
//!
//! - Axum HTTP API for questions, curriculum (subjects, sections, lessons) and tags
//! - Hosted relational backend over REST, or in-memory tables when none is configured
//! - Optional object storage and OpenAI integration
//! - Static admin SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   APP_CONFIG_PATH     : path to TOML config (server, backend, storage, ai, prompts)
//!   BACKEND_URL         : hosted backend base URL; unset means in-memory tables
//!   BACKEND_API_KEY     : key sent as `apikey` and bearer token
//!   STORAGE_PUBLIC_BASE : base of public object URLs when served from elsewhere
//!   OPENAI_API_KEY      : enables the AI helpers if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-4o-mini"
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use exam_prep_backend::config::load_config_from_env;
use exam_prep_backend::routes::build_router;
use exam_prep_backend::state::AppState;
use exam_prep_backend::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = load_config_from_env();

  // Shared state: store over the configured backend, storage and OpenAI clients, prompts.
  let state = Arc::new(AppState::new(&cfg)?);

  let app = build_router(state, &cfg.server.static_dir);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "exam_prep_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "exam_prep_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "exam_prep_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "exam_prep_backend", "Shutdown signal received");
}
