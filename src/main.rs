//! SkillBoost · Daily Quiz Backend
//!
//! - Axum HTTP API: daily questions (cache-or-generate) and learning progress
//! - OpenAI-backed question generation (via environment variables)
//! - Daily background batch that pre-generates every category/level
//!
//! Important env variables:
//!   PORT                    : u16 (default 3000)
//!   OPENAI_API_KEY          : enables question generation if present
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1"
//!   OPENAI_MODEL            : default "gpt-4"
//!   SKILLBOOST_CONFIG_PATH  : path to TOML config (prompts, categories, schedule, store)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod auth;
mod config;
mod domain;
mod error;
mod generator;
mod openai;
mod progress;
mod protocol;
mod questions;
mod routes;
mod scheduler;
mod state;
mod store;
mod telemetry;
mod util;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: config, document store, optional OpenAI client.
  let state = AppState::from_env().await?;

  if state.config.schedule.enabled {
    tokio::spawn(scheduler::run(state.clone()));
  } else {
    info!(target: "scheduler", "Daily batch disabled by config");
  }

  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "skillboost_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "skillboost_backend", error = %e, "Failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!(target: "skillboost_backend", "Shutdown signal received");
}
