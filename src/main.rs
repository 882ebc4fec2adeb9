//! Meeting minutes server.
//!
//! Serves the JSON API the browser UI talks to. The application is organized
//! into the following modules:
//!
//! - `workspace`: the draft, templates, AI services, saved notes and settings
//! - `session`: the summary state machine
//! - `summarize`: streams a provider response into the session
//! - `provider`: the Ollama client
//! - `sync`: best-effort remote persistence for edited notes
//! - `handlers`: HTTP and WebSocket routes

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use minutes::config::Config;
use minutes::handlers;
use minutes::AppState;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let bind = config.bind;
    let ollama = config.ollama_base_url.clone();
    let model = config.model.clone();

    let state = match AppState::new(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("failed to initialise: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let app = handlers::router(state);

    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind to {}: {}", bind, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Meeting minutes server running at http://{}", bind);
    info!(%ollama, %model, "summaries via Ollama");

    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
