//! Taskboard server -- change-request and notification API.
//!
//! An axum HTTP server over a `SQLite` database. Callers are identified by
//! the `x-user-id` header set by the upstream session layer.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080
//! cargo run --bin taskboard-server
//!
//! # Run on custom address with an explicit database
//! cargo run --bin taskboard-server -- --bind 127.0.0.1:3000 \
//!     --database-url sqlite:///tmp/taskboard.db
//!
//! # Or via environment variables
//! TASKBOARD_ADDR=127.0.0.1:3000 cargo run --bin taskboard-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskboard_server::config::{ServerCliArgs, ServerConfig};
use taskboard_server::server::{self, AppState};
use taskboard_server::store::Store;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        database = %config.database_url,
        "starting taskboard server"
    );

    let store = match Store::open(&config.database_url).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };
    let state = Arc::new(AppState::new(store));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "taskboard server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
