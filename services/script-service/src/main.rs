mod app;
mod classify;
mod config;
mod handlers;
mod models;
mod page;
mod service;
mod state;
mod store;

use rawgate_common::{bind_listener, init_tracing, shutdown_signal};
use std::{process::ExitCode, sync::Arc};

use crate::config::{ServiceConfig, StoreSettings};
use crate::state::AppState;
use crate::store::{KvStore, MemoryStore, UpstashConfig, UpstashStore};

#[tokio::main]
async fn main() -> ExitCode {
    let _guards = init_tracing("script-service");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "script-service failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = ServiceConfig::from_env()?;
    let store = build_store(&config.store)?;
    tracing::info!(
        denied_response = %config.denied_response,
        access_counting = config.access_counting,
        "configuration loaded"
    );
    if config.expose_error_detail {
        tracing::warn!("EXPOSE_ERROR_DETAIL is on; 500 responses will include internal errors");
    }

    let port = config.port;
    let state = AppState::new(store, config);
    let app = app::build_router(state);
    let listener = bind_listener(port)
        .await
        .map_err(|err| format!("bind port {port} failed: {err}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| format!("serve failed: {err}"))
}

fn build_store(settings: &StoreSettings) -> Result<Arc<dyn KvStore>, String> {
    match settings {
        StoreSettings::Upstash {
            url,
            token,
            timeout,
        } => {
            tracing::info!(backend = "upstash", "using remote key-value store");
            let store = UpstashStore::new(UpstashConfig {
                url: url.clone(),
                token: token.clone(),
                timeout: *timeout,
            })?;
            Ok(Arc::new(store))
        }
        StoreSettings::Memory { seed_file } => {
            let store = match seed_file {
                Some(path) => {
                    tracing::info!(
                        backend = "memory",
                        seed = %path.display(),
                        "seeding in-memory store"
                    );
                    MemoryStore::from_seed_file(path)?
                }
                None => {
                    tracing::warn!(backend = "memory", "in-memory store starts empty");
                    MemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
    }
}
