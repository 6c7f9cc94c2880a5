use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{healthz, raw_by_path, raw_by_query, readyz};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/raw", get(raw_by_query))
        // Empty path segment: same handling as a missing `name` query parameter.
        .route("/raw/", get(raw_by_query))
        .route("/raw/:name", get(raw_by_path))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::build_router;
    use std::{net::SocketAddr, sync::Arc};
    use tokio::net::TcpListener;

    use crate::config::ServiceConfig;
    use crate::models::ScriptRecord;
    use crate::state::AppState;
    use crate::store::MemoryStore;

    async fn spawn_app() -> SocketAddr {
        let store = MemoryStore::from_records([ScriptRecord {
            id: "abc".to_string(),
            name: "testscript".to_string(),
            content: "print(1)".to_string(),
            updated: Some("2024-01-01".to_string()),
        }])
        .unwrap();
        let app = build_router(AppState::new(Arc::new(store), ServiceConfig::in_memory()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn fetch(addr: SocketAddr, path: &str) -> (u16, String) {
        let response = reqwest::Client::new()
            .get(format!("http://{addr}{path}"))
            .header("user-agent", "synapse")
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    #[tokio::test]
    async fn empty_path_segment_reports_missing_name() {
        let addr = spawn_app().await;
        let (status, body) = fetch(addr, "/raw/").await;
        assert_eq!(status, 400);
        assert_eq!(body, "-- Script name is required");
    }

    #[tokio::test]
    async fn routes_query_and_path_variants() {
        let addr = spawn_app().await;
        assert_eq!(fetch(addr, "/raw?name=TestScript").await, (200, "print(1)".to_string()));
        assert_eq!(fetch(addr, "/raw/testscript?x=1").await, (200, "print(1)".to_string()));
        assert_eq!(fetch(addr, "/raw").await.0, 400);
        assert_eq!(fetch(addr, "/healthz").await.0, 200);
    }
}
