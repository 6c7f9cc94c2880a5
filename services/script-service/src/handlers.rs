use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::models::{RawQuery, ScriptRecord};
use crate::service::{self, ScriptReply, PLAIN_TEXT};
use crate::state::AppState;

const READINESS_PROBE_KEY: &str = "name:__readyz__";
const X_SCRIPT_ID: HeaderName = HeaderName::from_static("x-script-id");
const X_SCRIPT_UPDATED: HeaderName = HeaderName::from_static("x-script-updated");

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match state.store.get(READINESS_PROBE_KEY).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "store not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn raw_by_query(
    State(state): State<AppState>,
    Query(query): Query<RawQuery>,
    headers: HeaderMap,
) -> Response {
    serve(&state, query.name.as_deref(), &headers).await
}

pub async fn raw_by_path(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve(&state, Some(name.as_str()), &headers).await
}

async fn serve(state: &AppState, name: Option<&str>, headers: &HeaderMap) -> Response {
    match service::fetch_script(state, name, headers).await {
        Ok(ScriptReply::Script(record)) => script_response(&record, state.config.metadata_headers),
        Ok(ScriptReply::LoaderPage(page)) => (StatusCode::OK, Html(page)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn script_response(record: &ScriptRecord, metadata_headers: bool) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

    if metadata_headers {
        // Values that cannot travel as a header are dropped rather than failing the request.
        if let Ok(value) = HeaderValue::from_str(&record.id) {
            headers.insert(X_SCRIPT_ID, value);
        }
        if let Some(Ok(value)) = record.updated.as_deref().map(HeaderValue::from_str) {
            headers.insert(X_SCRIPT_UPDATED, value);
        }
    }

    (StatusCode::OK, headers, record.content.clone()).into_response()
}
