use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::{borrow::Cow, sync::Arc};

use crate::classify::classify;
use crate::config::DeniedResponse;
use crate::models::ScriptRecord;
use crate::page;
use crate::state::AppState;
use crate::store::{access_key, name_key, script_key, KvStore, StoreError, SCRIPT_KEY_PATTERN};

pub const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

pub struct ServiceError {
    pub status: StatusCode,
    pub message: &'static str,
    pub detail: Option<String>,
}

impl ServiceError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            message,
            detail: None,
        }
    }

    pub fn missing_name() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Script name is required")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Access denied: Executor access only")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Script not found")
    }

    pub fn internal(detail: String, expose: bool) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error",
            detail: expose.then_some(detail),
        }
    }

    /// Body prefixed with a Lua comment marker so an executor running it does nothing.
    pub fn body(&self) -> String {
        match &self.detail {
            Some(detail) => format!("-- {}: {}", self.message, detail),
            None => format!("-- {}", self.message),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = self.body();
        (self.status, [(header::CONTENT_TYPE, PLAIN_TEXT)], body).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored value at {key} is not a script record: {reason}")]
    Malformed { key: String, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Index,
    Scan,
}

impl Lookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Index => "index",
            Lookup::Scan => "scan",
        }
    }
}

pub struct Resolved {
    pub record: ScriptRecord,
    pub lookup: Lookup,
}

pub enum ScriptReply {
    Script(ScriptRecord),
    LoaderPage(String),
}

pub async fn fetch_script(
    state: &AppState,
    name: Option<&str>,
    headers: &HeaderMap,
) -> Result<ScriptReply, ServiceError> {
    let name = match name {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(ServiceError::missing_name()),
    };

    let user_agent = header_text(headers, header::USER_AGENT);
    let referer = header_text(headers, header::REFERER);
    let classification = classify(&user_agent, &referer);
    tracing::debug!(
        client = classification.kind.as_str(),
        allowed = classification.allowed,
        name,
        "client classified"
    );

    if !classification.allowed {
        tracing::info!(
            client = classification.kind.as_str(),
            name,
            user_agent = %user_agent,
            "non-executor request denied"
        );
        return match state.config.denied_response {
            DeniedResponse::Forbidden => Err(ServiceError::forbidden()),
            DeniedResponse::LoaderPage => {
                let base = public_base_url(state, headers);
                Ok(ScriptReply::LoaderPage(page::loader_page(&base, name)))
            }
        };
    }

    let resolved = match resolve_script(state.store.as_ref(), name).await {
        Ok(Some(resolved)) => resolved,
        Ok(None) => {
            tracing::info!(name, "script not found");
            return Err(ServiceError::not_found());
        }
        Err(err) => {
            tracing::error!(error = %err, name, "script lookup failed");
            return Err(ServiceError::internal(
                err.to_string(),
                state.config.expose_error_detail,
            ));
        }
    };

    tracing::info!(
        script_id = %resolved.record.id,
        lookup = resolved.lookup.as_str(),
        "serving script"
    );

    if state.config.access_counting {
        record_access(state.store.clone(), resolved.record.id.clone());
    }

    Ok(ScriptReply::Script(resolved.record))
}

/// Index first, then a full scan of stored records when the index has no entry.
pub async fn resolve_script(
    store: &dyn KvStore,
    name: &str,
) -> Result<Option<Resolved>, ResolveError> {
    let name = name.to_lowercase();

    if let Some(id) = store.get(&name_key(&name)).await?.and_then(index_id) {
        let key = script_key(&id);
        // A stale index entry is a miss; the scan only runs when the index is empty.
        let Some(value) = store.get(&key).await?.filter(is_truthy) else {
            tracing::warn!(script_id = %id, name = %name, "index points at missing record");
            return Ok(None);
        };
        let record =
            decode_record(value).map_err(|reason| ResolveError::Malformed { key, reason })?;
        return Ok(Some(Resolved {
            record,
            lookup: Lookup::Index,
        }));
    }

    for key in store.keys(SCRIPT_KEY_PATTERN).await? {
        let Some(value) = store.get(&key).await?.filter(is_truthy) else {
            continue;
        };
        let record = match decode_record(value) {
            Ok(record) => record,
            Err(reason) => {
                tracing::warn!(key = %key, reason = %reason, "skipping malformed record");
                continue;
            }
        };
        if record.name == name {
            return Ok(Some(Resolved {
                record,
                lookup: Lookup::Scan,
            }));
        }
    }

    Ok(None)
}

/// Accepts both JSON-encoded strings and already-decoded objects.
pub fn decode_record(value: Value) -> Result<ScriptRecord, String> {
    match value {
        Value::String(raw) => serde_json::from_str(&raw).map_err(|err| err.to_string()),
        other => serde_json::from_value(other).map_err(|err| err.to_string()),
    }
}

/// Stored values that are null, empty, `false` or zero count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn index_id(value: Value) -> Option<String> {
    if !is_truthy(&value) {
        return None;
    }
    match value {
        Value::String(id) => Some(id),
        // Non-string ids are looked up by their text form, e.g. `script:42` or `script:true`.
        other => Some(other.to_string()),
    }
}

/// Bumps the daily counter on a detached task; failures never reach the caller.
pub fn record_access(store: Arc<dyn KvStore>, script_id: String) {
    let day = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let key = access_key(&script_id, &day);
    tokio::spawn(async move {
        if let Err(err) = store.incr(&key).await {
            tracing::warn!(error = %err, key = %key, "access counter update failed");
        }
    });
}

/// Header text decoded as Latin-1, so a stray non-ASCII byte never blanks the value.
fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Cow<'_, str> {
    let Some(value) = headers.get(name) else {
        return Cow::Borrowed("");
    };
    match value.to_str() {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(value.as_bytes().iter().map(|&byte| char::from(byte)).collect()),
    }
}

fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config.public_base_url {
        return base.clone();
    }
    match header_text(headers, header::HOST).as_ref() {
        "" => String::new(),
        host => format!("https://{host}"),
    }
}
