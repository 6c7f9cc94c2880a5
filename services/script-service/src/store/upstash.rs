use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{KvStore, StoreError};

/// Client for the Upstash Redis REST protocol, which Vercel KV also speaks.
#[derive(Clone)]
pub struct UpstashStore {
    client: Client,
    url: String,
    token: String,
}

#[derive(Clone)]
pub struct UpstashConfig {
    pub url: String,
    pub token: String,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(config: UpstashConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| format!("build http client failed: {err}"))?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    async fn command(&self, args: &[&str]) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(self.url.as_str())
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        decode_reply(status.as_u16(), &body)
    }
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Transport(err.to_string())
    }
}

fn decode_reply(status: u16, body: &[u8]) -> Result<Value, StoreError> {
    let reply: CommandReply = match serde_json::from_slice(body) {
        Ok(reply) => reply,
        Err(_) if !(200..300).contains(&status) => return Err(StoreError::Status(status)),
        Err(err) => return Err(StoreError::Malformed(err.to_string())),
    };
    if let Some(error) = reply.error {
        return Err(StoreError::Command(error));
    }
    if !(200..300).contains(&status) {
        return Err(StoreError::Status(status));
    }
    Ok(reply.result.unwrap_or(Value::Null))
}

#[async_trait]
impl KvStore for UpstashStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let value = self.command(&["GET", key]).await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        match self.command(&["KEYS", pattern]).await? {
            Value::Null => Ok(Vec::new()),
            value => serde_json::from_value(value)
                .map_err(|err| StoreError::Malformed(format!("KEYS reply: {err}"))),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let value = self.command(&["INCR", key]).await?;
        value
            .as_i64()
            .ok_or_else(|| StoreError::Malformed(format!("INCR reply: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_result_envelope() {
        let value = decode_reply(200, br#"{"result":"abc"}"#).unwrap();
        assert_eq!(value, json!("abc"));
        let missing = decode_reply(200, br#"{"result":null}"#).unwrap();
        assert!(missing.is_null());
    }

    #[test]
    fn surfaces_command_errors() {
        let err = decode_reply(400, br#"{"error":"ERR wrong number of arguments"}"#).unwrap_err();
        assert!(matches!(err, StoreError::Command(message) if message.contains("wrong number")));
    }

    #[test]
    fn non_json_failure_maps_to_status() {
        let err = decode_reply(401, b"Unauthorized").unwrap_err();
        assert!(matches!(err, StoreError::Status(401)));
    }

    #[test]
    fn non_json_success_is_malformed() {
        let err = decode_reply(200, b"<html>").unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn trims_trailing_slash_from_url() {
        let store = UpstashStore::new(UpstashConfig {
            url: "https://example.upstash.io/".to_string(),
            token: "token".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(store.url, "https://example.upstash.io");
    }
}
