use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ScriptRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    /// Echoed verbatim as a header; writers store ISO strings or epoch numbers.
    #[serde(default, deserialize_with = "timestamp_text")]
    pub updated: Option<String>,
}

fn timestamp_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Deserialize)]
pub struct RawQuery {
    pub name: Option<String>,
}

/// Seed file format for the in-memory store.
#[derive(Deserialize)]
pub struct SeedFile {
    pub scripts: Vec<ScriptRecord>,
}
