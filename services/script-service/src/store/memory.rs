use async_trait::async_trait;
use globset::Glob;
use serde_json::Value;
use std::{collections::BTreeMap, path::Path};
use tokio::sync::Mutex;

use super::{name_key, script_key, KvStore, StoreError};
use crate::models::{ScriptRecord, SeedFile};

/// In-process store for local runs and tests. Keys enumerate in sorted order.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ScriptRecord>) -> Result<Self, String> {
        let mut entries = BTreeMap::new();
        for mut record in records {
            record.name = record.name.to_lowercase();
            let encoded = serde_json::to_string(&record)
                .map_err(|err| format!("encode record {} failed: {err}", record.id))?;
            entries.insert(name_key(&record.name), Value::from(record.id.clone()));
            entries.insert(script_key(&record.id), Value::from(encoded));
        }
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    pub fn from_seed_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| format!("read seed file {} failed: {err}", path.display()))?;
        let seed: SeedFile = serde_json::from_str(&raw)
            .map_err(|err| format!("parse seed file {} failed: {err}", path.display()))?;
        Self::from_records(seed.scripts)
    }

    #[cfg(test)]
    pub async fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.lock().await.insert(key.into(), value.into());
    }

    #[cfg(test)]
    pub async fn remove(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let matcher = Glob::new(pattern)
            .map_err(|err| StoreError::Command(format!("invalid pattern: {err}")))?
            .compile_matcher();
        let entries = self.entries.lock().await;
        Ok(entries
            .keys()
            .filter(|key| matcher.is_match(key.as_str()))
            .cloned()
            .collect())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.entries.lock().await;
        let current = match entries.get(key) {
            None => 0,
            Some(Value::Number(number)) => number.as_i64().ok_or_else(not_an_integer)?,
            Some(Value::String(text)) => text.parse::<i64>().map_err(|_| not_an_integer())?,
            Some(_) => return Err(not_an_integer()),
        };
        let next = current.checked_add(1).ok_or_else(not_an_integer)?;
        entries.insert(key.to_string(), Value::from(next));
        Ok(next)
    }
}

fn not_an_integer() -> StoreError {
    StoreError::Command("value is not an integer or out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, name: &str) -> ScriptRecord {
        ScriptRecord {
            id: id.to_string(),
            name: name.to_string(),
            content: format!("print('{name}')"),
            updated: None,
        }
    }

    #[tokio::test]
    async fn seeding_writes_index_and_record() {
        let store = MemoryStore::from_records([record("abc", "TestScript")]).unwrap();
        assert_eq!(store.get("name:testscript").await.unwrap(), Some(json!("abc")));
        let stored = store.get("script:abc").await.unwrap().unwrap();
        assert!(stored.is_string());
    }

    #[tokio::test]
    async fn keys_filters_by_glob() {
        let store = MemoryStore::from_records([record("b", "two"), record("a", "one")]).unwrap();
        store.set("access:a:2024-01-01", 3).await;
        let keys = store.keys("script:*").await.unwrap();
        assert_eq!(keys, vec!["script:a".to_string(), "script:b".to_string()]);
    }

    #[tokio::test]
    async fn incr_starts_at_one_and_rejects_text() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("access:a:2024-01-01").await.unwrap(), 1);
        assert_eq!(store.incr("access:a:2024-01-01").await.unwrap(), 2);
        store.set("word", "hello").await;
        assert!(matches!(
            store.incr("word").await,
            Err(StoreError::Command(_))
        ));
    }

    #[tokio::test]
    async fn loads_demo_seed_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/seed.json");
        let store = MemoryStore::from_seed_file(&path).unwrap();
        assert_eq!(store.get("name:hello").await.unwrap(), Some(json!("k7x2")));
        assert_eq!(store.keys("script:*").await.unwrap().len(), 2);
    }

    #[test]
    fn missing_seed_file_is_reported() {
        let err = MemoryStore::from_seed_file(Path::new("/nonexistent/seed.json")).err().unwrap();
        assert!(err.contains("read seed file"));
    }
}
