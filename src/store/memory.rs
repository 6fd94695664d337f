//! In-process document store.
//!
//! Backs the test suite and local development. A single mutex over the
//! document tree gives [`DocumentStore::transaction`] the same exclusivity a
//! remote store provides per path: the closure runs while the tree is held,
//! so a concurrent writer observes either the pre- or post-transaction
//! document, never an intermediate state.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{LedgerError, LedgerResult};
use crate::store::{DocPath, DocumentStore, TransactionFn};

/// Mutex-guarded in-memory document tree
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, path: &DocPath, data: Value) -> LedgerResult<()> {
        let mut docs = self.docs.lock().await;
        if docs.contains_key(path.as_str()) {
            return Err(LedgerError::Conflict(format!(
                "document already exists at {}",
                path
            )));
        }
        docs.insert(path.as_str().to_string(), data);
        Ok(())
    }

    async fn read(&self, path: &DocPath) -> LedgerResult<Option<Value>> {
        let docs = self.docs.lock().await;
        Ok(docs.get(path.as_str()).cloned())
    }

    async fn update(&self, path: &DocPath, patch: Value) -> LedgerResult<()> {
        let patch = match patch {
            Value::Object(map) => map,
            other => {
                return Err(LedgerError::Validation(format!(
                    "update patch must be an object, got {}",
                    other
                )))
            }
        };

        let mut docs = self.docs.lock().await;
        let doc = docs
            .get_mut(path.as_str())
            .ok_or_else(|| LedgerError::NotFound(format!("no document at {}", path)))?;
        match doc {
            Value::Object(existing) => {
                for (key, value) in patch {
                    existing.insert(key, value);
                }
                Ok(())
            }
            _ => Err(LedgerError::Store(format!(
                "document at {} is not an object",
                path
            ))),
        }
    }

    async fn list(&self, prefix: &DocPath) -> LedgerResult<Vec<(DocPath, Value)>> {
        let docs = self.docs.lock().await;
        let needle = format!("{}/", prefix.as_str());
        let mut out = Vec::new();
        for (key, value) in docs.range(needle.clone()..) {
            if !key.starts_with(&needle) {
                break;
            }
            out.push((DocPath(key.clone()), value.clone()));
        }
        Ok(out)
    }

    async fn transaction(&self, path: &DocPath, apply: TransactionFn) -> LedgerResult<Value> {
        let mut docs = self.docs.lock().await;
        let current = docs.get(path.as_str()).cloned();
        let next = apply(current)?;
        docs.insert(path.as_str().to_string(), next.clone());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> DocPath {
        let mut segments = raw.split('/');
        let mut path = DocPath::root(segments.next().unwrap()).unwrap();
        for segment in segments {
            path = path.child(segment).unwrap();
        }
        path
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let store = MemoryStore::new();
        let doc_path = path("loans/a");

        store.create(&doc_path, json!({"x": 1})).await.unwrap();
        let read = store.read(&doc_path).await.unwrap();
        assert_eq!(read, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let store = MemoryStore::new();
        let doc_path = path("loans/a");

        store.create(&doc_path, json!({"x": 1})).await.unwrap();
        let err = store.create(&doc_path, json!({"x": 2})).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT_ERROR");

        // first write untouched
        assert_eq!(store.read(&doc_path).await.unwrap(), Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_update_merges_top_level_keys() {
        let store = MemoryStore::new();
        let doc_path = path("loans/a");

        store
            .create(&doc_path, json!({"x": 1, "y": "keep"}))
            .await
            .unwrap();
        store
            .update(&doc_path, json!({"x": 2, "z": true}))
            .await
            .unwrap();

        assert_eq!(
            store.read(&doc_path).await.unwrap(),
            Some(json!({"x": 2, "y": "keep", "z": true}))
        );
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = MemoryStore::new();
        let err = store
            .update(&path("loans/missing"), json!({"x": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_returns_direct_children() {
        let store = MemoryStore::new();
        store.create(&path("loans/a"), json!(1)).await.unwrap();
        store.create(&path("loans/b"), json!(2)).await.unwrap();
        store.create(&path("employees/e1"), json!(3)).await.unwrap();

        let listed = store.list(&path("loans")).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0.as_str(), "loans/a");
        assert_eq!(listed[1].0.as_str(), "loans/b");
    }

    #[tokio::test]
    async fn test_transaction_replaces_document() {
        let store = MemoryStore::new();
        let doc_path = path("loans/a");
        store.create(&doc_path, json!({"count": 1})).await.unwrap();

        let next = store
            .transaction(
                &doc_path,
                Box::new(|current| {
                    let doc = current.unwrap();
                    let count = doc["count"].as_i64().unwrap();
                    Ok(json!({"count": count + 1}))
                }),
            )
            .await
            .unwrap();

        assert_eq!(next, json!({"count": 2}));
        assert_eq!(store.read(&doc_path).await.unwrap(), Some(next));
    }

    #[tokio::test]
    async fn test_aborted_transaction_writes_nothing() {
        let store = MemoryStore::new();
        let doc_path = path("loans/a");
        store.create(&doc_path, json!({"count": 1})).await.unwrap();

        let err = store
            .transaction(
                &doc_path,
                Box::new(|_| Err(LedgerError::Conflict("already resolved".to_string()))),
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "CONFLICT_ERROR");
        assert_eq!(
            store.read(&doc_path).await.unwrap(),
            Some(json!({"count": 1}))
        );
    }
}
