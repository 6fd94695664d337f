//! Path-addressed document store contract.
//!
//! Persistence is a consumed collaborator: the engine talks to a remote
//! document store through this trait and never assumes a single writer.
//! Every status transition and payment insertion goes through
//! [`DocumentStore::transaction`], which runs the precondition check and the
//! replacement write as one atomic unit against the addressed document.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{LedgerError, LedgerResult};

pub use memory::MemoryStore;

/// Slash-joined document path, e.g. `loans/8f14e45f-…`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath(String);

impl DocPath {
    /// A top-level collection path
    pub fn root(collection: &str) -> LedgerResult<Self> {
        Self::validate_segment(collection)?;
        Ok(DocPath(collection.to_string()))
    }

    /// Append one path segment
    pub fn child(&self, segment: &str) -> LedgerResult<Self> {
        Self::validate_segment(segment)?;
        Ok(DocPath(format!("{}/{}", self.0, segment)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate_segment(segment: &str) -> LedgerResult<()> {
        if segment.is_empty() || segment.contains('/') {
            return Err(LedgerError::Validation(format!(
                "invalid document path segment: '{}'",
                segment
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closure run inside [`DocumentStore::transaction`].
///
/// Receives the current document (absent if the path is empty) and returns
/// the full replacement document. Returning an error aborts the transaction
/// with nothing written.
pub type TransactionFn = Box<dyn FnOnce(Option<Value>) -> LedgerResult<Value> + Send>;

/// Path-addressed document store consumed by the engine
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document at `path`; fails with a conflict if one exists
    async fn create(&self, path: &DocPath, data: Value) -> LedgerResult<()>;

    /// Read the document at `path`, if any
    async fn read(&self, path: &DocPath) -> LedgerResult<Option<Value>>;

    /// Shallow-merge `patch` into the existing document at `path`
    async fn update(&self, path: &DocPath, patch: Value) -> LedgerResult<()>;

    /// Enumerate documents directly under `prefix`
    async fn list(&self, prefix: &DocPath) -> LedgerResult<Vec<(DocPath, Value)>>;

    /// Run `apply` with exclusive occupancy of `path` and atomically replace
    /// the document with its return value. The closure's view of the current
    /// document cannot go stale before the write lands.
    async fn transaction(&self, path: &DocPath, apply: TransactionFn) -> LedgerResult<Value>;
}
