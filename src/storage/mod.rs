pub mod local;

pub use local::LocalObjectStore;

use crate::error::Result;
use async_trait::async_trait;

/// Durable key-addressed byte storage.
///
/// The pipeline's two halves are decoupled through this capability:
/// ingestion writes one raw blob per symbol, enrichment reads them all back
/// and writes one processed artifact. [`LocalObjectStore`] backs it with a
/// directory tree; a cloud blob container would implement the same trait.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `key`, replacing any existing object.
    ///
    /// The write is atomic at single-object granularity: a reader never
    /// observes a partially uploaded object under `key`.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Reads the object under `key`, or `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Lists the keys under `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
