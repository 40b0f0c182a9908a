use super::ObjectStore;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem-backed object store: one directory per container, one file
/// per key. Keys may contain `/` separators (the processed-data prefix),
/// which map onto subdirectories.
pub struct LocalObjectStore {
    container_dir: PathBuf,
}

impl LocalObjectStore {
    /// Opens the container directory under `root`, creating it if needed.
    ///
    /// # Errors
    /// Returns a `Storage` error when the directory cannot be created or
    /// entered. Callers treat this as fatal to the run: no per-object
    /// operation can succeed without the handle.
    pub async fn open(root: &Path, container: &str) -> Result<Self> {
        let container_dir = root.join(container);
        fs::create_dir_all(&container_dir).await.map_err(|e| {
            PipelineError::Storage(format!("cannot open container '{}': {}", container, e))
        })?;
        Ok(Self { container_dir })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        // Keys are flat names or prefix/name pairs; anything that could
        // escape the container directory is rejected.
        let escapes = key.is_empty()
            || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
        if escapes {
            return Err(PipelineError::Storage(format!("invalid object key '{}'", key)));
        }
        Ok(self.container_dir.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write a sibling temp file and rename it into place so a partial
        // write is never observable under `key`.
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PipelineError::Storage(format!("invalid object key '{}'", key)))?;
        let tmp = path.with_file_name(format!("{}.tmp", file_name));

        fs::write(&tmp, bytes)
            .await
            .map_err(|e| PipelineError::Storage(format!("cannot write '{}': {}", key, e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| PipelineError::Storage(format!("cannot commit '{}': {}", key, e)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PipelineError::Storage(format!(
                "cannot read '{}': {}",
                key, e
            ))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.container_dir.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(PipelineError::Storage(format!(
                        "cannot list '{}': {}",
                        dir.display(),
                        e
                    )))
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&self.container_dir) {
                    let key = relative.to_string_lossy().into_owned();
                    // A crashed run can leave a temp file behind; it is not
                    // an object.
                    if key.starts_with(prefix) && !key.ends_with(".tmp") {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store(dir: &tempfile::TempDir) -> LocalObjectStore {
        LocalObjectStore::open(dir.path(), "market-data").await.unwrap()
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        store.put("AAPL_data.csv", b"date,close\n").await.unwrap();
        let bytes = store.get("AAPL_data.csv").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(b"date,close\n".as_ref()));
    }

    #[tokio::test]
    async fn test_get_absent_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        assert!(store.get("TSLA_data.csv").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        store.put("AAPL_data.csv", b"first").await.unwrap();
        store.put("AAPL_data.csv", b"second").await.unwrap();
        let bytes = store.get("AAPL_data.csv").await.unwrap().unwrap();
        assert_eq!(bytes, b"second");
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        store.put("TSLA_data.csv", b"x").await.unwrap();
        store.put("AAPL_data.csv", b"x").await.unwrap();
        store.put("processed/enriched_data.csv", b"x").await.unwrap();

        let all = store.list("").await.unwrap();
        assert_eq!(
            all,
            vec!["AAPL_data.csv", "TSLA_data.csv", "processed/enriched_data.csv"]
        );

        let processed = store.list("processed/").await.unwrap();
        assert_eq!(processed, vec!["processed/enriched_data.csv"]);
    }

    #[tokio::test]
    async fn test_escaping_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        assert!(store.put("../outside.csv", b"x").await.is_err());
        assert!(store.get("").await.is_err());
    }
}
