//! Object-storage access for input logs and Parquet output
//!
//! One [`Storage`] handle wraps one root (an S3 bucket prefix or a local
//! directory). Credentials are passed in explicitly by the caller; this module
//! never reads or mutates process environment state for secrets.

use crate::config::Credentials;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// A storage root, either an S3 bucket prefix or a local directory
#[derive(Debug, Clone)]
pub struct Storage {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket (empty for local roots)
    prefix: String,
    /// Original URL scheme for logging
    scheme: String,
}

impl Storage {
    /// Open an existing storage root from a URL or local path
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` or `s3a://bucket/path/` - AWS S3
    /// - `/local/path/` or `./path/` - Local filesystem
    ///
    /// A local path that does not exist is an error. Use [`Storage::create`]
    /// for destinations that should be brought into existence.
    pub fn open(url: &str, credentials: Option<&Credentials>) -> Result<Self> {
        if url.starts_with("s3://") || url.starts_with("s3a://") {
            Self::open_s3(url, credentials)
        } else {
            Self::open_local(url, false)
        }
    }

    /// Open a storage root for writing, creating a local root if missing
    pub fn create(url: &str, credentials: Option<&Credentials>) -> Result<Self> {
        if url.starts_with("s3://") || url.starts_with("s3a://") {
            Self::open_s3(url, credentials)
        } else {
            Self::open_local(url, true)
        }
    }

    /// Open an S3 bucket root with explicit credentials
    fn open_s3(url: &str, credentials: Option<&Credentials>) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("s3a://")
            .or_else(|| url.strip_prefix("s3://"))
            .ok_or_else(|| Error::config(format!("Invalid s3 URL: {url}")))?;

        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                without_scheme[idx + 1..].trim_end_matches('/').to_string(),
            ),
            None => (without_scheme, String::new()),
        };

        let mut builder = AmazonS3Builder::new().with_bucket_name(bucket);
        if let Some(creds) = credentials {
            builder = builder
                .with_access_key_id(&creds.access_key_id)
                .with_secret_access_key(&creds.secret_access_key);
            if let Some(region) = &creds.region {
                builder = builder.with_region(region);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "s3".to_string(),
        })
    }

    /// Open a local directory root
    fn open_local(path: &str, create: bool) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        if create {
            std::fs::create_dir_all(path)
                .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
        }

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
        })
    }

    /// Get the scheme (s3, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Resolve a path relative to the root prefix
    fn resolve(&self, path: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(path)
        } else {
            ObjectPath::from(format!("{}/{path}", self.prefix))
        }
    }

    // ============================================================================
    // Reading
    // ============================================================================

    /// List `.json` files under a prefix at an exact directory depth
    ///
    /// `dir_levels` counts the directories between the prefix and the file, so
    /// `list_json("log_data", 2)` matches `log_data/2018/11/events.json` and
    /// `list_json("song_data/A/A/A", 0)` matches files directly under that
    /// subdirectory. Zero matches is a hard error: the job has nothing to do.
    pub async fn list_json(&self, prefix: &str, dir_levels: usize) -> Result<Vec<ObjectPath>> {
        let full_prefix = self.resolve(prefix);
        let prefix_parts = full_prefix.parts().count();

        let mut paths: Vec<ObjectPath> = self
            .store
            .list(Some(&full_prefix))
            .try_filter_map(|meta| {
                let keep = meta.location.parts().count() == prefix_parts + dir_levels + 1
                    && meta.location.as_ref().ends_with(".json");
                futures::future::ok(keep.then_some(meta.location))
            })
            .try_collect()
            .await?;

        if paths.is_empty() {
            return Err(Error::EmptyInput {
                prefix: prefix.to_string(),
            });
        }

        // Deterministic processing order across reruns
        paths.sort();
        debug!(prefix, files = paths.len(), "Listed input files");
        Ok(paths)
    }

    /// Read one newline-delimited JSON file into raw records
    pub async fn read_ndjson(&self, path: &ObjectPath) -> Result<Vec<serde_json::Value>> {
        let data = self.store.get(path).await?.bytes().await?;
        let text = std::str::from_utf8(&data).map_err(|e| {
            Error::output(format!("File {path} is not valid UTF-8: {e}"))
        })?;

        let mut records = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }

    // ============================================================================
    // Writing
    // ============================================================================

    /// Delete every object under a prefix (overwrite semantics)
    pub async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let full_prefix = self.resolve(prefix);
        let existing: Vec<ObjectPath> = self
            .store
            .list(Some(&full_prefix))
            .map_ok(|meta| meta.location)
            .try_collect()
            .await?;

        for path in existing {
            self.store.delete(&path).await?;
        }
        Ok(())
    }

    /// Write bytes to a path relative to the root
    pub async fn put(&self, path: &str, data: Bytes) -> Result<String> {
        let full_path = self.resolve(path);
        self.store.put(&full_path, data.into()).await?;
        Ok(format!("{}://{full_path}", self.scheme))
    }

    /// Read bytes from a path relative to the root
    pub async fn get(&self, path: &str) -> Result<Bytes> {
        let full_path = self.resolve(path);
        Ok(self.store.get(&full_path).await?.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().to_str().unwrap(), None).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_open_local() {
        let (_dir, storage) = local_storage();
        assert_eq!(storage.scheme(), "file");
    }

    #[test]
    fn test_open_missing_local_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_root");
        let missing = missing.to_str().unwrap();

        let err = Storage::open(missing, None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        // A write root is brought into existence instead
        let storage = Storage::create(missing, None).unwrap();
        assert_eq!(storage.scheme(), "file");
    }

    #[tokio::test]
    async fn test_list_json_depth_filter() {
        let (_dir, storage) = local_storage();
        storage
            .put("log_data/2018/11/events.json", Bytes::from("{}\n"))
            .await
            .unwrap();
        storage
            .put("log_data/2018/11/extra/deep.json", Bytes::from("{}\n"))
            .await
            .unwrap();
        storage
            .put("log_data/2018/shallow.json", Bytes::from("{}\n"))
            .await
            .unwrap();
        storage
            .put("log_data/2018/11/notes.txt", Bytes::from("x"))
            .await
            .unwrap();

        let paths = storage.list_json("log_data", 2).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].as_ref().ends_with("2018/11/events.json"));
    }

    #[tokio::test]
    async fn test_list_json_empty_is_error() {
        let (_dir, storage) = local_storage();
        let err = storage.list_json("song_data/A/A/A", 0).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput { .. }));
    }

    #[tokio::test]
    async fn test_read_ndjson_skips_blank_lines() {
        let (_dir, storage) = local_storage();
        storage
            .put(
                "song_data/A/A/A/part.json",
                Bytes::from("{\"a\": 1}\n\n{\"a\": 2}\n"),
            )
            .await
            .unwrap();

        let paths = storage.list_json("song_data/A/A/A", 0).await.unwrap();
        let records = storage.read_ndjson(&paths[0]).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["a"], 2);
    }

    #[tokio::test]
    async fn test_delete_prefix_removes_everything() {
        let (_dir, storage) = local_storage();
        storage
            .put("songs.parquet/song_id=S1/data.parquet", Bytes::from("x"))
            .await
            .unwrap();
        storage
            .put("songs.parquet/song_id=S2/data.parquet", Bytes::from("y"))
            .await
            .unwrap();

        storage.delete_prefix("songs.parquet").await.unwrap();
        assert!(storage
            .get("songs.parquet/song_id=S1/data.parquet")
            .await
            .is_err());
    }
}
