//! Storage backends for Zarr access.
//!
//! Local paths open a `FilesystemStore`. `s3://bucket/prefix` URLs open an
//! object_store S3 client wrapped for the synchronous zarrs API.

use std::path::PathBuf;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::prefix::PrefixStore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zarrs_filesystem::FilesystemStore;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};
use zarrs_storage::ReadableListableStorage;

use crate::error::{LoadError, Result};

/// Blocking executor that works from within a tokio runtime.
///
/// `block_in_place` moves the current task off the async worker thread so the
/// runtime handle can drive the future without nesting runtimes. Requires a
/// multi-threaded runtime.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// Connection options for S3-compatible object stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Options {
    /// Custom endpoint URL (e.g. "https://object-store.example.org").
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Skip request signing (public buckets).
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Region; object_store falls back to us-east-1.
    #[serde(default)]
    pub region: Option<String>,
}

/// Parsed dataset location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetLocation {
    Local(PathBuf),
    S3 { bucket: String, prefix: String },
}

impl DatasetLocation {
    pub fn parse(location: &str) -> Result<Self> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(LoadError::InvalidLocation(location.to_string()));
        }
        if let Some(rest) = trimmed.strip_prefix("s3://") {
            let rest = rest.trim_end_matches('/');
            let (bucket, prefix) = match rest.split_once('/') {
                Some((bucket, prefix)) => (bucket, prefix),
                None => (rest, ""),
            };
            if bucket.is_empty() {
                return Err(LoadError::InvalidLocation(location.to_string()));
            }
            return Ok(Self::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            });
        }
        if trimmed.contains("://") && !trimmed.starts_with("file://") {
            return Err(LoadError::InvalidLocation(location.to_string()));
        }
        let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        Ok(Self::Local(PathBuf::from(path)))
    }
}

/// Storage type alias for S3-backed Zarr access (sync adapter).
pub type S3Storage = AsyncToSyncStorageAdapter<AsyncObjectStore<PrefixStore<object_store::aws::AmazonS3>>, TokioBlockOn>;

/// Open a readable, listable store for the given location.
pub fn open_storage(location: &DatasetLocation, s3: &S3Options) -> Result<ReadableListableStorage> {
    match location {
        DatasetLocation::Local(path) => {
            if !path.is_dir() {
                return Err(LoadError::open_failed(format!(
                    "{} is not a directory",
                    path.display()
                )));
            }
            let store = FilesystemStore::new(path)
                .map_err(|e| LoadError::open_failed(e.to_string()))?;
            debug!(path = %path.display(), "Opened filesystem store");
            Ok(Arc::new(store))
        }
        DatasetLocation::S3 { bucket, prefix } => Ok(Arc::new(create_s3_storage(bucket, prefix, s3)?)),
    }
}

/// Create an S3 storage backend rooted at `prefix` inside `bucket`.
pub fn create_s3_storage(bucket: &str, prefix: &str, options: &S3Options) -> Result<S3Storage> {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

    if let Some(endpoint) = &options.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(endpoint.starts_with("http://"));
    }
    if let Some(region) = &options.region {
        builder = builder.with_region(region);
    }
    if options.anonymous {
        builder = builder.with_skip_signature(true);
    } else {
        if let Some(key) = &options.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &options.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
    }

    let s3 = builder
        .build()
        .map_err(|e| LoadError::open_failed(format!("Failed to create S3 client: {}", e)))?;

    debug!(bucket, prefix, anonymous = options.anonymous, "Created S3 client");

    let store = PrefixStore::new(s3, prefix);
    let async_store = Arc::new(AsyncObjectStore::new(store));
    Ok(AsyncToSyncStorageAdapter::new(async_store, TokioBlockOn))
}
