//! Object store sink (GCS, S3, R2, Azure, local, in-memory)

use super::sink::{StorageError, StorageSink};
use crate::config::CredentialSource;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// Storage sink backed by an `object_store` implementation
///
/// The sink owns a root URL (e.g. `gs://bucket` or `gs://bucket/exports`).
/// Keys handed to `get`/`put` are fully-qualified and must live under
/// that root; the remainder becomes the object path inside the store.
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Root URL keys are resolved against
    root: String,
    /// Path prefix within the bucket/container
    prefix: String,
    /// URL scheme (gs, s3, r2, az, file, memory)
    scheme: String,
}

impl ObjectStoreSink {
    /// Parse a root URL and create the matching object store
    ///
    /// Supported formats:
    /// - `gs://bucket/path` - Google Cloud Storage
    /// - `s3://bucket/path` - AWS S3
    /// - `r2://bucket/path` - Cloudflare R2 (S3-compatible)
    /// - `az://container/path` - Azure Blob Storage
    /// - `memory://name` - process-local in-memory store
    /// - `/local/path` or `file:///local/path` - Local filesystem
    pub fn parse(url: &str, credentials: &CredentialSource) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(Error::config("storage root URL must not be empty"));
        }
        if url.starts_with("gs://") {
            Self::parse_gcs(url, credentials)
        } else if url.starts_with("s3://") {
            Self::parse_s3(url, false, credentials)
        } else if url.starts_with("r2://") {
            Self::parse_s3(url, true, credentials)
        } else if url.starts_with("az://") {
            Self::parse_azure(url, credentials)
        } else if url.starts_with("memory://") {
            Ok(Self::in_memory(url))
        } else {
            Self::parse_local(url)
        }
    }

    /// Create an in-memory sink rooted at `root`
    pub fn in_memory(root: &str) -> Self {
        Self::from_store(root, "memory", Arc::new(InMemory::new()))
    }

    /// Wrap an existing store; keys are resolved against `root`
    pub fn from_store(root: &str, scheme: &str, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            root: root.trim_end_matches('/').to_string(),
            prefix: String::new(),
            scheme: scheme.to_string(),
        }
    }

    /// Split `scheme://bucket/prefix` into bucket and prefix
    fn split_bucket<'a>(url: &'a str, scheme: &str) -> Result<(&'a str, String)> {
        let without_scheme = url
            .strip_prefix(&format!("{scheme}://"))
            .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;

        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                without_scheme[idx + 1..].trim_end_matches('/').to_string(),
            ),
            None => (without_scheme, String::new()),
        };

        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in URL: {url}")));
        }
        Ok((bucket, prefix))
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str, credentials: &CredentialSource) -> Result<Self> {
        let (bucket, prefix) = Self::split_bucket(url, "gs")?;

        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
        if let CredentialSource::ServiceAccountFile { path } = credentials {
            builder = builder.with_service_account_path(path.to_string_lossy());
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            root: url.trim_end_matches('/').to_string(),
            prefix,
            scheme: "gs".to_string(),
        })
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool, credentials: &CredentialSource) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        if let CredentialSource::ServiceAccountFile { .. } = credentials {
            return Err(Error::config(format!(
                "service account files are only supported for gs:// roots, not {scheme}://"
            )));
        }
        let (bucket, prefix) = Self::split_bucket(url, scheme)?;

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // R2 endpoint: https://<account_id>.r2.cloudflarestorage.com
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            root: url.trim_end_matches('/').to_string(),
            prefix,
            scheme: scheme.to_string(),
        })
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str, credentials: &CredentialSource) -> Result<Self> {
        if let CredentialSource::ServiceAccountFile { .. } = credentials {
            return Err(Error::config(
                "service account files are only supported for gs:// roots, not az://",
            ));
        }
        let (container, prefix) = Self::split_bucket(url, "az")?;

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            root: url.trim_end_matches('/').to_string(),
            prefix,
            scheme: "az".to_string(),
        })
    }

    /// Parse local filesystem path
    fn parse_local(url: &str) -> Result<Self> {
        let path = url.strip_prefix("file://").unwrap_or(url);

        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            root: url.trim_end_matches('/').to_string(),
            prefix: String::new(),
            scheme: "file".to_string(),
        })
    }

    /// Root URL keys are resolved against
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Get the scheme (gs, s3, r2, az, file, memory)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Check if this is a cloud destination
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "memory")
    }

    /// Resolve a fully-qualified key to a path inside the store
    fn object_path(&self, key: &str) -> std::result::Result<ObjectPath, StorageError> {
        let invalid = || StorageError::InvalidKey {
            key: key.to_string(),
            root: self.root.clone(),
        };

        let relative = key
            .strip_prefix(&self.root)
            .filter(|rest| rest.starts_with('/'))
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(invalid)?;

        let full = if self.prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{relative}", self.prefix)
        };

        ObjectPath::parse(&full).map_err(|_| invalid())
    }
}

/// Classify an `object_store` failure for retry decisions
fn classify(key: &str, err: &object_store::Error) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound {
            key: key.to_string(),
        },
        object_store::Error::AlreadyExists { .. }
        | object_store::Error::Precondition { .. }
        | object_store::Error::NotSupported { .. }
        | object_store::Error::NotImplemented
        | object_store::Error::InvalidPath { .. }
        | object_store::Error::UnknownConfigurationKey { .. } => {
            StorageError::permanent(key, err.to_string())
        }
        _ => StorageError::transient(key, err.to_string()),
    }
}

#[async_trait]
impl StorageSink for ObjectStoreSink {
    async fn get(&self, key: &str) -> std::result::Result<Bytes, StorageError> {
        let path = self.object_path(key)?;
        debug!("GET {}://{}", self.scheme, path);

        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| classify(key, &e))?;
        result.bytes().await.map_err(|e| classify(key, &e))
    }

    async fn put(&self, key: &str, data: Bytes) -> std::result::Result<(), StorageError> {
        let path = self.object_path(key)?;
        debug!("PUT {}://{} ({} bytes)", self.scheme, path, data.len());

        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| classify(key, &e))?;
        Ok(())
    }
}
