//! Cache object storage.
//!
//! Cached payloads live in an `object_store` backend under path-derived keys.
//! Expiry is advisory: it is written as object metadata and checked by the
//! reader, never enforced by deletion.

use crate::config::{StorageConfig, StorageProvider};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::aws::AmazonS3Builder;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, path::Path as StoragePath,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

const EXPIRES_METADATA: &str = "expires";
const ETAG_METADATA: &str = "content-etag";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage configuration error: {0}")]
    Configuration(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// A cached payload as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub e_tag: String,
    pub expires: Option<DateTime<Utc>>,
}

impl CacheObject {
    /// Fresh when no expiry is set or the expiry is still ahead of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_none_or(|expires| expires > now)
    }
}

/// Quoted SHA-256 hex digest of `body`, used as the response ETag.
pub fn content_etag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `StorageError::NotFound` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<CacheObject>;

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

/// Cache objects in any `object_store` backend, with expiry and ETag as attributes.
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    pub bucket: String,
}

impl StorageClient {
    /// Wrap an already-configured backend.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String) -> Self {
        Self { store, bucket }
    }

    /// Process-local store; contents vanish on restart.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
            bucket: "tideserver-local".to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.provider {
            StorageProvider::Memory => Ok(Self::in_memory()),
            StorageProvider::S3 => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

                if let Some(region) = &config.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let (Some(access_key), Some(secret_key)) =
                    (&config.access_key, &config.secret_key)
                {
                    builder = builder
                        .with_access_key_id(access_key)
                        .with_secret_access_key(secret_key);
                }

                let store = builder
                    .build()
                    .map_err(|e| StorageError::Configuration(e.to_string()))?;

                Ok(Self::new(Arc::new(store), config.bucket.clone()))
            }
        }
    }
}

#[async_trait]
impl CacheStore for StorageClient {
    async fn get(&self, key: &str) -> Result<CacheObject> {
        let path = StoragePath::from(key);

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let attributes = result.attributes.clone();
        let store_e_tag = result.meta.e_tag.clone();
        let body = result.bytes().await?;

        let expires = attribute(&attributes, &Attribute::Metadata(EXPIRES_METADATA.into()))
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .unwrap_or_else(|e| {
                        tracing::warn!(key, raw, error = %e, "Unreadable expiry; treating object as stale");
                        DateTime::<Utc>::MIN_UTC
                    })
            });

        let e_tag = attribute(&attributes, &Attribute::Metadata(ETAG_METADATA.into()))
            .map(str::to_string)
            .or(store_e_tag)
            .unwrap_or_else(|| content_etag(&body));

        tracing::debug!(key, size = body.len(), "Read from storage");

        Ok(CacheObject {
            content_type: attribute(&attributes, &Attribute::ContentType).map(str::to_string),
            body,
            e_tag,
            expires,
        })
    }

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let path = StoragePath::from(key);
        let size = body.len();

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        attributes.insert(
            Attribute::Metadata(ETAG_METADATA.into()),
            AttributeValue::from(content_etag(&body)),
        );
        if let Some(expires) = expires {
            attributes.insert(
                Attribute::Metadata(EXPIRES_METADATA.into()),
                AttributeValue::from(expires.to_rfc3339()),
            );
        }

        self.store
            .put_opts(&path, body.into(), PutOptions::from(attributes))
            .await?;

        tracing::debug!(key, size, ?expires, "Stored to cache");
        Ok(())
    }
}

fn attribute<'a>(attributes: &'a Attributes, key: &Attribute) -> Option<&'a str> {
    attributes.get(key).map(AsRef::<str>::as_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let storage = StorageClient::in_memory();
        assert!(matches!(
            storage.get("stations").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_then_get_keeps_metadata() {
        let storage = StorageClient::in_memory();
        let expires = Utc.with_ymd_and_hms(2020, 3, 31, 0, 0, 0).unwrap();
        let body = Bytes::from_static(b"{\"Stations\":[]}");

        storage
            .put("v1/stations", body.clone(), "application/json", Some(expires))
            .await
            .unwrap();

        let object = storage.get("v1/stations").await.unwrap();
        assert_eq!(object.body, body);
        assert_eq!(object.content_type.as_deref(), Some("application/json"));
        assert_eq!(object.expires, Some(expires));
        assert_eq!(object.e_tag, content_etag(&body));
    }

    #[tokio::test]
    async fn test_put_without_expiry() {
        let storage = StorageClient::in_memory();
        storage
            .put("k", Bytes::from_static(b"[]"), "application/json", None)
            .await
            .unwrap();

        let object = storage.get("k").await.unwrap();
        assert_eq!(object.expires, None);
        assert!(object.is_fresh(Utc::now()));
    }

    #[test]
    fn test_freshness() {
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut object = CacheObject {
            body: Bytes::new(),
            content_type: None,
            e_tag: content_etag(b""),
            expires: Some(now + Duration::seconds(1)),
        };
        assert!(object.is_fresh(now));

        object.expires = Some(now);
        assert!(!object.is_fresh(now));
    }

    #[test]
    fn test_content_etag_is_quoted_sha256() {
        let etag = content_etag(b"abc");
        assert_eq!(
            etag,
            "\"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad\""
        );
    }
}
