//! Remote object storage interface used by file uploads.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ModelError, ModelResult};

pub const S3_STORAGE: &str = "aws_s3";

pub trait ObjectStore {
    /// Stores `bytes` under `key`; `false` means the store rejected the upload.
    fn upload_file(&self, key: &str, bytes: &[u8], bucket: &str) -> bool;

    fn delete_files(&self, keys: &[String], bucket: &str) -> ModelResult<()>;

    fn default_bucket(&self) -> Option<String> {
        None
    }
}

/// Where an upload input persists its files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default)]
    pub key_prefix: String,
}

impl StorageConfig {
    pub fn s3(bucket: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            kind: S3_STORAGE.to_string(),
            bucket: Some(bucket.into()),
            key_prefix: key_prefix.into(),
        }
    }
}

/// In-memory object store keyed by `(bucket, key)`.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RefCell<BTreeMap<(String, String), Vec<u8>>>,
    reject_uploads: Cell<bool>,
    reject_deletes: Cell<bool>,
    bucket: Option<String>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn reject_uploads(&self, reject: bool) {
        self.reject_uploads.set(reject);
    }

    pub fn reject_deletes(&self, reject: bool) {
        self.reject_deletes.set(reject);
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .borrow()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .borrow()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn upload_file(&self, key: &str, bytes: &[u8], bucket: &str) -> bool {
        if self.reject_uploads.get() {
            debug!(bucket, key, "upload rejected");
            return false;
        }
        self.objects
            .borrow_mut()
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        true
    }

    fn delete_files(&self, keys: &[String], bucket: &str) -> ModelResult<()> {
        if self.reject_deletes.get() {
            return Err(ModelError::StorageOperation(format!(
                "delete of {} object(s) in {} rejected",
                keys.len(),
                bucket
            )));
        }
        let mut objects = self.objects.borrow_mut();
        for key in keys {
            objects.remove(&(bucket.to_string(), key.clone()));
        }
        Ok(())
    }

    fn default_bucket(&self) -> Option<String> {
        self.bucket.clone()
    }
}
