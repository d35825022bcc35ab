use std::time::Duration;

use kernel::FileRecord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Object content together with the content type it was written with.
pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Durable blob storage addressed by key.
pub trait ObjectStore: Send + Sync {
    fn put_object(&self, key: &str, content_type: &str, data: &[u8]) -> Result<(), StoreError>;

    fn get_object(&self, key: &str) -> Result<StoredObject, StoreError>;

    /// Creates a URL that grants read access to the object until `expires_in` elapses.
    /// The object is not required to exist.
    fn presign_read(&self, key: &str, expires_in: Duration) -> Result<String, StoreError>;
}

/// Durable record storage with put and full scan.
pub trait MetadataStore: Send + Sync {
    fn put_record(&self, record: &FileRecord) -> Result<(), StoreError>;

    /// Returns every stored record. The order is whatever the backend yields.
    fn scan(&self) -> Result<Vec<FileRecord>, StoreError>;
}
