use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::{ByteStream, ResumableResult};

/// Writable handle returned by [`UploadStore::create_exclusive`]
pub type ObjectWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Byte-addressable storage the upload engine runs on.
///
/// Keys are `/`-separated. A key prefix behaves like a directory: it
/// exists while something is stored under it, and deleting it only
/// succeeds once it is empty. Implementations must give per-key
/// atomicity; the engine holds no locks of its own.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Whether an object, or a non-empty prefix, exists at `key`
    async fn has(&self, key: &str) -> ResumableResult<bool>;

    /// Store a stream at `key`, creating parent prefixes as needed.
    ///
    /// Replaces any existing object. A failed write must not leave a
    /// partial object behind. Returns the number of bytes written.
    async fn write(&self, key: &str, stream: ByteStream) -> ResumableResult<u64>;

    /// Create `key` for writing, failing with
    /// [`ResumableError::AlreadyExists`](crate::ResumableError::AlreadyExists)
    /// if anything is already stored there.
    async fn create_exclusive(&self, key: &str) -> ResumableResult<ObjectWriter>;

    /// Open an object as a stream
    async fn read(&self, key: &str) -> ResumableResult<ByteStream>;

    /// Objects stored directly under `prefix`, as full keys
    async fn list(&self, prefix: &str) -> ResumableResult<Vec<String>>;

    /// Delete an object or an empty prefix. Missing keys are not an error.
    async fn delete(&self, key: &str) -> ResumableResult<()>;
}

/// Join two key segments with a single `/`
pub fn join_key(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

/// Last segment of a key
pub fn key_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
