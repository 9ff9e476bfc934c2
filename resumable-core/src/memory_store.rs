use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::io::AsyncWrite;

use crate::store::{join_key, ObjectWriter};
use crate::{bytes_stream, ByteStream, ResumableError, ResumableResult, UploadStore};

type Objects = Arc<Mutex<BTreeMap<String, Vec<u8>>>>;

/// In-process store, shared between clones
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Objects,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently stored
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    /// Copy of an object's bytes
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }

    /// Store bytes directly, bypassing the streaming API
    pub fn insert<K: Into<String>, V: Into<Vec<u8>>>(&self, key: K, value: V) {
        self.objects.lock().insert(key.into(), value.into());
    }

    fn exists(objects: &BTreeMap<String, Vec<u8>>, key: &str) -> bool {
        objects.contains_key(key) || Self::has_children(objects, key)
    }

    fn has_children(objects: &BTreeMap<String, Vec<u8>>, key: &str) -> bool {
        let dir = join_key(key, "");
        objects
            .range(dir.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&dir))
    }
}

#[async_trait]
impl UploadStore for MemoryStore {
    async fn has(&self, key: &str) -> ResumableResult<bool> {
        Ok(Self::exists(&self.objects.lock(), key))
    }

    async fn write(&self, key: &str, mut stream: ByteStream) -> ResumableResult<u64> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        let size = data.len() as u64;
        self.objects.lock().insert(key.to_string(), data);
        Ok(size)
    }

    async fn create_exclusive(&self, key: &str) -> ResumableResult<ObjectWriter> {
        let mut objects = self.objects.lock();
        if Self::exists(&objects, key) {
            return Err(ResumableError::already_exists(key));
        }
        objects.insert(key.to_string(), Vec::new());
        Ok(Box::pin(MemoryWriter {
            objects: self.objects.clone(),
            key: key.to_string(),
        }))
    }

    async fn read(&self, key: &str) -> ResumableResult<ByteStream> {
        let data = self
            .get(key)
            .ok_or_else(|| ResumableError::not_found(key))?;
        Ok(bytes_stream(data))
    }

    async fn list(&self, prefix: &str) -> ResumableResult<Vec<String>> {
        let dir = join_key(prefix, "");
        let objects = self.objects.lock();
        Ok(objects
            .range(dir.clone()..)
            .take_while(|(k, _)| k.starts_with(&dir))
            .filter(|(k, _)| !k[dir.len()..].contains('/'))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn delete(&self, key: &str) -> ResumableResult<()> {
        let mut objects = self.objects.lock();
        if objects.remove(key).is_none() && Self::has_children(&objects, key) {
            return Err(ResumableError::backend(io::Error::new(
                io::ErrorKind::Other,
                format!("prefix {key} is not empty"),
            )));
        }
        Ok(())
    }
}

/// Appends straight into the shared map
struct MemoryWriter {
    objects: Objects,
    key: String,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut objects = self.objects.lock();
        match objects.get_mut(&self.key) {
            Some(data) => {
                data.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} was removed while writing", self.key),
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
