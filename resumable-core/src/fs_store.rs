use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::store::{join_key, key_name, ObjectWriter};
use crate::{ByteStream, ResumableError, ResumableResult, UploadStore};

/// Store backed by a local directory.
///
/// Keys are resolved relative to `root`; an absolute key is used as is.
#[derive(Debug, Clone)]
pub struct LocalFsStore {
    root: PathBuf,
}

impl LocalFsStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the process working directory
    pub fn current_dir() -> ResumableResult<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a key
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn ensure_parent(path: &Path) -> ResumableResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn copy_into(path: &Path, mut stream: ByteStream) -> ResumableResult<u64> {
        let mut file = fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl UploadStore for LocalFsStore {
    async fn has(&self, key: &str) -> ResumableResult<bool> {
        Ok(fs::try_exists(self.path(key)).await?)
    }

    async fn write(&self, key: &str, stream: ByteStream) -> ResumableResult<u64> {
        let path = self.path(key);
        Self::ensure_parent(&path).await?;

        // Stage next to the target so the rename stays on one filesystem.
        let staging_name = format!(".{}.{}.upload", key_name(key), Uuid::new_v4().simple());
        let staging = path.with_file_name(staging_name);
        match Self::copy_into(&staging, stream).await {
            Ok(written) => {
                if let Err(e) = fs::rename(&staging, &path).await {
                    let _ = fs::remove_file(&staging).await;
                    return Err(e.into());
                }
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&staging).await;
                Err(e)
            }
        }
    }

    async fn create_exclusive(&self, key: &str) -> ResumableResult<ObjectWriter> {
        let path = self.path(key);
        Self::ensure_parent(&path).await?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => ResumableError::already_exists(key),
                _ => e.into(),
            })?;
        Ok(Box::pin(file))
    }

    async fn read(&self, key: &str) -> ResumableResult<ByteStream> {
        let file = fs::File::open(self.path(key)).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ResumableError::not_found(key),
            _ => e.into(),
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn list(&self, prefix: &str) -> ResumableResult<Vec<String>> {
        let mut entries = match fs::read_dir(self.path(prefix)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                keys.push(join_key(prefix, name));
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> ResumableResult<()> {
        let path = self.path(key);
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            fs::remove_dir(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }
}
