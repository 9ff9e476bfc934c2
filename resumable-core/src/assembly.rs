use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::sanitize::sanitize_filename;
use crate::store::{key_name, ObjectWriter};
use crate::{Assembly, ByteStream, ResumableEngine, ResumableError, ResumableResult, UploadedFile};

/// Chunk number encoded in a slot key, if the key belongs to `safe_filename`.
///
/// Slot names are `<safe_filename>.<digits>`; staging files and slots of
/// other files in the same session yield `None`.
pub fn chunk_number_of(key: &str, safe_filename: &str) -> Option<u32> {
    let digits = key_name(key)
        .strip_prefix(safe_filename)?
        .strip_prefix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl ResumableEngine {
    /// Concatenate chunks `1..=total_chunks` of a complete upload into its
    /// final file, then remove every slot of that file.
    ///
    /// Never overwrites: if the target exists, or another caller creates it
    /// first, [`Assembly::AlreadyExists`] is returned and the chunks stay
    /// where they are. On any storage error the chunks are kept too. Slots
    /// numbered above `total_chunks` are never appended.
    pub async fn assemble(
        &self,
        identifier: &str,
        filename: &str,
        total_chunks: u32,
    ) -> ResumableResult<Assembly> {
        let final_name = self.final_filename(filename);
        let final_key = self.final_key(filename);
        let file = UploadedFile::new(final_key.clone(), final_name, filename);

        if self.store.has(&final_key).await? {
            warn!(key = %final_key, "Final file already exists, leaving chunks in place");
            return Ok(Assembly::AlreadyExists(file));
        }

        let chunk_dir = self.chunk_dir(identifier);
        let slots = self.sorted_chunk_keys(&chunk_dir, filename).await?;
        let chunks: Vec<String> = slots
            .iter()
            .filter(|(n, _)| *n <= total_chunks)
            .map(|(_, key)| key.clone())
            .collect();
        if total_chunks == 0 || chunks.len() != total_chunks as usize {
            if self.store.has(&final_key).await? {
                return Ok(Assembly::AlreadyExists(file));
            }
            return Err(ResumableError::not_found(chunk_dir));
        }

        let mut writer = match self.store.create_exclusive(&final_key).await {
            Ok(writer) => writer,
            Err(ResumableError::AlreadyExists { .. }) => {
                debug!(key = %final_key, "Lost the race to create the final file");
                return Ok(Assembly::AlreadyExists(file));
            }
            Err(e) => return Err(e),
        };

        debug!(key = %final_key, chunks = chunks.len(), "Beginning of create file from chunks");
        let written = match self.copy_chunks(&chunks, &mut writer).await {
            Ok(written) => written,
            Err(e) => {
                drop(writer);
                if let Err(cleanup) = self.store.delete(&final_key).await {
                    warn!(
                        key = %final_key,
                        error = %cleanup,
                        "Failed to remove partial final file"
                    );
                }
                return Err(e);
            }
        };
        drop(writer);

        if !self.store.has(&final_key).await? {
            return Err(ResumableError::not_found(final_key));
        }

        let stale = slots.len() - chunks.len();
        if stale > 0 {
            debug!(dir = %chunk_dir, stale, "Removing slots beyond the last chunk");
        }
        let all_slots: Vec<String> = slots.into_iter().map(|(_, key)| key).collect();
        self.cleanup_chunks(&chunk_dir, &all_slots).await;
        info!(key = %final_key, size_bytes = written, "Created file from chunks");

        Ok(Assembly::Created(file.with_size(written)))
    }

    /// Slots of `filename` under `chunk_dir` with their chunk numbers, in
    /// chunk-number order
    pub async fn sorted_chunk_keys(
        &self,
        chunk_dir: &str,
        filename: &str,
    ) -> ResumableResult<Vec<(u32, String)>> {
        let safe_filename = sanitize_filename(filename);
        let mut slots: Vec<(u32, String)> = self
            .store
            .list(chunk_dir)
            .await?
            .into_iter()
            .filter_map(|key| chunk_number_of(&key, &safe_filename).map(|n| (n, key)))
            .collect();
        slots.sort_by_key(|(n, _)| *n);
        Ok(slots)
    }

    async fn copy_chunks(
        &self,
        chunks: &[String],
        writer: &mut ObjectWriter,
    ) -> ResumableResult<u64> {
        let mut stream = self.concat_chunk_streams(chunks.to_vec());
        let mut written = 0u64;
        while let Some(bytes) = stream.next().await {
            let bytes = bytes?;
            writer.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }
        writer.flush().await?;
        writer.shutdown().await?;
        Ok(written)
    }

    /// Chain the chunk streams, in the given order, into one stream
    fn concat_chunk_streams(&self, chunk_keys: Vec<String>) -> ByteStream {
        let store = self.store.clone();
        let stream = async_stream::stream! {
            for key in chunk_keys {
                match store.read(&key).await {
                    Ok(mut chunk_stream) => {
                        debug!(chunk = %key, "Append");
                        while let Some(bytes) = chunk_stream.next().await {
                            yield bytes;
                        }
                    }
                    Err(e) => {
                        yield Err(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            format!("Failed to read chunk {}: {}", key, e),
                        ));
                        return;
                    }
                }
            }
        };
        Box::pin(stream)
    }

    /// Best effort: a failed delete is logged and the rest carry on.
    async fn cleanup_chunks(&self, chunk_dir: &str, chunks: &[String]) {
        for key in chunks {
            if let Err(e) = self.store.delete(key).await {
                warn!(chunk = %key, error = %e, "Failed to delete chunk");
            }
        }
        match self.store.delete(chunk_dir).await {
            Ok(()) => debug!(dir = %chunk_dir, "Removed chunk dir"),
            Err(e) => warn!(dir = %chunk_dir, error = %e, "Failed to remove chunk dir"),
        }
    }
}
