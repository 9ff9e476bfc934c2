use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::request::RequestKind;
use crate::sanitize::{pinned_filename, sanitize_filename};
use crate::store::join_key;
use crate::{
    ByteStream, ChunkOutcome, ChunkRequest, Outcome, ProbeOutcome, Rejection, ResumableConfig,
    ResumableError, ResumableResult, UploadStore,
};

/// Server side of the resumable.js chunk protocol.
///
/// Holds only configuration; every bit of upload state lives in the
/// store, so any number of engines may share one store. Cloning is cheap.
#[derive(Clone)]
pub struct ResumableEngine {
    pub(crate) store: Arc<dyn UploadStore>,
    pub(crate) config: ResumableConfig,
    pub(crate) pinned_filename: Option<String>,
}

impl ResumableEngine {
    /// Create an engine over a store
    pub fn new<S: UploadStore + 'static>(store: S, config: ResumableConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    /// Create an engine over an already shared store
    pub fn from_arc(store: Arc<dyn UploadStore>, config: ResumableConfig) -> Self {
        Self {
            store,
            config,
            pinned_filename: None,
        }
    }

    /// Engine that writes completed uploads under `filename` instead of
    /// the client's name. The original extension is always kept.
    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.pinned_filename = Some(filename.into());
        self
    }

    pub fn config(&self) -> &ResumableConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn UploadStore> {
        &self.store
    }

    /// Staging prefix of one upload: `tempRoot/<identifier>`
    pub fn chunk_dir(&self, identifier: &str) -> String {
        join_key(&self.config.temp_folder, &sanitize_filename(identifier))
    }

    /// Name of one chunk slot, e.g. `photo.png.0001`
    pub fn chunk_file_name(filename: &str, chunk_number: u32) -> String {
        format!("{}.{:04}", sanitize_filename(filename), chunk_number)
    }

    /// Full key of one chunk slot
    pub fn chunk_key(&self, identifier: &str, filename: &str, chunk_number: u32) -> String {
        join_key(&self.chunk_dir(identifier), &Self::chunk_file_name(filename, chunk_number))
    }

    /// Name the assembled file gets for a client filename
    pub fn final_filename(&self, filename: &str) -> String {
        match &self.pinned_filename {
            Some(pinned) => pinned_filename(pinned, filename),
            None => sanitize_filename(filename),
        }
    }

    /// Key the assembled file is written to
    pub fn final_key(&self, filename: &str) -> String {
        join_key(&self.config.upload_folder, &self.final_filename(filename))
    }

    /// Decode the request once and dispatch: a payload means a chunk
    /// upload, no payload means a test-chunk probe.
    pub async fn process(
        &self,
        params: &HashMap<String, String>,
        payload: Option<ByteStream>,
    ) -> Outcome {
        match payload {
            Some(payload) => {
                debug!("Handling upload chunk");
                match ChunkRequest::decode(params, &self.config.params, RequestKind::Upload) {
                    Ok(request) => Outcome::Chunk(self.receive_chunk(&request, payload).await),
                    Err(e) => Outcome::Chunk(ChunkOutcome::Rejected(reject(e))),
                }
            }
            None => {
                debug!("Handling test chunk");
                match ChunkRequest::decode(params, &self.config.params, RequestKind::Probe) {
                    Ok(request) => Outcome::Probe(self.probe(&request).await),
                    Err(e) => Outcome::Probe(ProbeOutcome::Rejected(reject(e))),
                }
            }
        }
    }

    /// Answer "do you have chunk N"
    pub async fn probe(&self, request: &ChunkRequest) -> ProbeOutcome {
        if let Err(e) = request.validate(RequestKind::Probe) {
            return ProbeOutcome::Rejected(reject(e));
        }

        match self
            .is_chunk_uploaded(&request.identifier, &request.filename, request.chunk_number)
            .await
        {
            Ok(true) => ProbeOutcome::HaveChunk,
            Ok(false) => ProbeOutcome::NeedChunk,
            Err(e) => {
                warn!(identifier = %request.identifier, error = %e, "Probe failed");
                ProbeOutcome::StorageFailure(e.to_string())
            }
        }
    }

    /// Store one chunk and assemble the upload if it is now complete.
    ///
    /// Re-delivering a chunk that is already stored is a no-op; the
    /// payload is dropped unread and completeness is checked again.
    pub async fn receive_chunk(&self, request: &ChunkRequest, payload: ByteStream) -> ChunkOutcome {
        if let Err(e) = request.validate(RequestKind::Upload) {
            return ChunkOutcome::Rejected(reject(e));
        }
        let total_chunks = request.total_chunks.unwrap_or_default();

        if let Err(e) = self.store_chunk(request, payload).await {
            warn!(
                identifier = %request.identifier,
                chunk_number = request.chunk_number,
                error = %e,
                "Failed to store chunk"
            );
            return ChunkOutcome::StorageFailure(e.to_string());
        }

        let identifier = &request.identifier;
        match self
            .is_upload_complete(&request.filename, identifier, total_chunks)
            .await
        {
            Ok(false) => ChunkOutcome::Accepted,
            Ok(true) => match self.assemble(identifier, &request.filename, total_chunks).await {
                Ok(assembly) => {
                    let key = &assembly.file().key;
                    info!(identifier = %identifier, key = %key, "Upload is complete");
                    ChunkOutcome::Completed(assembly)
                }
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "Assembly failed, chunks kept");
                    ChunkOutcome::StorageFailure(e.to_string())
                }
            },
            Err(e) => ChunkOutcome::StorageFailure(e.to_string()),
        }
    }

    async fn store_chunk(
        &self,
        request: &ChunkRequest,
        payload: ByteStream,
    ) -> ResumableResult<()> {
        let key = self.chunk_key(&request.identifier, &request.filename, request.chunk_number);
        if self.store.has(&key).await? {
            debug!(
                identifier = %request.identifier,
                chunk_number = request.chunk_number,
                "Chunk already stored, skipping write"
            );
            return Ok(());
        }

        let size = self.store.write(&key, payload).await?;
        debug!(
            identifier = %request.identifier,
            chunk_number = request.chunk_number,
            size_bytes = size,
            "Stored chunk"
        );
        Ok(())
    }

    /// Whether the slot for one chunk exists
    pub async fn is_chunk_uploaded(
        &self,
        identifier: &str,
        filename: &str,
        chunk_number: u32,
    ) -> ResumableResult<bool> {
        self.store.has(&self.chunk_key(identifier, filename, chunk_number)).await
    }

    /// True iff every chunk `1..=total_chunks` is stored. Stops at the first gap.
    pub async fn is_upload_complete(
        &self,
        filename: &str,
        identifier: &str,
        total_chunks: u32,
    ) -> ResumableResult<bool> {
        if total_chunks == 0 {
            return Ok(false);
        }
        for chunk_number in 1..=total_chunks {
            if !self.is_chunk_uploaded(identifier, filename, chunk_number).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn reject(error: ResumableError) -> Rejection {
    Rejection::from_error(&error).unwrap_or_else(|| Rejection::InvalidParameter(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bytes_stream, MemoryStore};

    fn engine() -> (ResumableEngine, MemoryStore) {
        let store = MemoryStore::new();
        let config = ResumableConfig::default()
            .with_temp_folder("test/tmp")
            .with_upload_folder("test/uploads");
        (ResumableEngine::new(store.clone(), config), store)
    }

    #[test]
    fn chunk_layout_matches_resumable_js_servers() {
        let (engine, _) = engine();
        assert_eq!(engine.chunk_dir("test-identifier"), "test/tmp/test-identifier");
        assert_eq!(
            ResumableEngine::chunk_file_name("example-file.png", 1),
            "example-file.png.0001"
        );
        assert_eq!(
            ResumableEngine::chunk_file_name("example-file.png", 12345),
            "example-file.png.12345"
        );
        assert_eq!(engine.chunk_key("42-id", "photo.png", 3), "test/tmp/42-id/photo.png.0003");
    }

    #[test]
    fn keys_never_contain_traversal() {
        let (engine, _) = engine();
        let chunk = engine.chunk_key("../../etc", "../unsafe-one-level.txt", 1);
        let target = engine.final_key("../unsafe-one-level.txt");
        assert_eq!(chunk, "test/tmp/etc/unsafe-one-level.txt.0001");
        assert_eq!(target, "test/uploads/unsafe-one-level.txt");
        assert!(!chunk.contains(".."));
        assert!(!target.contains(".."));
    }

    #[test]
    fn pinned_filename_keeps_original_extension() {
        let (engine, _) = engine();
        let engine = engine.with_filename("avatar.jpg");
        assert_eq!(engine.final_key("selfie.png"), "test/uploads/avatar.png");
    }

    #[tokio::test]
    async fn completeness_short_circuits_on_gaps() {
        let (engine, store) = engine();
        for n in [1, 2, 3] {
            store.insert(engine.chunk_key("files", "example-file.png", n), "x");
        }
        let cases = [(1, true), (2, true), (3, true), (4, false), (5, false), (15, false)];
        for (total, expected) in cases {
            assert_eq!(
                engine.is_upload_complete("example-file.png", "files", total).await.unwrap(),
                expected,
                "total = {total}"
            );
        }
        assert!(!engine.is_upload_complete("example-file.png", "files", 0).await.unwrap());
    }

    #[tokio::test]
    async fn probe_reports_missing_then_present() {
        let (engine, _) = engine();
        let request = ChunkRequest::new("abc", "a.txt", 1).with_total_chunks(2).with_chunk_size(10);

        assert_eq!(engine.probe(&request).await, ProbeOutcome::NeedChunk);
        let outcome = engine.receive_chunk(&request, bytes_stream("hello")).await;
        assert_eq!(outcome, ChunkOutcome::Accepted);
        assert_eq!(engine.probe(&request).await, ProbeOutcome::HaveChunk);
    }

    #[tokio::test]
    async fn duplicate_chunk_keeps_first_payload() {
        let (engine, store) = engine();
        let request = ChunkRequest::new("abc", "a.txt", 1).with_total_chunks(2).with_chunk_size(10);

        let first = engine.receive_chunk(&request, bytes_stream("first")).await;
        let second = engine.receive_chunk(&request, bytes_stream("second")).await;
        assert_eq!(first, ChunkOutcome::Accepted);
        assert_eq!(second, ChunkOutcome::Accepted);
        assert_eq!(store.get("test/tmp/abc/a.txt.0001").unwrap(), b"first");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn process_dispatches_on_payload() {
        let (engine, _) = engine();
        let params: HashMap<String, String> = [
            ("resumableChunkNumber", "1"),
            ("resumableTotalChunks", "2"),
            ("resumableChunkSize", "200"),
            ("resumableIdentifier", "p-1"),
            ("resumableFilename", "doc.pdf"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let outcome = engine.process(&params, None).await;
        assert_eq!(outcome, Outcome::Probe(ProbeOutcome::NeedChunk));
        assert_eq!(outcome.status_code(), 204);

        let outcome = engine.process(&params, Some(bytes_stream("data"))).await;
        assert_eq!(outcome, Outcome::Chunk(ChunkOutcome::Accepted));
        assert_eq!(outcome.status_code(), 201);

        let outcome = engine.process(&params, None).await;
        assert_eq!(outcome.status_code(), 200);

        let outcome = engine.process(&HashMap::new(), None).await;
        assert_eq!(outcome.status_code(), 422);
    }
}
