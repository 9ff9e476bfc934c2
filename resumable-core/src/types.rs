use bytes::Bytes;
use futures_core::Stream;
use std::pin::Pin;

use crate::{ResumableError, UploadedFile};

/// Stream of bytes for chunk and file content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Build a [`ByteStream`] from an in-memory buffer
pub fn bytes_stream<B: Into<Bytes>>(data: B) -> ByteStream {
    let data = data.into();
    Box::pin(futures_util::stream::once(async move { Ok(data) }))
}

/// Why a request was turned away before storage was touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingParameter(String),
    InvalidParameter(String),
    InvalidChunkSize(i64),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MissingParameter(name) => write!(f, "missing parameter {name}"),
            Rejection::InvalidParameter(name) => write!(f, "invalid parameter {name}"),
            Rejection::InvalidChunkSize(size) => write!(f, "invalid chunk size {size}"),
        }
    }
}

impl Rejection {
    /// Map a validation error onto a rejection; storage errors yield `None`.
    pub fn from_error(error: &ResumableError) -> Option<Self> {
        match error {
            ResumableError::MissingParameter { name } => {
                Some(Rejection::MissingParameter(name.clone()))
            }
            ResumableError::InvalidParameter { name, .. } => {
                Some(Rejection::InvalidParameter(name.clone()))
            }
            ResumableError::InvalidChunkSize { size } => Some(Rejection::InvalidChunkSize(*size)),
            _ => None,
        }
    }
}

/// Answer to a test-chunk probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Chunk is stored, the client can skip it
    HaveChunk,
    /// Chunk is not stored, the client should send it
    NeedChunk,
    Rejected(Rejection),
    StorageFailure(String),
}

/// Result of handing one chunk to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Chunk stored (or already present), upload still incomplete
    Accepted,
    /// Chunk stored and the upload is assembled
    Completed(Assembly),
    Rejected(Rejection),
    StorageFailure(String),
}

/// Result of assembling a complete upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    /// This call wrote the final file and cleaned up the chunks
    Created(UploadedFile),
    /// A final file was already at the target key; chunks were left alone
    AlreadyExists(UploadedFile),
}

impl Assembly {
    pub fn file(&self) -> &UploadedFile {
        match self {
            Assembly::Created(file) | Assembly::AlreadyExists(file) => file,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Assembly::Created(_))
    }
}

/// Unified outcome of [`ResumableEngine::process`](crate::ResumableEngine::process)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Probe(ProbeOutcome),
    Chunk(ChunkOutcome),
}

impl Outcome {
    /// HTTP status resumable.js expects for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Probe(ProbeOutcome::HaveChunk) => 200,
            Outcome::Probe(ProbeOutcome::NeedChunk) => 204,
            Outcome::Chunk(ChunkOutcome::Accepted | ChunkOutcome::Completed(_)) => 201,
            Outcome::Probe(ProbeOutcome::Rejected(_))
            | Outcome::Chunk(ChunkOutcome::Rejected(_)) => 422,
            Outcome::Probe(ProbeOutcome::StorageFailure(_))
            | Outcome::Chunk(ChunkOutcome::StorageFailure(_)) => 500,
        }
    }

    /// True when this call observed the upload as complete
    pub fn is_upload_complete(&self) -> bool {
        matches!(self, Outcome::Chunk(ChunkOutcome::Completed(_)))
    }

    /// Final file, when the call completed the upload
    pub fn uploaded_file(&self) -> Option<&UploadedFile> {
        match self {
            Outcome::Chunk(ChunkOutcome::Completed(assembly)) => Some(assembly.file()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_resumable_js() {
        assert_eq!(Outcome::Probe(ProbeOutcome::HaveChunk).status_code(), 200);
        assert_eq!(Outcome::Probe(ProbeOutcome::NeedChunk).status_code(), 204);
        let missing = Rejection::MissingParameter("x".into());
        assert_eq!(Outcome::Probe(ProbeOutcome::Rejected(missing)).status_code(), 422);
        assert_eq!(Outcome::Chunk(ChunkOutcome::Accepted).status_code(), 201);
        assert_eq!(
            Outcome::Chunk(ChunkOutcome::Rejected(Rejection::InvalidChunkSize(0))).status_code(),
            422
        );
        assert_eq!(Outcome::Chunk(ChunkOutcome::StorageFailure("io".into())).status_code(), 500);
    }

    #[test]
    fn rejection_only_maps_validation_errors() {
        assert_eq!(
            Rejection::from_error(&ResumableError::InvalidChunkSize { size: 0 }),
            Some(Rejection::InvalidChunkSize(0))
        );
        assert_eq!(Rejection::from_error(&ResumableError::not_found("k")), None);
    }
}
