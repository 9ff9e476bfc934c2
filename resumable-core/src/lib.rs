//! # resumable-core: server side of the resumable.js upload protocol
//!
//! A client splits a file into numbered chunks and sends them one by one,
//! in any order, possibly resuming after an interruption. `resumable-core`
//! tracks which chunks have arrived, answers "do you have chunk N"
//! probes, and assembles the final file exactly once every chunk is in.
//!
//! ## Key Features
//!
//! - **Stateless engine**: upload progress is derived from the store on
//!   demand, never kept in memory or in a side database
//! - **Idempotent receipt**: re-sent chunks are a no-op
//! - **Order independent**: completeness only depends on which chunks exist
//! - **At-most-once assembly**: the final file is created with create-only
//!   semantics, so racing requests cannot clobber it
//! - **Storage agnostic**: anything implementing [`UploadStore`]; a local
//!   directory and an in-memory store ship with the crate
//! - **Server agnostic**: requests come in as a flat parameter map plus an
//!   optional byte stream, and leave as an [`Outcome`]
//!
//! ## Quick Start
//!
//! ```rust
//! use resumable_core::prelude::*;
//! use resumable_core::{bytes_stream, ChunkOutcome, MemoryStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = ResumableEngine::new(MemoryStore::new(), ResumableConfig::default());
//!
//! let request = ChunkRequest::new("42-id", "hello.txt", 1)
//!     .with_total_chunks(1)
//!     .with_chunk_size(1024);
//!
//! match engine.receive_chunk(&request, bytes_stream("Hello, world!")).await {
//!     ChunkOutcome::Completed(assembly) => assert_eq!(assembly.file().key, "uploads/hello.txt"),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # }
//! ```
//!
//! ## Storage layout
//!
//! ```text
//! tempRoot/<identifier>/<filename>.0001   ← one key per chunk
//! tempRoot/<identifier>/<filename>.0002
//! uploadRoot/<filename>                   ← assembled file
//! ```
//!
//! Every identifier and filename is passed through
//! [`sanitize::sanitize_filename`] before it becomes part of a key.

mod assembly;
mod config;
mod engine;
mod error;
mod fs_store;
mod memory_store;
mod receipt;
mod request;
pub mod sanitize;
pub mod store;
mod types;

pub use assembly::chunk_number_of;
pub use config::{Param, ParamNames, ResumableConfig, ENV_PREFIX};
pub use engine::ResumableEngine;
pub use error::{ResumableError, ResumableResult};
pub use fs_store::LocalFsStore;
pub use memory_store::MemoryStore;
pub use receipt::UploadedFile;
pub use request::{ChunkRequest, RequestKind};
pub use store::{ObjectWriter, UploadStore};
pub use types::{bytes_stream, Assembly, ByteStream, ChunkOutcome, Outcome, ProbeOutcome, Rejection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ByteStream, ChunkRequest, Outcome, ResumableConfig, ResumableEngine, ResumableError,
        ResumableResult, UploadStore,
    };
}
