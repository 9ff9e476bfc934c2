use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing, Json, Router,
};
use resumable_core::{bytes_stream, ChunkOutcome, Outcome, ProbeOutcome, ResumableEngine};
use serde_json::json;

use crate::{params::UploadParams, ResumableState};

/// Request body limit of the upload route unless configured otherwise (100 MiB).
///
/// resumable.js sends the remainder of a file with its last chunk, so that
/// chunk may be up to twice the configured chunk size.
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024 * 1024;

/// Router serving the resumable.js endpoint at `path`.
///
/// `GET` answers test-chunk probes; `POST` (multipart) receives chunks.
/// Request bodies are capped at [`DEFAULT_BODY_LIMIT`].
pub fn upload_router(path: &str, engine: ResumableEngine) -> Router<()> {
    upload_router_with_limit(path, engine, Some(DEFAULT_BODY_LIMIT))
}

/// Same as [`upload_router`] with an explicit body limit in bytes.
/// `None` lifts the limit entirely.
pub fn upload_router_with_limit(
    path: &str,
    engine: ResumableEngine,
    body_limit: Option<usize>,
) -> Router<()> {
    let state = ResumableState::new(engine);
    let body_limit = match body_limit {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route(
            path,
            routing::get(probe_chunk)
                .post(upload_chunk)
                .layer(body_limit),
        )
        .with_state(state)
}

async fn probe_chunk(
    State(state): State<ResumableState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let request = UploadParams::from_query(query);
    let outcome = state.engine.process(&request.params, None).await;
    OutcomeResponse(outcome).into_response()
}

async fn upload_chunk(
    State(state): State<ResumableState>,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Response {
    let request = match UploadParams::from_multipart(query, multipart).await {
        Ok(request) => request,
        Err(e) => {
            // Body errors (too large, malformed, cut off) keep their own status
            let status = e.status();
            tracing::warn!(error = %e, status = %status, "Failed to read chunk upload body");
            return (status, Json(json!({ "error": e.body_text() }))).into_response();
        }
    };

    let payload = request.payload.map(bytes_stream);
    let outcome = state.engine.process(&request.params, payload).await;
    OutcomeResponse(outcome).into_response()
}

/// Renders an engine [`Outcome`] with the status codes resumable.js expects
#[derive(Debug)]
pub struct OutcomeResponse(pub Outcome);

impl IntoResponse for OutcomeResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match self.0 {
            Outcome::Chunk(ChunkOutcome::Completed(assembly)) => {
                let body = json!({ "complete": true, "file": assembly.file() });
                (status, Json(body)).into_response()
            }
            Outcome::Chunk(ChunkOutcome::Rejected(rejection))
            | Outcome::Probe(ProbeOutcome::Rejected(rejection)) => {
                (status, Json(json!({ "error": rejection.to_string() }))).into_response()
            }
            Outcome::Chunk(ChunkOutcome::StorageFailure(reason))
            | Outcome::Probe(ProbeOutcome::StorageFailure(reason)) => {
                (status, Json(json!({ "error": reason }))).into_response()
            }
            _ => status.into_response(),
        }
    }
}
