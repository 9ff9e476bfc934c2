use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;

/// Parameters and payload pulled out of one protocol request
#[derive(Debug, Clone, Default)]
pub struct UploadParams {
    pub params: HashMap<String, String>,
    pub payload: Option<Bytes>,
    pub payload_filename: Option<String>,
}

impl UploadParams {
    /// Parameters of a GET probe
    pub fn from_query(query: HashMap<String, String>) -> Self {
        Self {
            params: query,
            ..Self::default()
        }
    }

    /// Read a multipart POST body on top of the query string.
    ///
    /// Text fields become parameters (overriding query values of the same
    /// name); the first file field is the chunk payload. Extra file fields
    /// are drained and ignored.
    pub async fn from_multipart(
        query: HashMap<String, String>,
        mut multipart: Multipart,
    ) -> Result<Self, MultipartError> {
        let mut out = Self::from_query(query);

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_some() {
                let filename = field.file_name().map(str::to_string);
                let data = field.bytes().await?;
                if out.payload.is_none() {
                    out.payload = Some(data);
                    out.payload_filename = filename;
                } else {
                    tracing::debug!(field = %name, "Ignoring extra file field");
                }
                continue;
            }

            let value = field.text().await?;
            out.params.insert(name, value);
        }

        Ok(out)
    }
}
