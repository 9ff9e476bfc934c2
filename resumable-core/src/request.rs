use std::collections::HashMap;
use std::str::FromStr;

use crate::config::{Param, ParamNames};
use crate::{ResumableError, ResumableResult};

/// Which protocol call a request is decoded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// GET "do you have chunk N" probe
    Probe,
    /// POST carrying chunk bytes
    Upload,
}

/// Decoded, validated view of the protocol parameters of one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    pub identifier: String,
    pub filename: String,
    pub chunk_number: u32,
    pub total_chunks: Option<u32>,
    pub chunk_size: Option<u64>,
    pub total_size: Option<u64>,
    pub relative_path: Option<String>,
}

impl ChunkRequest {
    pub fn new<I, F>(identifier: I, filename: F, chunk_number: u32) -> Self
    where
        I: Into<String>,
        F: Into<String>,
    {
        Self {
            identifier: identifier.into(),
            filename: filename.into(),
            chunk_number,
            total_chunks: None,
            chunk_size: None,
            total_size: None,
            relative_path: None,
        }
    }

    pub fn with_total_chunks(mut self, total_chunks: u32) -> Self {
        self.total_chunks = Some(total_chunks);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_total_size(mut self, total_size: u64) -> Self {
        self.total_size = Some(total_size);
        self
    }

    /// Decode a flat parameter mapping.
    ///
    /// Probes need identifier, filename and chunk number. Uploads also need
    /// the total chunk count and a positive chunk size. Empty values count
    /// as missing.
    pub fn decode(
        params: &HashMap<String, String>,
        names: &ParamNames,
        kind: RequestKind,
    ) -> ResumableResult<Self> {
        let reader = ParamReader { params, names };

        let identifier = reader.required(Param::Identifier)?.to_string();
        let filename = reader.required(Param::Filename)?.to_string();
        let chunk_number: u32 = reader.required_number(Param::ChunkNumber)?;
        if chunk_number == 0 {
            return Err(ResumableError::invalid(names.wire_key(Param::ChunkNumber), "0"));
        }

        let mut request = Self::new(identifier, filename, chunk_number);
        request.total_size = reader.optional_number(Param::TotalSize)?;
        request.relative_path = reader.optional(Param::RelativePath).map(str::to_string);

        match kind {
            RequestKind::Probe => {
                request.total_chunks = reader.optional_number(Param::TotalChunks)?;
                request.chunk_size = reader.optional_number::<i64>(Param::ChunkSize)?
                    .and_then(|size| u64::try_from(size).ok());
            }
            RequestKind::Upload => {
                let total_chunks: u32 = reader.required_number(Param::TotalChunks)?;
                if total_chunks == 0 {
                    return Err(ResumableError::invalid(names.wire_key(Param::TotalChunks), "0"));
                }
                let chunk_size: i64 = reader.required_number(Param::ChunkSize)?;
                if chunk_size <= 0 {
                    return Err(ResumableError::InvalidChunkSize { size: chunk_size });
                }
                request.total_chunks = Some(total_chunks);
                request.chunk_size = Some(chunk_size as u64);
            }
        }

        Ok(request)
    }

    /// Re-check a request built in code rather than decoded from the wire.
    pub fn validate(&self, kind: RequestKind) -> ResumableResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(ResumableError::missing(Param::Identifier.short_name()));
        }
        if self.filename.trim().is_empty() {
            return Err(ResumableError::missing(Param::Filename.short_name()));
        }
        if self.chunk_number == 0 {
            return Err(ResumableError::invalid(Param::ChunkNumber.short_name(), "0"));
        }
        if kind == RequestKind::Probe {
            return Ok(());
        }

        match self.total_chunks {
            None => return Err(ResumableError::missing(Param::TotalChunks.short_name())),
            Some(0) => return Err(ResumableError::invalid(Param::TotalChunks.short_name(), "0")),
            Some(_) => {}
        }
        match self.chunk_size {
            None => Err(ResumableError::missing(Param::ChunkSize.short_name())),
            Some(0) => Err(ResumableError::InvalidChunkSize { size: 0 }),
            Some(_) => Ok(()),
        }
    }
}

struct ParamReader<'a> {
    params: &'a HashMap<String, String>,
    names: &'a ParamNames,
}

impl ParamReader<'_> {
    fn optional(&self, param: Param) -> Option<&str> {
        self.params
            .get(&self.names.wire_key(param))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, param: Param) -> ResumableResult<&str> {
        self.optional(param)
            .ok_or_else(|| ResumableError::missing(self.names.wire_key(param)))
    }

    fn optional_number<T: FromStr>(&self, param: Param) -> ResumableResult<Option<T>> {
        self.optional(param)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| ResumableError::invalid(self.names.wire_key(param), raw))
            })
            .transpose()
    }

    fn required_number<T: FromStr>(&self, param: Param) -> ResumableResult<T> {
        self.optional_number(param)?
            .ok_or_else(|| ResumableError::missing(self.names.wire_key(param)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn upload_params() -> HashMap<String, String> {
        params(&[
            ("resumableChunkNumber", "3"),
            ("resumableTotalChunks", "600"),
            ("resumableChunkSize", "200"),
            ("resumableTotalSize", "120000"),
            ("resumableIdentifier", "42-identifier"),
            ("resumableFilename", "example-file.png"),
            ("resumableRelativePath", "upload"),
        ])
    }

    fn decode(p: &HashMap<String, String>, kind: RequestKind) -> ResumableResult<ChunkRequest> {
        ChunkRequest::decode(p, &ParamNames::default(), kind)
    }

    #[test]
    fn decodes_full_upload_request() {
        let req = decode(&upload_params(), RequestKind::Upload).unwrap();
        assert_eq!(req.identifier, "42-identifier");
        assert_eq!(req.filename, "example-file.png");
        assert_eq!(req.chunk_number, 3);
        assert_eq!(req.total_chunks, Some(600));
        assert_eq!(req.chunk_size, Some(200));
        assert_eq!(req.total_size, Some(120000));
        assert_eq!(req.relative_path.as_deref(), Some("upload"));
    }

    #[test]
    fn probe_needs_only_identity_fields() {
        let p = params(&[
            ("resumableChunkNumber", "1"),
            ("resumableIdentifier", "abc"),
            ("resumableFilename", "a.txt"),
        ]);
        let req = decode(&p, RequestKind::Probe).unwrap();
        assert_eq!(req.chunk_number, 1);
        assert_eq!(req.total_chunks, None);
    }

    #[test]
    fn missing_identifier_is_rejected() {
        let mut p = upload_params();
        p.remove("resumableIdentifier");
        let err = decode(&p, RequestKind::Probe).unwrap_err();
        let name = match err {
            ResumableError::MissingParameter { name } => name,
            other => panic!("expected a missing parameter, got {other:?}"),
        };
        assert_eq!(name, "resumableIdentifier");
    }

    #[test]
    fn empty_filename_counts_as_missing() {
        let mut p = upload_params();
        p.insert("resumableFilename".into(), "  ".into());
        let err = decode(&p, RequestKind::Upload).unwrap_err();
        assert!(matches!(err, ResumableError::MissingParameter { .. }));
    }

    #[test]
    fn non_numeric_chunk_number_is_rejected() {
        let mut p = upload_params();
        p.insert("resumableChunkNumber".into(), "three".into());
        let err = decode(&p, RequestKind::Upload).unwrap_err();
        assert!(matches!(err, ResumableError::InvalidParameter { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn chunk_number_zero_is_rejected() {
        let mut p = upload_params();
        p.insert("resumableChunkNumber".into(), "0".into());
        assert!(decode(&p, RequestKind::Probe).is_err());
    }

    #[test]
    fn non_positive_chunk_size_is_rejected_on_upload() {
        for size in ["0", "-5"] {
            let mut p = upload_params();
            p.insert("resumableChunkSize".into(), size.into());
            let err = decode(&p, RequestKind::Upload).unwrap_err();
            assert!(matches!(err, ResumableError::InvalidChunkSize { .. }), "{size}");
        }
    }

    #[test]
    fn upload_requires_total_chunks() {
        let mut p = upload_params();
        p.remove("resumableTotalChunks");
        let err = decode(&p, RequestKind::Upload).unwrap_err();
        let name = match err {
            ResumableError::MissingParameter { name } => name,
            other => panic!("expected a missing parameter, got {other:?}"),
        };
        assert_eq!(name, "resumableTotalChunks");
    }

    #[test]
    fn validate_catches_hand_built_requests() {
        let probe = ChunkRequest::new("id", "a.txt", 1);
        assert!(probe.validate(RequestKind::Probe).is_ok());
        assert!(matches!(
            probe.validate(RequestKind::Upload),
            Err(ResumableError::MissingParameter { .. })
        ));

        let zero = probe.clone().with_total_chunks(1).with_chunk_size(0);
        assert!(matches!(
            zero.validate(RequestKind::Upload),
            Err(ResumableError::InvalidChunkSize { size: 0 })
        ));
        assert!(ChunkRequest::new("", "a.txt", 1).validate(RequestKind::Probe).is_err());
    }

    #[test]
    fn remapped_names_are_read_from_custom_keys() {
        let names = ParamNames::unprefixed()
            .remap(Param::Identifier, "uuid")
            .remap(Param::ChunkNumber, "part");
        let p = params(&[("uuid", "u-1"), ("filename", "f.bin"), ("part", "2")]);
        let req = ChunkRequest::decode(&p, &names, RequestKind::Probe).unwrap();
        assert_eq!(req.identifier, "u-1");
        assert_eq!(req.chunk_number, 2);
    }
}
