use serde::{Deserialize, Serialize};

/// Description of an assembled upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Storage key of the final file (`uploadRoot/filename`)
    pub key: String,
    /// Sanitized final filename
    pub filename: String,
    /// Filename as sent by the client
    pub original_filename: String,
    /// Extension of the final filename, if it has one
    pub extension: Option<String>,
    /// Bytes written; `None` when the file was already there
    pub size_bytes: Option<u64>,
}

impl UploadedFile {
    pub fn new<K, F, O>(key: K, filename: F, original_filename: O) -> Self
    where
        K: Into<String>,
        F: Into<String>,
        O: Into<String>,
    {
        let filename = filename.into();
        let extension = crate::sanitize::extension(&filename).map(str::to_string);
        Self {
            key: key.into(),
            filename,
            original_filename: original_filename.into(),
            extension,
            size_bytes: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Original filename without its extension
    pub fn original_stem(&self) -> &str {
        crate::sanitize::strip_extension(&self.original_filename)
    }
}
