use std::collections::BTreeMap;

/// Environment prefix used by [`ResumableConfig::from_env`]
pub const ENV_PREFIX: &str = "RESUMABLE__";

/// Configuration for the upload engine
#[derive(Debug, Clone)]
pub struct ResumableConfig {
    /// Root key under which chunk slots are staged
    pub temp_folder: String,

    /// Root key under which assembled files are written
    pub upload_folder: String,

    /// Wire names of the protocol parameters
    pub params: ParamNames,
}

impl Default for ResumableConfig {
    fn default() -> Self {
        Self {
            temp_folder: "tmp".to_string(),
            upload_folder: "uploads".to_string(),
            params: ParamNames::default(),
        }
    }
}

impl ResumableConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from `RESUMABLE__*` environment variables.
    ///
    /// Recognised keys: `RESUMABLE__TEMP_FOLDER`, `RESUMABLE__UPLOAD_FOLDER`,
    /// `RESUMABLE__PARAM_PREFIX` and one `RESUMABLE__PARAMS__<NAME>` per
    /// parameter (e.g. `RESUMABLE__PARAMS__IDENTIFIER=uuid`) to remap its
    /// wire name. Unset keys keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let mut config = Self::default();
        if let Some(folder) = var("TEMP_FOLDER") {
            config = config.with_temp_folder(folder);
        }
        if let Some(folder) = var("UPLOAD_FOLDER") {
            config = config.with_upload_folder(folder);
        }
        if let Some(prefix) = var("PARAM_PREFIX") {
            config = config.with_param_prefix(prefix);
        }
        for param in Param::ALL {
            if let Some(wire_name) = var(&format!("PARAMS__{}", param.env_name())) {
                config.params = config.params.remap(param, wire_name);
            }
        }
        config
    }

    /// Set the chunk staging root
    pub fn with_temp_folder<S: Into<String>>(mut self, folder: S) -> Self {
        self.temp_folder = trim_key(folder.into());
        self
    }

    /// Set the final upload root
    pub fn with_upload_folder<S: Into<String>>(mut self, folder: S) -> Self {
        self.upload_folder = trim_key(folder.into());
        self
    }

    /// Set the prefix prepended to every wire parameter name
    pub fn with_param_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.params.prefix = prefix.into();
        self
    }

    /// Replace the parameter name table
    pub fn with_param_names(mut self, params: ParamNames) -> Self {
        self.params = params;
        self
    }
}

fn trim_key(key: String) -> String {
    key.trim_end_matches('/').to_string()
}

/// Protocol parameters understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param {
    Identifier,
    Filename,
    ChunkNumber,
    ChunkSize,
    TotalSize,
    TotalChunks,
    RelativePath,
}

impl Param {
    pub const ALL: [Param; 7] = [
        Param::Identifier,
        Param::Filename,
        Param::ChunkNumber,
        Param::ChunkSize,
        Param::TotalSize,
        Param::TotalChunks,
        Param::RelativePath,
    ];

    /// Stable short name of the parameter
    pub fn short_name(self) -> &'static str {
        match self {
            Param::Identifier => "identifier",
            Param::Filename => "filename",
            Param::ChunkNumber => "chunkNumber",
            Param::ChunkSize => "chunkSize",
            Param::TotalSize => "totalSize",
            Param::TotalChunks => "totalChunks",
            Param::RelativePath => "relativePath",
        }
    }

    /// Suffix of the `RESUMABLE__PARAMS__*` variable remapping this parameter
    pub fn env_name(self) -> &'static str {
        match self {
            Param::Identifier => "IDENTIFIER",
            Param::Filename => "FILENAME",
            Param::ChunkNumber => "CHUNK_NUMBER",
            Param::ChunkSize => "CHUNK_SIZE",
            Param::TotalSize => "TOTAL_SIZE",
            Param::TotalChunks => "TOTAL_CHUNKS",
            Param::RelativePath => "RELATIVE_PATH",
        }
    }

    /// Look a parameter up by its short name
    pub fn from_short_name(name: &str) -> Option<Param> {
        Param::ALL.into_iter().find(|p| p.short_name() == name)
    }
}

/// Mapping from short parameter names to the keys found on the wire.
///
/// The wire key is `prefix + UcFirst(name)`, so with the default
/// `resumable` prefix `chunkNumber` is read from `resumableChunkNumber`.
/// With an empty prefix the name is used as is.
#[derive(Debug, Clone)]
pub struct ParamNames {
    prefix: String,
    names: BTreeMap<Param, String>,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            prefix: "resumable".to_string(),
            names: BTreeMap::new(),
        }
    }
}

impl ParamNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use bare names, without any prefix
    pub fn unprefixed() -> Self {
        Self::default().with_prefix("")
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Remap one parameter to a custom wire name
    pub fn remap<S: Into<String>>(mut self, param: Param, wire_name: S) -> Self {
        self.names.insert(param, wire_name.into());
        self
    }

    /// Merge a `{shortName: wireName}` table. Unknown short names are ignored.
    pub fn with_table<I, K, V>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (short, wire) in table {
            match Param::from_short_name(short.as_ref()) {
                Some(param) => {
                    self.names.insert(param, wire.into());
                }
                None => tracing::debug!(name = short.as_ref(), "Ignoring unknown parameter name"),
            }
        }
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Unprefixed name of a parameter after remapping
    pub fn name(&self, param: Param) -> &str {
        self.names
            .get(&param)
            .map(String::as_str)
            .unwrap_or_else(|| param.short_name())
    }

    /// Key under which the parameter is looked up in a request
    pub fn wire_key(&self, param: Param) -> String {
        let name = self.name(param);
        if self.prefix.is_empty() {
            return name.to_string();
        }
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("{}{}{}", self.prefix, first.to_uppercase(), chars.as_str()),
            None => self.prefix.clone(),
        }
    }
}
