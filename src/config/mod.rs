//! Configuration management.
//!
//! Configuration layers, later layers winning: built-in defaults, the TOML
//! config file, then environment variables (credentials are usually
//! supplied via `ZOTERO_API_KEY` / `GEMINI_API_KEY`). Validation happens
//! once, before any remote call; a failing config is the only thing that
//! aborts a run.

use crate::http::HttpConfig;
use crate::library::LibraryType;
use crate::models::{CollectionPath, Taxonomy};
use crate::retry::RetryPolicy;
use crate::services::RunOptions;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for refiler.
#[derive(Debug, Clone)]
pub struct RefilerConfig {
    /// Remote library identifier.
    pub library_id: String,
    /// Personal or group library.
    pub library_type: LibraryType,
    /// Reference-manager API key.
    pub library_api_key: Option<SecretString>,
    /// Reference-manager endpoint override, for tests and mirrors.
    pub library_endpoint: Option<String>,
    /// LLM API key.
    pub llm_api_key: Option<SecretString>,
    /// LLM model override.
    pub llm_model: Option<String>,
    /// LLM endpoint override.
    pub llm_endpoint: Option<String>,
    /// HTTP timeouts shared by both remote clients.
    pub http: HttpConfig,
    /// Retry budget for transient remote failures.
    pub retry: RetryPolicy,
    /// Organize-run options.
    pub organize: RunOptions,
    /// Dual-track taxonomy.
    pub taxonomy: Taxonomy,
    /// Collection cache file location.
    pub cache_file: PathBuf,
    /// User profile file location.
    pub profile_file: PathBuf,
}

impl Default for RefilerConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("", "", "refiler")
            .map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf());
        Self {
            library_id: String::new(),
            library_type: LibraryType::User,
            library_api_key: None,
            library_endpoint: None,
            llm_api_key: None,
            llm_model: None,
            llm_endpoint: None,
            http: HttpConfig::default(),
            retry: RetryPolicy::default(),
            organize: RunOptions::default(),
            taxonomy: Taxonomy::default(),
            cache_file: data_dir.join("collections_cache.json"),
            profile_file: data_dir.join("user_profile.json"),
        }
    }
}

impl RefilerConfig {
    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("cannot parse config file {}: {e}", path.display()))
        })?;
        Ok(Self::from_config_file(file).with_env_overrides())
    }

    /// Loads configuration from the default location, or defaults when no
    /// config file exists, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a config file exists but cannot be parsed.
    pub fn load_default() -> Result<Self> {
        let path = directories::ProjectDirs::from("", "", "refiler")
            .map(|dirs| dirs.config_dir().join("refiler.toml"));
        match path {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default().with_env_overrides()),
        }
    }

    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(library) = file.library {
            if let Some(id) = library.id {
                config.library_id = id;
            }
            if let Some(kind) = library.kind {
                config.library_type = LibraryType::parse(&kind);
            }
            config.library_api_key = library.api_key.or(config.library_api_key);
            config.library_endpoint = library.endpoint.or(config.library_endpoint);
        }
        if let Some(llm) = file.llm {
            config.llm_api_key = llm.api_key.or(config.llm_api_key);
            config.llm_model = llm.model.or(config.llm_model);
            config.llm_endpoint = llm.endpoint.or(config.llm_endpoint);
            if let Some(timeout_ms) = llm.timeout_ms {
                config.http.timeout_ms = timeout_ms;
            }
            if let Some(connect_timeout_ms) = llm.connect_timeout_ms {
                config.http.connect_timeout_ms = connect_timeout_ms;
            }
        }
        if let Some(retry) = file.retry {
            if let Some(max_attempts) = retry.max_attempts {
                config.retry.max_attempts = max_attempts.max(1);
            }
            if let Some(ms) = retry.base_backoff_ms {
                config.retry.base_backoff = Duration::from_millis(ms);
            }
            if let Some(ms) = retry.max_backoff_ms {
                config.retry.max_backoff = Duration::from_millis(ms);
            }
        }
        if let Some(organize) = file.organize {
            config.organize.scope = organize
                .target_collection
                .as_deref()
                .map(CollectionPath::parse);
            if let Some(types) = organize.item_types {
                config.organize.item_types = Some(types);
            }
            if let Some(commit) = organize.commit {
                config.organize.commit = commit;
            }
            if let Some(batch_size) = organize.batch_size {
                config.organize.batch_size = batch_size;
            }
            if let Some(item_limit) = organize.item_limit {
                config.organize.item_limit = item_limit;
            }
            if let Some(tag) = organize.source_tag {
                config.organize.source_tag = tag;
            }
            if let Some(tag) = organize.completion_tag {
                config.organize.completion_tag = tag;
            }
            if let Some(ms) = organize.throttle_ms {
                config.organize.throttle = Duration::from_millis(ms);
            }
        }
        if let Some(taxonomy) = file.taxonomy {
            config.taxonomy = taxonomy;
        }
        if let Some(files) = file.files {
            if let Some(cache) = files.cache {
                config.cache_file = PathBuf::from(cache);
            }
            if let Some(profile) = files.profile {
                config.profile_file = PathBuf::from(profile);
            }
        }
        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("ZOTERO_LIBRARY_ID") {
            self.library_id = v;
        }
        if let Ok(v) = std::env::var("ZOTERO_LIBRARY_TYPE") {
            self.library_type = LibraryType::parse(&v);
        }
        if let Ok(v) = std::env::var("ZOTERO_API_KEY") {
            self.library_api_key = Some(SecretString::from(v));
        }
        if let Ok(v) = std::env::var("GEMINI_API_KEY") {
            self.llm_api_key = Some(SecretString::from(v));
        }
        if let Ok(v) = std::env::var("REFILER_MODEL") {
            self.llm_model = Some(v);
        }
        self
    }

    /// Validates the configuration before a run starts.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for missing credentials, a zero batch size,
    /// or a malformed taxonomy.
    pub fn validate(&self) -> Result<()> {
        if self.library_id.is_empty() {
            return Err(Error::Configuration(
                "library id not configured (set ZOTERO_LIBRARY_ID or [library].id)".to_string(),
            ));
        }
        if self.library_api_key.is_none() {
            return Err(Error::Configuration(
                "library API key not configured (set ZOTERO_API_KEY or [library].api_key)"
                    .to_string(),
            ));
        }
        if self.llm_api_key.is_none() {
            return Err(Error::Configuration(
                "LLM API key not configured (set GEMINI_API_KEY or [llm].api_key)".to_string(),
            ));
        }
        if self.organize.batch_size == 0 {
            return Err(Error::Configuration(
                "batch size must be a positive integer".to_string(),
            ));
        }
        self.taxonomy.validate()
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Library section.
    pub library: Option<ConfigFileLibrary>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Retry section.
    pub retry: Option<ConfigFileRetry>,
    /// Organize section.
    pub organize: Option<ConfigFileOrganize>,
    /// Taxonomy override.
    pub taxonomy: Option<Taxonomy>,
    /// File locations.
    pub files: Option<ConfigFileFiles>,
}

/// Library section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLibrary {
    /// Library identifier.
    pub id: Option<String>,
    /// `user` or `group`.
    pub kind: Option<String>,
    /// API key.
    pub api_key: Option<SecretString>,
    /// Endpoint override.
    pub endpoint: Option<String>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// API key.
    pub api_key: Option<SecretString>,
    /// Model name.
    pub model: Option<String>,
    /// Endpoint override.
    pub endpoint: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Retry section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRetry {
    /// Total attempts including the first call.
    pub max_attempts: Option<u32>,
    /// Backoff before the first retry.
    pub base_backoff_ms: Option<u64>,
    /// Upper bound on a single backoff sleep.
    pub max_backoff_ms: Option<u64>,
}

/// Organize section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileOrganize {
    /// Target collection path, `/`-separated.
    pub target_collection: Option<String>,
    /// Item types to process.
    pub item_types: Option<Vec<String>>,
    /// Commit mode (false previews).
    pub commit: Option<bool>,
    /// Batch size.
    pub batch_size: Option<usize>,
    /// Item fetch limit.
    pub item_limit: Option<usize>,
    /// Source tag.
    pub source_tag: Option<String>,
    /// Completion tag.
    pub completion_tag: Option<String>,
    /// Inter-call throttle in milliseconds.
    pub throttle_ms: Option<u64>,
}

/// File locations section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFiles {
    /// Collection cache file.
    pub cache: Option<String>,
    /// User profile file.
    pub profile: Option<String>,
}
