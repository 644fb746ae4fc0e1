//! Engine configuration
//!
//! All fields have defaults; a TOML file only needs the keys it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use visa_model::{default_document_set, DocumentDraft, DEFAULT_PROCESSING_DAYS};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but make no sense
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Consistency engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Processing days used when a package has none
    pub default_processing_days: u32,
    /// Checklist seeded by `ensure_default_documents`
    pub default_documents: Vec<DocumentDraft>,
    /// Use the store's transactional replace when it offers one
    pub transactional_replace: bool,
    /// Read-view cache capacity (entries)
    pub view_cache_capacity: u64,
    /// Read-view cache time-to-live in seconds, 0 disables expiry
    pub view_cache_ttl_secs: u64,
    /// Buffered invalidation events per subscriber
    pub invalidation_channel_capacity: usize,
    /// Name of the separate repair tool quoted in schema-gate failures
    pub schema_repair_tool: String,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default processing days
    #[inline]
    #[must_use]
    pub fn with_default_processing_days(mut self, days: u32) -> Self {
        self.default_processing_days = days;
        self
    }

    /// With seeded document set
    #[inline]
    #[must_use]
    pub fn with_default_documents(mut self, documents: Vec<DocumentDraft>) -> Self {
        self.default_documents = documents;
        self
    }

    /// With transactional replace preference
    #[inline]
    #[must_use]
    pub fn with_transactional_replace(mut self, enabled: bool) -> Self {
        self.transactional_replace = enabled;
        self
    }

    /// With repair tool name
    #[inline]
    #[must_use]
    pub fn with_schema_repair_tool(mut self, tool: impl Into<String>) -> Self {
        self.schema_repair_tool = tool.into();
        self
    }

    /// View cache TTL, `None` when disabled
    #[inline]
    #[must_use]
    pub fn view_cache_ttl(&self) -> Option<Duration> {
        (self.view_cache_ttl_secs > 0).then(|| Duration::from_secs(self.view_cache_ttl_secs))
    }

    /// Parse from a TOML string and validate
    ///
    /// # Errors
    /// `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` when the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_processing_days == 0 {
            return Err(ConfigError::Invalid(
                "default_processing_days must be positive".into(),
            ));
        }
        if self.default_documents.is_empty() {
            return Err(ConfigError::Invalid(
                "default_documents must not be empty".into(),
            ));
        }
        if self.default_documents.iter().any(|d| d.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "default_documents entries need a name".into(),
            ));
        }
        if self.invalidation_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "invalidation_channel_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_processing_days: DEFAULT_PROCESSING_DAYS,
            default_documents: default_document_set(),
            transactional_replace: false,
            view_cache_capacity: 1_000,
            view_cache_ttl_secs: 300,
            invalidation_channel_capacity: 64,
            schema_repair_tool: "Database Fix".to_string(),
        }
    }
}
