//! Configuration for the Album messaging service.
//!
//! # Example
//!
//! ```
//! use album_core::config::{CoreConfig, CoreConfigBuilder};
//! use std::time::Duration;
//!
//! // Use defaults
//! let config = CoreConfig::default();
//!
//! // Or use builder for customization
//! let config = CoreConfigBuilder::new()
//!     .with_in_memory_storage()
//!     .with_token_ttl(Duration::from_secs(15 * 60))
//!     .disable_revocation()
//!     .build();
//! assert_eq!(config.auth.ttl_secs, 900);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use album_auth::{AuthConfig, CredentialParams};
use album_protocol::MAX_PLAINTEXT_SIZE;

/// Main service configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Login and session token settings.
    pub auth: AuthConfig,

    /// Envelope storage settings.
    pub storage: StorageConfig,

    /// Message limits.
    pub messaging: MessagingConfig,
}

impl CoreConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }

    /// In-memory storage with cheap credential hashing, for tests.
    pub fn testing() -> Self {
        CoreConfigBuilder::new()
            .with_in_memory_storage()
            .with_credential_params(CredentialParams::testing())
            .build()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read and
    /// `ConfigError::Parse` if it is not valid JSON for this structure.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "auth.ttl_secs".into(),
                reason: "token lifetime must be greater than zero".into(),
            });
        }

        if let Err(e) = self.auth.credential.validate() {
            return Err(ConfigError::InvalidValue {
                field: "auth.credential".into(),
                reason: e.to_string(),
            });
        }

        if !self.storage.in_memory && self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.data_dir".into(),
                reason: "data directory cannot be empty when not using in-memory storage".into(),
            });
        }

        if self.messaging.max_plaintext_size == 0
            || self.messaging.max_plaintext_size > MAX_PLAINTEXT_SIZE
        {
            return Err(ConfigError::InvalidValue {
                field: "messaging.max_plaintext_size".into(),
                reason: format!("must be between 1 and {} bytes", MAX_PLAINTEXT_SIZE),
            });
        }

        Ok(())
    }
}

/// Storage configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the envelope database.
    ///
    /// Defaults to the platform data directory:
    /// - Linux: `~/.local/share/album`
    /// - macOS: `~/Library/Application Support/album`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\album`
    pub data_dir: PathBuf,

    /// Keep envelopes in memory only. Data is lost on shutdown.
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            in_memory: false,
        }
    }
}

/// Message limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Largest accepted plaintext in bytes.
    pub max_plaintext_size: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            max_plaintext_size: MAX_PLAINTEXT_SIZE,
        }
    }
}

/// Builder for [`CoreConfig`].
#[derive(Clone, Debug, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
        }
    }

    /// Build the final configuration.
    pub fn build(self) -> CoreConfig {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<CoreConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }

    // ===== Auth Configuration =====

    /// Set the session token lifetime. Sub-second parts are dropped.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.config.auth.ttl_secs = ttl.as_secs();
        self
    }

    /// Enable token revocation (default).
    pub fn enable_revocation(mut self) -> Self {
        self.config.auth.revocation_enabled = true;
        self
    }

    /// Disable token revocation.
    pub fn disable_revocation(mut self) -> Self {
        self.config.auth.revocation_enabled = false;
        self
    }

    /// Set the credential hashing cost.
    pub fn with_credential_params(mut self, params: CredentialParams) -> Self {
        self.config.auth.credential = params;
        self
    }

    // ===== Storage Configuration =====

    /// Set the data directory.
    pub fn with_data_dir(mut self, path: PathBuf) -> Self {
        self.config.storage.data_dir = path;
        self
    }

    /// Use in-memory storage.
    pub fn with_in_memory_storage(mut self) -> Self {
        self.config.storage.in_memory = true;
        self
    }

    /// Use disk storage (default).
    pub fn with_disk_storage(mut self) -> Self {
        self.config.storage.in_memory = false;
        self
    }

    // ===== Messaging Configuration =====

    /// Set the plaintext limit.
    pub fn with_max_plaintext_size(mut self, max: usize) -> Self {
        self.config.messaging.max_plaintext_size = max;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The field name.
        field: String,
        /// The reason it's invalid.
        reason: String,
    },

    /// Configuration file could not be read.
    #[error("Cannot read configuration: {0}")]
    Io(String),

    /// Configuration text is not valid.
    #[error("Cannot parse configuration: {0}")]
    Parse(String),
}

/// Get the default data directory for the current platform.
fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("album");
    }

    if let Some(home_dir) = dirs::home_dir() {
        return home_dir.join(".album");
    }

    PathBuf::from(".album")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.auth.ttl_secs, 3600);
        assert!(config.auth.revocation_enabled);
        assert_eq!(config.auth.credential, CredentialParams::default());
        assert!(!config.storage.in_memory);
        assert!(config.storage.data_dir.ends_with("album") || config.storage.data_dir.ends_with(".album"));
        assert_eq!(config.messaging.max_plaintext_size, MAX_PLAINTEXT_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CoreConfigBuilder::new()
            .with_in_memory_storage()
            .with_token_ttl(Duration::from_millis(90_500))
            .disable_revocation()
            .with_max_plaintext_size(4096)
            .build();
        assert!(config.storage.in_memory);
        assert_eq!(config.auth.ttl_secs, 90);
        assert!(!config.auth.revocation_enabled);
        assert_eq!(config.messaging.max_plaintext_size, 4096);
    }

    #[test]
    fn test_validation_zero_ttl() {
        let result = CoreConfigBuilder::new()
            .with_token_ttl(Duration::ZERO)
            .build_validated();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field, .. }) if field == "auth.ttl_secs"
        ));
    }

    #[test]
    fn test_validation_bad_credential_params() {
        let mut config = CoreConfig::testing();
        config.auth.credential.iterations = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "auth.credential"
        ));
    }

    #[test]
    fn test_validation_disk_storage_needs_dir() {
        let config = CoreConfigBuilder::new()
            .with_data_dir(PathBuf::new())
            .build();
        assert!(config.validate().is_err());

        let config = CoreConfigBuilder::new()
            .with_in_memory_storage()
            .with_data_dir(PathBuf::new())
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_plaintext_limit() {
        let config = CoreConfigBuilder::new()
            .with_max_plaintext_size(MAX_PLAINTEXT_SIZE + 1)
            .build();
        assert!(config.validate().is_err());
        let config = CoreConfigBuilder::new().with_max_plaintext_size(0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = CoreConfig::testing();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(CoreConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CoreConfig::from_json_str(r#"{ "auth": { "ttl_secs": 60 } }"#).unwrap();
        assert_eq!(config.auth.ttl_secs, 60);
        assert!(config.auth.revocation_enabled);
        assert_eq!(config.messaging, MessagingConfig::default());
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album.json");
        std::fs::write(&path, r#"{ "storage": { "in_memory": true } }"#).unwrap();
        assert!(CoreConfig::from_json_file(&path).unwrap().storage.in_memory);

        assert!(matches!(
            CoreConfig::from_json_file(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CoreConfig::from_json_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
