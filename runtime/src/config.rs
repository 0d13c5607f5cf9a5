//! Configuration loading.
//!
//! Configuration comes from a TOML file, optionally overridden by
//! environment variables:
//!
//! | Variable | Effect |
//! |---|---|
//! | `COURIER_CONFIG` | path of the TOML file to load |
//! | `COURIER_BASE_URL` | overrides `base_url` |
//! | `COURIER_USER_AGENT` | overrides `user_agent` |
//!
//! # Example
//!
//! ```
//! use courier_runtime::config::CourierConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CourierConfig::from_toml_str(r#"
//!     base_url = "https://shop.example.com/"
//!     default_timeout_ms = 5000
//!
//!     [default_options]
//!     history = false
//!
//!     [default_options.fetch.headers]
//!     Accept = "application/json"
//! "#)?;
//!
//! let orchestrator = config.build()?;
//! assert_eq!(orchestrator.base_url().as_str(), "https://shop.example.com/");
//! # Ok(())
//! # }
//! ```

use crate::orchestrator::{default_base_url, Orchestrator};
use courier_core::Options;
use courier_http::{ReqwestTransport, TransportBuildError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Env var naming the configuration file
pub const CONFIG_PATH_VAR: &str = "COURIER_CONFIG";
/// Env var overriding the base URL
pub const BASE_URL_VAR: &str = "COURIER_BASE_URL";
/// Env var overriding the user agent
pub const USER_AGENT_VAR: &str = "COURIER_USER_AGENT";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The TOML could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was rejected by validation
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// The HTTP client could not be built
    #[error(transparent)]
    Transport(#[from] TransportBuildError),
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Location relative targets are resolved against
    pub base_url: Url,

    /// `User-Agent` sent by the HTTP client
    pub user_agent: Option<String>,

    /// Timeout armed by [`TimeoutExtension`](crate::extensions::TimeoutExtension)
    /// when a call sets none
    pub default_timeout_ms: Option<u64>,

    /// Process-wide defaults passed to `initialize`
    pub default_options: Options,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: None,
            default_timeout_ms: None,
            default_options: Options::default(),
        }
    }
}

impl CourierConfig {
    /// Parse and validate TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::Validation` for rejected values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load from `COURIER_CONFIG` (defaults when unset), then apply the
    /// `COURIER_BASE_URL` and `COURIER_USER_AGENT` overrides.
    ///
    /// # Errors
    ///
    /// As [`from_file`](Self::from_file); `ConfigError::Validation` when an
    /// override is not acceptable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match var(CONFIG_PATH_VAR) {
            Some(path) => {
                tracing::debug!(path = %path, "loading configuration file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        if let Some(base_url) = var(BASE_URL_VAR) {
            config.base_url = Url::parse(&base_url).map_err(|e| {
                ConfigError::Validation(format!("{BASE_URL_VAR}={base_url}: {e}"))
            })?;
        }
        if let Some(user_agent) = var(USER_AGENT_VAR) {
            config.user_agent = Some(user_agent);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when the base URL is not http(s) or
    /// the default timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "base_url must be http or https, got {}",
                self.base_url
            )));
        }
        if self.default_timeout_ms == Some(0) {
            return Err(ConfigError::Validation(
                "default_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Default timeout as a duration
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    /// Build an orchestrator over a `reqwest` transport.
    ///
    /// The orchestrator is not initialized; pass
    /// [`default_options`](Self::default_options) to
    /// [`Orchestrator::initialize`] once extensions are registered.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Transport` if the HTTP client cannot be built.
    pub fn build(&self) -> Result<Orchestrator, ConfigError> {
        let transport = match &self.user_agent {
            Some(user_agent) => ReqwestTransport::with_user_agent(user_agent)?,
            None => ReqwestTransport::new(),
        }
        .with_origin(&self.base_url);

        Ok(Orchestrator::builder()
            .transport(Arc::new(transport))
            .base_url(self.base_url.clone())
            .build())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::orchestrator::DEFAULT_BASE_URL;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CourierConfig::from_toml_str("").expect("empty configuration is valid");
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert!(config.user_agent.is_none());
        assert!(config.default_timeout().is_none());
    }

    #[test]
    fn test_parses_default_options() {
        let config = CourierConfig::from_toml_str(
            r#"
            base_url = "https://example.com/app/"
            default_timeout_ms = 250

            [default_options]
            unique = false

            [default_options.fetch]
            credentials = "include"
            "#,
        )
        .expect("valid configuration");

        assert_eq!(config.default_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.default_options.flag("unique"), Some(false));
        assert_eq!(
            config.default_options.fetch.credentials(),
            courier_core::Credentials::Include
        );
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = CourierConfig::from_toml_str(r#"base_url = "file:///tmp/index.html""#);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = CourierConfig::from_toml_str("default_timeout_ms = 0");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = CourierConfig::from_toml_str("base_url = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = CourierConfig::from_file("/nonexistent/courier.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"base_url = "https://file.example.com/""#)
            .unwrap();
        writeln!(file, r#"user_agent = "from-file""#).unwrap();

        let vars: HashMap<&str, String> = HashMap::from([
            (CONFIG_PATH_VAR, file.path().display().to_string()),
            (BASE_URL_VAR, "https://env.example.com/".to_string()),
        ]);
        let config = CourierConfig::from_vars(|name| vars.get(name).cloned())
            .expect("valid configuration");

        assert_eq!(config.base_url.as_str(), "https://env.example.com/");
        assert_eq!(config.user_agent.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_env_rejects_bad_base_url() {
        let config = CourierConfig::from_vars(|name| {
            (name == BASE_URL_VAR).then(|| "not a url".to_string())
        });
        assert!(matches!(config, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_build_uses_base_url() {
        let config = CourierConfig {
            base_url: Url::parse("https://shop.example.com/").unwrap(),
            user_agent: Some("courier-test".to_string()),
            ..CourierConfig::default()
        };
        let orchestrator = config.build().expect("client builds");
        assert_eq!(orchestrator.base_url().as_str(), "https://shop.example.com/");
    }
}
