//! # Configuration
//!
//! Layered application configuration. Values are resolved in this order,
//! later sources winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `SCHOLAR_AGGREGATOR_`, using `__`
//!    between nested keys (e.g. `SCHOLAR_AGGREGATOR_HTTP__TIMEOUT_SECS=60`)
//! 4. [`ConfigOverrides`] supplied on the command line
//!
//! API keys are kept out of the file on purpose and travel separately as
//! [`Credentials`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment prefix shared by configuration and credentials
pub const ENV_PREFIX: &str = "SCHOLAR_AGGREGATOR";

/// Upper bound on results per provider, matching the original search form
pub const MAX_RESULTS_LIMIT: u32 = 1000;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpSettings,
    pub providers: ProviderEndpoints,
    pub search: SearchSettings,
    pub logging: LoggingSettings,
}

/// Settings for the shared HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Connection establishment timeout in seconds
    pub connect_timeout_secs: u64,
    /// User agent sent to the JSON APIs
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!(
                "scholar-aggregator/{} (Academic Research Tool)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Base URLs of the external providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub google_scholar: String,
    pub crossref: String,
    pub semantic_scholar: String,
    pub science_direct: String,
    pub ieee_xplore: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            google_scholar: "https://scholar.google.com".to_string(),
            crossref: "https://api.crossref.org".to_string(),
            semantic_scholar: "https://api.semanticscholar.org".to_string(),
            science_direct: "https://api.elsevier.com".to_string(),
            ieee_xplore: "http://ieeexploreapi.ieee.org".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Point every provider at the same base URL (used against mock servers)
    #[must_use]
    pub fn all_at(base_url: &str) -> Self {
        Self {
            google_scholar: base_url.to_string(),
            crossref: base_url.to_string(),
            semantic_scholar: base_url.to_string(),
            science_direct: base_url.to_string(),
            ieee_xplore: base_url.to_string(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("google_scholar", self.google_scholar.as_str()),
            ("crossref", self.crossref.as_str()),
            ("semantic_scholar", self.semantic_scholar.as_str()),
            ("science_direct", self.science_direct.as_str()),
            ("ieee_xplore", self.ieee_xplore.as_str()),
        ]
        .into_iter()
    }
}

/// Search pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Results requested per provider when the caller gives no count
    pub default_max_results: u32,
    /// Size of the fan-out worker pool
    pub max_parallel_providers: usize,
    /// Entries per scholar result page
    pub scholar_page_size: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_max_results: 5,
            max_parallel_providers: 5,
            scholar_page_size: 10,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::invalid_input(
                "logging.format",
                format!("unknown log format '{other}' (expected 'pretty' or 'json')"),
            )),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Command line overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub default_max_results: Option<u32>,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    debug!(
                        "Looking for optional configuration at {}",
                        default_path.display()
                    );
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Default location of the configuration file
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scholar-aggregator").join("config.toml"))
    }

    /// Apply command line overrides and re-validate
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(timeout) = overrides.timeout_secs {
            self.http.timeout_secs = timeout;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level.clone_from(level);
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        if let Some(max_results) = overrides.default_max_results {
            self.search.default_max_results = max_results;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 || self.http.timeout_secs > 300 {
            return Err(Error::invalid_input(
                "http.timeout_secs",
                "Timeout must be between 1 and 300 seconds",
            ));
        }

        if self.http.connect_timeout_secs == 0 {
            return Err(Error::invalid_input(
                "http.connect_timeout_secs",
                "Connect timeout must be at least 1 second",
            ));
        }

        if self.http.user_agent.trim().is_empty() {
            return Err(Error::invalid_input(
                "http.user_agent",
                "User agent cannot be empty",
            ));
        }

        for (name, endpoint) in self.providers.iter() {
            url::Url::parse(endpoint).map_err(|e| {
                Error::invalid_input(format!("providers.{name}"), format!("Invalid URL: {e}"))
            })?;
        }

        if self.search.default_max_results == 0
            || self.search.default_max_results > MAX_RESULTS_LIMIT
        {
            return Err(Error::invalid_input(
                "search.default_max_results",
                format!("Must be between 1 and {MAX_RESULTS_LIMIT}"),
            ));
        }

        if self.search.max_parallel_providers == 0 {
            return Err(Error::invalid_input(
                "search.max_parallel_providers",
                "Worker pool needs at least one slot",
            ));
        }

        if self.search.scholar_page_size == 0 {
            return Err(Error::invalid_input(
                "search.scholar_page_size",
                "Page size must be at least 1",
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Optional API keys for the providers that need them
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub science_direct_key: Option<String>,
    pub ieee_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("science_direct_key", &redact(&self.science_direct_key))
            .field("ieee_key", &redact(&self.ieee_key))
            .finish()
    }
}

impl Credentials {
    #[must_use]
    pub fn new(science_direct_key: Option<String>, ieee_key: Option<String>) -> Self {
        Self {
            science_direct_key: non_blank(science_direct_key),
            ieee_key: non_blank(ieee_key),
        }
    }

    /// Read `SCHOLAR_AGGREGATOR_SCIENCE_DIRECT_KEY` and `SCHOLAR_AGGREGATOR_IEEE_KEY`
    pub fn from_env() -> Result<Self> {
        let raw: Self = envy::prefixed(format!("{ENV_PREFIX}_")).from_env()?;
        Ok(Self::new(raw.science_direct_key, raw.ieee_key))
    }

    /// Keep keys from `other` where this set has none
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            science_direct_key: self.science_direct_key.or(other.science_direct_key),
            ieee_key: self.ieee_key.or(other.ieee_key),
        }
    }

    #[must_use]
    pub fn science_direct_key(&self) -> Option<&str> {
        self.science_direct_key.as_deref()
    }

    #[must_use]
    pub fn ieee_key(&self) -> Option<&str> {
        self.ieee_key.as_deref()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.max_parallel_providers, 5);
        assert_eq!(config.search.default_max_results, 5);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.http.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
        config.http.timeout_secs = 30;

        config.providers.crossref = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
        config.providers.crossref = "https://api.crossref.org".to_string();

        config.search.default_max_results = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
        config.search.default_max_results = MAX_RESULTS_LIMIT + 1;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
        config.search.default_max_results = 5;

        config.search.max_parallel_providers = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_overrides() {
        let overrides = ConfigOverrides {
            timeout_secs: Some(60),
            log_level: Some("debug".to_string()),
            log_format: Some(LogFormat::Json),
            default_max_results: Some(20),
        };
        let config = Config::default().apply_overrides(&overrides).unwrap();
        assert_eq!(config.http.timeout_secs, 60);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.search.default_max_results, 20);

        let bad = ConfigOverrides {
            timeout_secs: Some(0),
            ..ConfigOverrides::default()
        };
        assert!(Config::default().apply_overrides(&bad).is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_credentials_blank_keys_are_absent() {
        let creds = Credentials::new(Some("   ".to_string()), Some("key".to_string()));
        assert_eq!(creds.science_direct_key(), None);
        assert_eq!(creds.ieee_key(), Some("key"));
    }

    #[test]
    fn test_credentials_debug_redacts_keys() {
        let creds = Credentials::new(Some("secret-sd".to_string()), None);
        let printed = format!("{creds:?}");
        assert!(!printed.contains("secret-sd"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_credentials_or() {
        let cli = Credentials::new(None, Some("cli-ieee".to_string()));
        let env = Credentials::new(Some("env-sd".to_string()), Some("env-ieee".to_string()));
        let merged = cli.or(env);
        assert_eq!(merged.science_direct_key(), Some("env-sd"));
        assert_eq!(merged.ieee_key(), Some("cli-ieee"));
    }

    #[test]
    fn test_to_toml_round_trips_sections() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[http]"));
        assert!(rendered.contains("[providers]"));
        assert!(rendered.contains("max_parallel_providers = 5"));
    }
}
