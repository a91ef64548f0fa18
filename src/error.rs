use thiserror::Error;

/// Errors that can escape the search pipeline.
///
/// Provider failures never appear here: they are absorbed at the
/// adapter boundary and only ever show up in a provider report.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Environment error: {0}")]
    Env(#[from] envy::Error),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // Network setup errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Client errors (permanent - caller must fix the input)
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by caller input rather than the environment.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
