//! Error types for the wayline engine

use thiserror::Error;

/// Result type alias for wayline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the wayline engine
///
/// Provider adapters and the POI resolver catch their internal failures and
/// convert them into fallbacks where possible; anything surfacing here is
/// either fatal (`Config`), rejected locally (`InvalidInput`), or the end of
/// the fallback chain.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid credentials — fatal, never retried
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed coordinates or query — rejected locally, never sent upstream
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network failure, timeout or malformed response from a routing provider
    #[error("provider unavailable: {0}")]
    Provider(String),

    /// Empty result set after all retries and fallbacks
    #[error("no results: {0}")]
    NoResults(String),

    /// Narration or routing canceled by a newer user action
    #[error("interrupted")]
    Interrupted,

    /// Speech synthesis or narration sink failure
    #[error("narration error: {0}")]
    Narration(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
