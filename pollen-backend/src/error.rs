//! Error types for the pollen client.

use thiserror::Error;

/// Why a refresh could not obtain a usable payload. Any of these aborts the
/// whole `update()` cycle before the store is touched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, connection failure or non-2xx response
    #[error("network error: {0}")]
    Network(String),

    /// Response body is not well-formed JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed JSON without the expected top-level structure
    #[error("schema error: {0}")]
    Schema(String),
}

impl FetchError {
    /// Only network failures can succeed on a second try
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Parse(_) => "parse",
            FetchError::Schema(_) => "schema",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e.to_string())
    }
}

/// Reason a single pollen entry was left out of a refresh
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing level")]
    MissingLevel,

    #[error("invalid level {0:?}")]
    InvalidLevel(String),

    #[error("invalid date {0:?}")]
    InvalidDate(String),

    #[error("invalid in-season flag {0:?}")]
    InvalidSeason(String),
}

/// A pollen entry the normalizer skipped. Logged and counted, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("skipped pollen {pollen_id} in region {region_id}: {reason}")]
pub struct EntitySkipped {
    pub region_id: u32,
    pub pollen_id: u32,
    pub reason: SkipReason,
}

/// Client construction errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unknown region id {0}")]
    UnknownRegion(u32),

    #[error("unknown pollen id {0}")]
    UnknownPollen(u32),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("configuration already loaded")]
    AlreadyLoaded,
}
