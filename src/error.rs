use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("provider '{id}' is already registered")]
    DuplicateProvider { id: String },

    #[error("provider '{id}' is not registered")]
    UnknownProvider { id: String },
}

/// Errors raised while bringing a feed to life or while it runs.
///
/// None of these cross into consumer code as panics: the facade turns them
/// into a failed `subscribe` result or into entry state (inactive, fallback).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("no enabled provider serves exchange '{exchange}'")]
    NoProvider { exchange: String },

    #[error("connectivity client for '{exchange}' unavailable: {reason}")]
    ClientUnavailable { exchange: String, reason: String },

    #[error("operation {operation} is not supported by this client")]
    Unsupported { operation: &'static str },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid subscription key: {reason}")]
    InvalidKey { reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for a transport failure reported by a connectivity client.
    pub fn transport(reason: impl Into<String>) -> Self {
        FeedError::Transport(reason.into()).into()
    }

    /// True when the error came from the transport rather than configuration.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Feed(FeedError::Transport(_)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
