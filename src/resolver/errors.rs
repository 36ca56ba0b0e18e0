// Error types for resolution attempts

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolver already has a run in flight; the request is dropped
    #[error("{resolver}: another file is being parsed")]
    Busy { resolver: &'static str },

    /// The resolver exited but produced no usable stream records
    #[error("{resolver} returned no streams")]
    EmptyResult { resolver: &'static str, stderr: String },

    /// The resolver could not be launched, was killed or timed out
    #[error("{resolver} failed: {reason}")]
    ProcessFailure {
        resolver: &'static str,
        reason: String,
        stderr: String,
    },

    /// Both resolvers failed for the same URL
    #[error("parse failed for {url}")]
    DoubleFailure { url: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl ResolveError {
    /// Captured stderr of the failed run, empty for errors that carry none
    pub fn stderr(&self) -> &str {
        match self {
            Self::EmptyResult { stderr, .. }
            | Self::ProcessFailure { stderr, .. }
            | Self::DoubleFailure { stderr, .. } => stderr,
            _ => "",
        }
    }

    /// Whether the coordinator recovers from this error by switching resolvers
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyResult { .. } | Self::ProcessFailure { .. })
    }
}

impl From<toml::de::Error> for ResolveError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for ResolveError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Config(e.to_string())
    }
}
