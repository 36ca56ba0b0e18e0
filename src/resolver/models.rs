// Common data models for resolution

use serde::{Deserialize, Serialize};
use std::fmt;

use super::utils::file_stem;

/// What to do with the resolved streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Download,
    Play,
}

/// One of the two configured resolver slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverIdentity {
    #[default]
    Primary,
    Secondary,
}

impl ResolverIdentity {
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

impl fmt::Display for ResolverIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// Supported external resolver tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverKind {
    Ykdl,
    YouGet,
}

impl ResolverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverKind::Ykdl => "ykdl",
            ResolverKind::YouGet => "you-get",
        }
    }
}

/// A single user action: resolve `url` and route it according to `mode`.
///
/// `first_choice` never changes across a fallback, so the attempt knows
/// whether it is the first or the second one by comparing identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub url: String,
    pub mode: Mode,
    pub resolver: ResolverIdentity,
    pub first_choice: ResolverIdentity,
}

impl ResolutionRequest {
    pub fn new(url: impl Into<String>, mode: Mode, resolver: ResolverIdentity) -> Self {
        Self {
            url: url.into(),
            mode,
            resolver,
            first_choice: resolver,
        }
    }

    pub fn is_first_attempt(&self) -> bool {
        self.resolver == self.first_choice
    }

    /// Same URL and mode, handed to the other resolver
    pub fn fallback(&self) -> Self {
        Self {
            url: self.url.clone(),
            mode: self.mode,
            resolver: self.resolver.other(),
            first_choice: self.first_choice,
        }
    }
}

/// Structured output of one resolver run.
///
/// An empty `stream_urls` means the resolver failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub title: String,
    pub container: String,
    pub stream_urls: Vec<String>,
    /// Same length and order as `stream_urls`
    pub file_names: Vec<String>,
    pub caption_url: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub seekable: bool,
    /// Exactly two entries, video then audio
    pub is_adaptive: bool,
}

impl Default for ResolutionResult {
    fn default() -> Self {
        Self {
            title: String::new(),
            container: String::new(),
            stream_urls: Vec::new(),
            file_names: Vec::new(),
            caption_url: None,
            referer: None,
            user_agent: None,
            seekable: true,
            is_adaptive: false,
        }
    }
}

impl ResolutionResult {
    pub fn is_empty(&self) -> bool {
        self.stream_urls.is_empty()
    }

    pub fn stream_count(&self) -> usize {
        self.stream_urls.len()
    }

    /// Directory name used for multi-stream downloads
    pub fn batch_dir_name(&self) -> String {
        format!("{}.{}", file_stem(&self.title), self.container)
    }
}

/// What `resolve` reports back after a successful dispatch
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub resolver: ResolverIdentity,
    pub resolver_name: &'static str,
    pub used_fallback: bool,
    pub result: ResolutionResult,
}
