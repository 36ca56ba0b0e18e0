// Failure diagnostics - classifies resolver stderr
//
// The hint is appended to the warning shown to the user. It never changes
// the fallback decision; every failed run is retried once regardless.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Why a resolver run most likely failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The executable could not be started
    ToolNotInstalled,

    /// The site is not supported by this resolver
    UnsupportedUrl,

    /// The extractor crashed, usually because the site changed
    ExtractorBroken,

    /// HTTP 403 Forbidden
    Http403Forbidden,

    /// Geographic restriction
    GeoBlocked,

    /// Needs a logged-in account or VIP membership
    LoginRequired,

    /// Video deleted or unavailable
    VideoUnavailable,

    /// Network timeout or connection failure
    NetworkTimeout,

    Unknown,
}

impl FailureReason {
    /// Whether upgrading the resolver tools might fix it
    pub fn upgrade_might_help(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedUrl | Self::ExtractorBroken | Self::Http403Forbidden | Self::Unknown
        )
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::ToolNotInstalled => "The resolver is not installed or not on PATH.",
            Self::UnsupportedUrl => "This site is not supported by the resolver.",
            Self::ExtractorBroken => "The resolver crashed; the site may have changed. Upgrading the resolver may help.",
            Self::Http403Forbidden => "Access denied (HTTP 403).",
            Self::GeoBlocked => "The video is not available in your region.",
            Self::LoginRequired => "The video requires a logged-in or VIP account.",
            Self::VideoUnavailable => "The video is unavailable or has been removed.",
            Self::NetworkTimeout => "Network timeout. Check your connection or proxy.",
            Self::Unknown => "Unknown error.",
        }
    }
}

lazy_static! {
    static ref HTTP_403: Regex = Regex::new(r"\b403\b|\bforbidden\b").unwrap();
    static ref GEO_BLOCK: Regex = Regex::new(
        r"not available in your (country|region)|\bgeo[- ]?(blocked|restricted|restriction)\b|\bregion[- ]?(locked|restricted)\b"
    )
    .unwrap();
    static ref LOGIN: Regex = Regex::new(
        r"\blog ?in (is )?required\b|\bplease (log ?in|sign in)\b|\bsign in to\b|\bvip (only|member|required|account)\b|\brequires? (a )?vip\b"
    )
    .unwrap();
    static ref UNAVAILABLE: Regex =
        Regex::new(r"\b404\b|\bnot found\b|\bunavailable\b|\bhas been (removed|deleted)\b").unwrap();
}

/// Analyze resolver stderr (or a launch failure reason)
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    let lower = error.to_lowercase();

    if lower.contains("failed to start")
        || lower.contains("no such file or directory")
        || lower.contains("command not found")
    {
        return Some(FailureReason::ToolNotInstalled);
    }

    if lower.contains("unsupported url")
        || lower.contains("not supported")
        || lower.contains("unsupported site")
    {
        return Some(FailureReason::UnsupportedUrl);
    }

    if lower.contains("traceback (most recent call last)")
        || lower.contains("keyerror")
        || lower.contains("extractor error")
    {
        return Some(FailureReason::ExtractorBroken);
    }

    if HTTP_403.is_match(&lower) {
        return Some(FailureReason::Http403Forbidden);
    }

    if GEO_BLOCK.is_match(&lower) {
        return Some(FailureReason::GeoBlocked);
    }

    if LOGIN.is_match(&lower) {
        return Some(FailureReason::LoginRequired);
    }

    if UNAVAILABLE.is_match(&lower) {
        return Some(FailureReason::VideoUnavailable);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
    {
        return Some(FailureReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(FailureReason::Unknown);
    }

    None
}
