use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::resolver::errors::ResolveError;
use crate::resolver::models::{ResolverIdentity, ResolverKind};

/// Which tool backs a resolver slot, and where its executable lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverBinding {
    pub kind: ResolverKind,
    /// Explicit executable; located on the system when absent
    #[serde(default)]
    pub program: Option<String>,
}

/// Global configuration loaded from `~/.config/media-resolver/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory for downloads
    pub download_dir: PathBuf,
    /// Resolver tried first for every request
    pub default_resolver: ResolverIdentity,
    /// Stream id to pick when the resolver offers it (e.g. "BD", "mp4hd")
    pub preferred_stream: Option<String>,
    /// Kill a resolver that runs longer than this; no limit when absent
    pub resolve_timeout_secs: Option<u64>,
    /// Program and arguments run when the user chooses to upgrade
    pub upgrade_command: Vec<String>,
    pub primary: ResolverBinding,
    pub secondary: ResolverBinding,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            default_resolver: ResolverIdentity::Primary,
            preferred_stream: None,
            resolve_timeout_secs: None,
            upgrade_command: ["pip3", "install", "--upgrade", "ykdl", "you-get"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            primary: ResolverBinding {
                kind: ResolverKind::Ykdl,
                program: None,
            },
            secondary: ResolverBinding {
                kind: ResolverKind::YouGet,
                program: None,
            },
        }
    }
}

impl Settings {
    pub fn binding(&self, identity: ResolverIdentity) -> &ResolverBinding {
        match identity {
            ResolverIdentity::Primary => &self.primary,
            ResolverIdentity::Secondary => &self.secondary,
        }
    }

    pub fn resolve_timeout(&self) -> Option<Duration> {
        self.resolve_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

pub fn config_path() -> Result<PathBuf, ResolveError> {
    dirs::config_dir()
        .map(|dir| dir.join("media-resolver").join("config.toml"))
        .ok_or_else(|| ResolveError::Config("cannot determine config directory".to_string()))
}

/// Load configuration from `path`, creating a default file if none exists.
pub fn load_or_init(path: &Path) -> Result<Settings, ResolveError> {
    if !path.exists() {
        let default_cfg = Settings::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: Settings = toml::from_str(&data)?;
    if cfg.primary.kind == cfg.secondary.kind {
        tracing::warn!(
            "primary and secondary resolvers are both {}; fallback will retry the same tool",
            cfg.primary.kind.as_str()
        );
    }
    Ok(cfg)
}
