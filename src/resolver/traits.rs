// Resolver backend trait and the collaborator boundaries dispatch hands off to

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::models::ResolutionResult;

/// Trait for external resolver tools
pub trait ResolverBackend: Send + Sync {
    /// Name of the tool (for logging and user messages)
    fn name(&self) -> &'static str;

    /// Executable to spawn
    fn program(&self) -> &Path;

    /// Full argument list for resolving `url`
    fn args(&self, url: &str) -> Vec<String>;

    /// Turn captured stdout into a result; never fails, empty means failure
    fn parse(&self, stdout: &[u8]) -> ResolutionResult;
}

/// Download queue owned by the host application
pub trait DownloadQueue: Send + Sync {
    fn add_task(&self, url: &str, destination: &Path, batch: bool, caption_url: Option<&str>);
}

/// Playlist owned by the host application
pub trait PlaybackQueue: Send + Sync {
    /// Append and start playing immediately
    fn add_file_and_play(&self, name: &str, url: &str, caption_url: Option<&str>);

    /// Play a video-only stream with a separate audio track
    fn add_adaptive_and_play(&self, title: &str, video_url: &str, audio_url: &str);

    /// Append without starting playback
    fn add_file(&self, name: &str, url: &str);

    /// Close any open stream-selection surface
    fn close_selection(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionTarget {
    Download,
    Play,
}

/// Work handed to the caption delay corrector.
///
/// For downloads `file_names` are full destination paths, for playback they
/// are display names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionJob {
    pub file_names: Vec<PathBuf>,
    pub stream_urls: Vec<String>,
    pub caption_url: String,
    pub target: CaptionTarget,
}

/// Fetches the caption track, aligns it per stream, then enqueues the streams itself
pub trait CaptionDelayCorrector: Send + Sync {
    fn correct(&self, job: CaptionJob);
}

/// Fire-and-forget resolver upgrade
pub trait Upgrader: Send + Sync {
    fn run_upgrade(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeChoice {
    Cancel,
    Upgrade,
}

/// User-facing message surface
#[async_trait]
pub trait Prompter: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    /// Terminal failure dialog offering Cancel / Upgrade
    async fn confirm_upgrade(&self, message: &str) -> UpgradeChoice;
}

/// Everything the coordinator and the router hand work to
#[derive(Clone)]
pub struct Collaborators {
    pub downloads: Arc<dyn DownloadQueue>,
    pub playlist: Arc<dyn PlaybackQueue>,
    pub captions: Arc<dyn CaptionDelayCorrector>,
    pub upgrader: Arc<dyn Upgrader>,
    pub prompter: Arc<dyn Prompter>,
}
