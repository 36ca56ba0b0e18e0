// Dispatch router: hands a successful resolution to the download or playback side

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::errors::ResolveError;
use super::host_table::HostMetadataTable;
use super::models::{Mode, ResolutionResult};
use super::traits::{CaptionJob, CaptionTarget, Collaborators};

pub const DOWNLOAD_ADDED_MESSAGE: &str = "Add download task successfully!";

pub struct DispatchRouter {
    download_dir: PathBuf,
    hosts: Arc<HostMetadataTable>,
    collaborators: Collaborators,
}

impl DispatchRouter {
    pub fn new(
        download_dir: impl Into<PathBuf>,
        hosts: Arc<HostMetadataTable>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            download_dir: download_dir.into(),
            hosts,
            collaborators,
        }
    }

    pub fn hosts(&self) -> &Arc<HostMetadataTable> {
        &self.hosts
    }

    pub fn dispatch(&self, result: &ResolutionResult, mode: Mode) -> Result<(), ResolveError> {
        // Collaborators read the table when they fetch, so it is filled before any enqueue
        self.hosts.register(result);

        if result.is_empty() {
            tracing::warn!("nothing to dispatch for '{}'", result.title);
            return Ok(());
        }

        match mode {
            Mode::Download => self.download(result),
            Mode::Play => {
                self.play(result);
                Ok(())
            }
        }
    }

    /// Download root for a single stream, `<root>/<title>.<container>` for several
    pub fn destination_dir(&self, result: &ResolutionResult) -> Result<PathBuf, ResolveError> {
        if result.stream_count() <= 1 {
            return Ok(self.download_dir.clone());
        }

        let dir = self.download_dir.join(result.batch_dir_name());
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
            tracing::debug!("created batch directory {}", dir.display());
        }
        Ok(dir)
    }

    fn download(&self, result: &ResolutionResult) -> Result<(), ResolveError> {
        let dir = self.destination_dir(result)?;
        let paths: Vec<PathBuf> = result.file_names.iter().map(|name| dir.join(name)).collect();
        let urls = &result.stream_urls;
        let batch = urls.len() > 1;

        match result.caption_url.as_deref() {
            Some(caption) if batch => {
                self.collaborators.captions.correct(CaptionJob {
                    file_names: paths,
                    stream_urls: urls.clone(),
                    caption_url: caption.to_string(),
                    target: CaptionTarget::Download,
                });
            }
            caption => {
                for (url, path) in urls.iter().zip(&paths) {
                    self.collaborators
                        .downloads
                        .add_task(url, path, batch, caption);
                }
            }
        }

        tracing::info!(
            "queued {} download(s) for '{}' into {}",
            urls.len(),
            result.title,
            dir.display()
        );
        self.collaborators.prompter.info(DOWNLOAD_ADDED_MESSAGE);
        Ok(())
    }

    fn play(&self, result: &ResolutionResult) {
        let playlist = &self.collaborators.playlist;
        let urls = &result.stream_urls;
        let names = &result.file_names;

        if result.is_adaptive && urls.len() >= 2 {
            playlist.add_adaptive_and_play(&result.title, &urls[0], &urls[1]);
            playlist.close_selection();
            return;
        }

        match result.caption_url.as_deref() {
            Some(caption) if urls.len() > 1 => {
                self.collaborators.captions.correct(CaptionJob {
                    file_names: names.iter().map(PathBuf::from).collect(),
                    stream_urls: urls.clone(),
                    caption_url: caption.to_string(),
                    target: CaptionTarget::Play,
                });
            }
            Some(caption) => {
                playlist.add_file_and_play(display_name(names, 0), &urls[0], Some(caption));
            }
            None => {
                playlist.add_file_and_play(display_name(names, 0), &urls[0], None);
                for (i, url) in urls.iter().enumerate().skip(1) {
                    playlist.add_file(display_name(names, i), url);
                }
                playlist.close_selection();
            }
        }
    }
}

fn display_name(names: &[String], index: usize) -> &str {
    names.get(index).map(String::as_str).unwrap_or_default()
}
