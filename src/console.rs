//! Console collaborators used by the command-line binary.
//!
//! Queued downloads and playlist entries are printed one per line as
//! tab-separated records so other tools can consume them.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::resolver::traits::{
    CaptionDelayCorrector, CaptionJob, CaptionTarget, Collaborators, DownloadQueue, PlaybackQueue,
    Prompter, UpgradeChoice, Upgrader,
};

pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    /// Answer for the upgrade dialog; asks on stdin when absent
    answer: Option<UpgradeChoice>,
}

impl Console {
    pub fn stdout(answer: Option<UpgradeChoice>) -> Self {
        Self::with_writer(Box::new(io::stdout()), answer)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, answer: Option<UpgradeChoice>) -> Self {
        Self {
            out: Mutex::new(out),
            answer,
        }
    }

    /// Bundle this console with `upgrader` into the collaborator set
    pub fn into_collaborators(self, upgrader: Arc<dyn Upgrader>) -> Collaborators {
        let console = Arc::new(self);
        Collaborators {
            downloads: console.clone(),
            playlist: console.clone(),
            captions: console.clone(),
            upgrader,
            prompter: console,
        }
    }

    fn line(&self, fields: &[&str]) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", fields.join("\t")).and_then(|_| out.flush()) {
            tracing::debug!("console write failed: {}", e);
        }
    }
}

impl DownloadQueue for Console {
    fn add_task(&self, url: &str, destination: &Path, batch: bool, caption_url: Option<&str>) {
        let destination = destination.display().to_string();
        let kind = if batch { "download-batch" } else { "download" };
        self.line(&[kind, url, &destination, caption_url.unwrap_or("-")]);
    }
}

impl PlaybackQueue for Console {
    fn add_file_and_play(&self, name: &str, url: &str, caption_url: Option<&str>) {
        self.line(&["play", name, url, caption_url.unwrap_or("-")]);
    }

    fn add_adaptive_and_play(&self, title: &str, video_url: &str, audio_url: &str) {
        self.line(&["play-adaptive", title, video_url, audio_url]);
    }

    fn add_file(&self, name: &str, url: &str) {
        self.line(&["queue", name, url]);
    }

    fn close_selection(&self) {}
}

/// No delay correction on the console; streams are listed with the caption attached
impl CaptionDelayCorrector for Console {
    fn correct(&self, job: CaptionJob) {
        tracing::info!(
            "caption {} covers {} stream(s), listing without delay correction",
            job.caption_url,
            job.stream_urls.len()
        );
        for (i, (url, name)) in job.stream_urls.iter().zip(&job.file_names).enumerate() {
            match job.target {
                CaptionTarget::Download => {
                    self.add_task(url, name, true, Some(&job.caption_url));
                }
                CaptionTarget::Play if i == 0 => {
                    self.add_file_and_play(&name.display().to_string(), url, Some(&job.caption_url));
                }
                CaptionTarget::Play => {
                    self.add_file(&name.display().to_string(), url);
                }
            }
        }
    }
}

#[async_trait]
impl Prompter for Console {
    fn info(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn warn(&self, message: &str) {
        eprintln!("warning: {}", message);
    }

    async fn confirm_upgrade(&self, message: &str) -> UpgradeChoice {
        eprintln!("{}", message);
        if let Some(answer) = self.answer {
            return answer;
        }

        eprint!("Upgrade resolvers now? [y/N] ");
        let mut reply = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut reply).await {
            Ok(_) if matches!(reply.trim(), "y" | "Y" | "yes") => UpgradeChoice::Upgrade,
            Ok(_) => UpgradeChoice::Cancel,
            Err(e) => {
                tracing::warn!("could not read answer: {}", e);
                UpgradeChoice::Cancel
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn prints_tab_separated_records() {
        let buf = Buffer::default();
        let console = Console::with_writer(Box::new(buf.clone()), Some(UpgradeChoice::Cancel));

        console.add_task("https://c/1", Path::new("/dl/a.mp4"), false, None);
        console.add_adaptive_and_play("T", "https://v", "https://a");
        console.add_file("b.mp4", "https://c/2");

        assert_eq!(
            buf.lines(),
            vec![
                "download\thttps://c/1\t/dl/a.mp4\t-",
                "play-adaptive\tT\thttps://v\thttps://a",
                "queue\tb.mp4\thttps://c/2",
            ]
        );
    }

    #[test]
    fn caption_job_lists_streams_with_caption() {
        let buf = Buffer::default();
        let console = Console::with_writer(Box::new(buf.clone()), None);

        console.correct(CaptionJob {
            file_names: vec![PathBuf::from("e_0.flv"), PathBuf::from("e_1.flv")],
            stream_urls: vec!["https://c/0".to_string(), "https://c/1".to_string()],
            caption_url: "https://cm/1.xml".to_string(),
            target: CaptionTarget::Play,
        });

        assert_eq!(
            buf.lines(),
            vec!["play\te_0.flv\thttps://c/0\thttps://cm/1.xml", "queue\te_1.flv\thttps://c/1"]
        );
    }

    #[tokio::test]
    async fn preset_answer_skips_stdin() {
        let console = Console::with_writer(Box::new(Buffer::default()), Some(UpgradeChoice::Upgrade));
        assert_eq!(console.confirm_upgrade("Parse failed!").await, UpgradeChoice::Upgrade);
    }
}
