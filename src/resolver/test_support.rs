// Fakes shared by the resolver unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::host_table::HostMetadataTable;
use super::models::ResolutionResult;
use super::parser::{self, StreamOrder};
use super::traits::{
    CaptionDelayCorrector, CaptionJob, DownloadQueue, PlaybackQueue, Prompter, ResolverBackend,
    UpgradeChoice, Upgrader,
};
use super::utils::host_of;

/// Backend running an `sh -c` script; the URL is `$1`
pub struct ScriptBackend {
    name: &'static str,
    program: PathBuf,
    script: String,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl ScriptBackend {
    pub fn new(name: &'static str, script: &str) -> Self {
        Self {
            name,
            program: PathBuf::from("sh"),
            script: script.to_string(),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Script that prints `json` on stdout and `stderr` on stderr
    pub fn printing(name: &'static str, json: &str, stderr: &str) -> Self {
        let script = format!(
            "cat <<'JSON_EOF'\n{}\nJSON_EOF\nprintf '%s' '{}' >&2",
            json, stderr
        );
        Self::new(name, &script)
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = PathBuf::from(program);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

impl ResolverBackend for ScriptBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn program(&self) -> &Path {
        &self.program
    }

    fn args(&self, url: &str) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        vec![
            "-c".to_string(),
            self.script.clone(),
            "sh".to_string(),
            url.to_string(),
        ]
    }

    fn parse(&self, stdout: &[u8]) -> ResolutionResult {
        parser::parse(stdout, StreamOrder::Declared, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Download {
        url: String,
        destination: PathBuf,
        batch: bool,
        caption: Option<String>,
    },
    PlayNow {
        name: String,
        url: String,
        caption: Option<String>,
    },
    PlayAdaptive {
        title: String,
        video: String,
        audio: String,
    },
    Append {
        name: String,
        url: String,
    },
    CloseSelection,
    Caption(CaptionJob),
    Upgrade,
    Info(String),
    Warn(String),
    ConfirmUpgrade(String),
}

/// Records every collaborator call in order
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    choice: UpgradeChoice,
    hosts: Option<Arc<HostMetadataTable>>,
    seekable_at_enqueue: Mutex<Vec<bool>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Self::build(UpgradeChoice::Cancel, None)
    }

    pub fn choosing(choice: UpgradeChoice) -> Arc<Self> {
        Self::build(choice, None)
    }

    /// Also records whether each enqueued stream's host was already marked
    /// unseekable at the time of the call
    pub fn watching(hosts: Arc<HostMetadataTable>) -> Arc<Self> {
        Self::build(UpgradeChoice::Cancel, Some(hosts))
    }

    fn build(choice: UpgradeChoice, hosts: Option<Arc<HostMetadataTable>>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            choice,
            hosts,
            seekable_at_enqueue: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Warn(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn seekable_at_enqueue(&self) -> Vec<bool> {
        self.seekable_at_enqueue.lock().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }

    fn observe(&self, url: &str) {
        if let (Some(hosts), Some(host)) = (&self.hosts, host_of(url)) {
            self.seekable_at_enqueue.lock().push(hosts.is_seekable(&host));
        }
    }
}

impl DownloadQueue for Recorder {
    fn add_task(&self, url: &str, destination: &Path, batch: bool, caption_url: Option<&str>) {
        self.observe(url);
        self.push(Event::Download {
            url: url.to_string(),
            destination: destination.to_path_buf(),
            batch,
            caption: caption_url.map(str::to_string),
        });
    }
}

impl PlaybackQueue for Recorder {
    fn add_file_and_play(&self, name: &str, url: &str, caption_url: Option<&str>) {
        self.observe(url);
        self.push(Event::PlayNow {
            name: name.to_string(),
            url: url.to_string(),
            caption: caption_url.map(str::to_string),
        });
    }

    fn add_adaptive_and_play(&self, title: &str, video_url: &str, audio_url: &str) {
        self.observe(video_url);
        self.push(Event::PlayAdaptive {
            title: title.to_string(),
            video: video_url.to_string(),
            audio: audio_url.to_string(),
        });
    }

    fn add_file(&self, name: &str, url: &str) {
        self.observe(url);
        self.push(Event::Append {
            name: name.to_string(),
            url: url.to_string(),
        });
    }

    fn close_selection(&self) {
        self.push(Event::CloseSelection);
    }
}

impl CaptionDelayCorrector for Recorder {
    fn correct(&self, job: CaptionJob) {
        for url in &job.stream_urls {
            self.observe(url);
        }
        self.push(Event::Caption(job));
    }
}

impl Upgrader for Recorder {
    fn run_upgrade(&self) {
        self.push(Event::Upgrade);
    }
}

#[async_trait]
impl Prompter for Recorder {
    fn info(&self, message: &str) {
        self.push(Event::Info(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.push(Event::Warn(message.to_string()));
    }

    async fn confirm_upgrade(&self, message: &str) -> UpgradeChoice {
        self.push(Event::ConfirmUpgrade(message.to_string()));
        self.choice
    }
}
