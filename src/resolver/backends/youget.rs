use std::path::{Path, PathBuf};

use crate::resolver::models::{ResolutionResult, ResolverKind};
use crate::resolver::parser::{self, StreamOrder};
use crate::resolver::tools::ToolManager;
use crate::resolver::traits::ResolverBackend;

pub struct YouGetBackend {
    binary_path: PathBuf,
    preferred_stream: Option<String>,
}

impl YouGetBackend {
    pub fn new() -> Self {
        Self::with_path(ToolManager::new().locate(ResolverKind::YouGet))
    }

    pub fn with_path(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            preferred_stream: None,
        }
    }

    pub fn with_preferred_stream(mut self, stream: Option<String>) -> Self {
        self.preferred_stream = stream;
        self
    }
}

impl Default for YouGetBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBackend for YouGetBackend {
    fn name(&self) -> &'static str {
        "you-get"
    }

    fn program(&self) -> &Path {
        &self.binary_path
    }

    fn args(&self, url: &str) -> Vec<String> {
        vec!["--json".to_string(), url.to_string()]
    }

    // you-get does not rank its streams, the largest one is the best quality
    fn parse(&self, stdout: &[u8]) -> ResolutionResult {
        parser::parse(stdout, StreamOrder::LargestFirst, self.preferred_stream.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_invocation() {
        let backend = YouGetBackend::with_path("/usr/bin/you-get");
        assert_eq!(backend.program(), Path::new("/usr/bin/you-get"));
        assert_eq!(backend.args("https://v.example/1"), vec!["--json", "https://v.example/1"]);
    }

    #[test]
    fn parses_youget_record() {
        let backend = YouGetBackend::with_path("you-get");
        let out = br#"{"url": "https://v.example/1", "title": "Song", "site": "Example",
            "streams": {"__default__": {"container": "mp4", "src": ["https://c.example.com/s.mp4"], "size": 12}},
            "extra": {"referer": "https://v.example/", "ua": "UA"}}"#;
        let r = backend.parse(out);
        assert_eq!(r.title, "Song");
        assert_eq!(r.stream_urls, vec!["https://c.example.com/s.mp4"]);
        assert_eq!(r.file_names, vec!["Song.mp4"]);
        assert_eq!(r.user_agent.as_deref(), Some("UA"));
    }
}
