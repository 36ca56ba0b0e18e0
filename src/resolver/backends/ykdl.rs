use std::path::{Path, PathBuf};

use crate::resolver::models::{ResolutionResult, ResolverKind};
use crate::resolver::parser::{self, StreamOrder};
use crate::resolver::tools::ToolManager;
use crate::resolver::traits::ResolverBackend;

pub struct YkdlBackend {
    binary_path: PathBuf,
    preferred_stream: Option<String>,
}

impl YkdlBackend {
    pub fn new() -> Self {
        Self::with_path(ToolManager::new().locate(ResolverKind::Ykdl))
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

impl Default for YkdlBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBackend for YkdlBackend {
    fn name(&self) -> &'static str {
        "ykdl"
    }

    fn program(&self) -> &Path {
        &self.binary_path
    }

    fn args(&self, url: &str) -> Vec<String> {
        vec!["--json".to_string(), url.to_string()]
    }

    fn parse(&self, stdout: &[u8]) -> ResolutionResult {
        parser::parse(stdout, StreamOrder::Declared, self.preferred_stream.as_deref())
    }
}
