// Resolver module - turns media page URLs into queued streams

pub mod backends;
pub mod diagnostics;
pub mod dispatch;
pub mod errors;
pub mod host_table;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod process;
pub mod tools;
pub mod traits;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use dispatch::DispatchRouter;
pub use errors::ResolveError;
pub use host_table::HostMetadataTable;
pub use models::{Mode, ResolutionRequest, ResolutionResult, ResolveOutcome, ResolverIdentity, ResolverKind};
pub use orchestrator::Coordinator;
pub use tools::{ToolManager, ToolUpgrader};
pub use traits::{
    CaptionDelayCorrector, CaptionJob, CaptionTarget, Collaborators, DownloadQueue, PlaybackQueue,
    Prompter, ResolverBackend, UpgradeChoice, Upgrader,
};
