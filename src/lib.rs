pub mod config;
pub mod console;
pub mod logging;
pub mod resolver;

pub use config::Settings;
pub use resolver::{Coordinator, Mode, ResolveError, ResolveOutcome};
