use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use media_resolver_lib::config::{self, Settings};
use media_resolver_lib::console::Console;
use media_resolver_lib::logging;
use media_resolver_lib::resolver::{
    Coordinator, HostMetadataTable, Mode, ToolManager, ToolUpgrader, UpgradeChoice,
};

#[derive(Debug, Parser)]
#[command(name = "media-resolver")]
#[command(about = "Resolve media page URLs with ykdl/you-get and queue the streams", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/media-resolver/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a URL and queue its streams for playback.
    Play {
        url: String,
        /// What to do when both resolvers fail.
        #[arg(long, value_enum, default_value = "ask")]
        on_failure: OnFailure,
    },

    /// Resolve a URL and queue its streams for download.
    Download {
        url: String,
        /// What to do when both resolvers fail.
        #[arg(long, value_enum, default_value = "ask")]
        on_failure: OnFailure,
    },

    /// Show installed resolver tools and their versions.
    Tools,

    /// Run the configured upgrade command.
    Upgrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnFailure {
    Ask,
    Upgrade,
    Cancel,
}

impl OnFailure {
    fn answer(self) -> Option<UpgradeChoice> {
        match self {
            Self::Ask => None,
            Self::Upgrade => Some(UpgradeChoice::Upgrade),
            Self::Cancel => Some(UpgradeChoice::Cancel),
        }
    }
}

#[tokio::main]
async fn main() {
    logging::init_logging();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("media-resolver error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };
    let settings = config::load_or_init(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    tracing::debug!("loaded config: {:?}", settings);

    match cli.command {
        Command::Play { url, on_failure } => resolve(&settings, &url, Mode::Play, on_failure).await,
        Command::Download { url, on_failure } => {
            resolve(&settings, &url, Mode::Download, on_failure).await
        }
        Command::Tools => {
            for tool in ToolManager::new().get_all_tools() {
                println!(
                    "{}\t{}\t{}",
                    tool.name,
                    tool.version.as_deref().unwrap_or("-"),
                    tool.path.as_deref().unwrap_or("not installed")
                );
            }
            Ok(())
        }
        Command::Upgrade => upgrade(&settings).await,
    }
}

async fn resolve(settings: &Settings, url: &str, mode: Mode, on_failure: OnFailure) -> Result<()> {
    let upgrader = Arc::new(ToolUpgrader::new(settings.upgrade_command.clone()));
    let collaborators = Console::stdout(on_failure.answer()).into_collaborators(upgrader.clone());
    let coordinator = Coordinator::from_settings(settings, Arc::new(HostMetadataTable::new()), collaborators);

    let outcome = coordinator.resolve(url, mode).await;
    coordinator.shutdown().await;
    // The runtime stops with `main`, taking any background upgrade with it
    upgrader.wait().await;

    let outcome = outcome?;
    tracing::info!(
        "resolved '{}' with {}{}",
        outcome.result.title,
        outcome.resolver_name,
        if outcome.used_fallback { " (fallback)" } else { "" }
    );
    Ok(())
}

async fn upgrade(settings: &Settings) -> Result<()> {
    let upgrader = ToolUpgrader::new(settings.upgrade_command.clone());
    eprintln!("running {}", upgrader.command().join(" "));
    upgrader.run().await.map_err(anyhow::Error::msg)
}
