//! voicecue CLI - instructional audio playback for voice-feedback sessions
//!
//! Plays clips from the catalog through the same orchestrator the feedback
//! UI uses:
//! - `play` requests one clip on the regular or protected lane
//! - `queue` enqueues several clips and lets the queue drain
//! - `list`, `check` and `config` inspect the catalog and configuration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};

use voicecue::cli::{Cli, Commands, Display, PlayArgs, QueueArgs};
use voicecue::{
    ClipCatalog, LanePhase, MockViewport, Orchestrator, PlaybackConfig, PlaybackSession,
    RequestOptions, RodioBackend,
};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = if verbose { "voicecue=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::List { json }) => {
            let catalog = load_catalog(&config)?;
            if json {
                Display::show_clips_json(&catalog)?;
            } else {
                Display::show_clips(&catalog);
            }
        }
        Some(Commands::Play(args)) => {
            play(&config, cli.mute, &args).await?;
        }
        Some(Commands::Queue(args)) => {
            queue(&config, cli.mute, &args).await?;
        }
        Some(Commands::Check) => {
            let catalog = load_catalog(&config)?;
            let missing: Vec<_> = catalog.iter().filter(|c| !c.locator.is_file()).collect();
            Display::show_check(&missing, catalog.len());
            if !missing.is_empty() {
                std::process::exit(2);
            }
        }
        Some(Commands::Config) => {
            Display::show_config(&config)?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

/// Default configuration file location.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("voicecue").join("config.json"))
}

/// Loads the configuration from `--config`, the default location, or defaults.
fn load_config(cli: &Cli) -> Result<PlaybackConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => default_config_path().filter(|path| path.is_file()),
    };

    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Loaded configuration file");
            serde_json::from_str::<PlaybackConfig>(&content)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => PlaybackConfig::default(),
    };

    if let Some(dir) = &cli.audio_dir {
        config.audio_dir = dir.clone();
    }
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    Ok(config)
}

fn load_catalog(config: &PlaybackConfig) -> Result<ClipCatalog> {
    ClipCatalog::from_config(config).context("failed to load clip catalog")
}

// ============================================================================
// Playback commands
// ============================================================================

fn start_session(config: &PlaybackConfig, mute: bool) -> Result<PlaybackSession> {
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let backend = RodioBackend::spawn(poll_interval, mute).context("failed to start audio output")?;
    let session = PlaybackSession::start(config, Arc::new(backend), Arc::new(MockViewport::new()))
        .context("failed to load clip catalog")?;
    Ok(session)
}

async fn play(config: &PlaybackConfig, mute: bool, args: &PlayArgs) -> Result<()> {
    if !load_catalog(config)?.contains(&args.key) {
        bail!("unknown clip: {}", args.key);
    }

    let session = start_session(config, mute)?;
    let orchestrator = session.orchestrator().clone();
    let outcome = if args.protected {
        orchestrator
            .request_protected(&args.key, RequestOptions::default())
            .await
    } else {
        orchestrator
            .request_regular(&args.key, RequestOptions::default())
            .await
    };
    Display::show_outcome(&args.key, outcome);

    if outcome.did_play() {
        wait_until_quiet(&orchestrator).await;
    }
    session.shutdown();
    Ok(())
}

async fn queue(config: &PlaybackConfig, mute: bool, args: &QueueArgs) -> Result<()> {
    let catalog = load_catalog(config)?;
    if let Some(item) = args.items.iter().find(|item| !catalog.contains(&item.key)) {
        bail!("unknown clip: {}", item.key);
    }

    let session = start_session(config, mute)?;
    let orchestrator = session.orchestrator().clone();
    for item in &args.items {
        let priority = item.priority.unwrap_or(config.default_priority);
        let outcome = orchestrator.enqueue_regular(&item.key, RequestOptions::priority(priority));
        Display::show_outcome(&item.key, outcome);
    }

    let played = wait_until_quiet(&orchestrator).await;
    Display::show_play_order(&played);
    session.shutdown();
    Ok(())
}

/// Waits until both lanes are idle and the queue is empty, or Ctrl-C.
///
/// Returns the keys that became audible, in order.
async fn wait_until_quiet(orchestrator: &Orchestrator) -> Vec<String> {
    let mut updates = orchestrator.subscribe();
    let mut played: Vec<String> = Vec::new();

    loop {
        let snapshot = updates.borrow_and_update().clone();
        let audible = [
            (snapshot.regular, &snapshot.regular_clip),
            (snapshot.protected, &snapshot.protected_clip),
        ];
        for (phase, clip) in audible {
            if let (LanePhase::Playing, Some(key)) = (phase, clip) {
                if played.last() != Some(key) {
                    played.push(key.clone());
                }
            }
        }
        if snapshot.is_quiet() {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping playback");
                orchestrator.stop_regular();
                orchestrator.stop_protected();
                break;
            }
        }
    }
    played
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
