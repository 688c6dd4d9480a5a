//! aw-watcher-input CLI
//!
//! Reports keyboard and mouse activity to a local aw-server.

use anyhow::Context;
use aw_watcher_input::{
    client::{ClientConfig, QueuedClient},
    collector::{check_permission, Collector, CollectorConfig, InputHandler},
    config::Config,
    core::{KeyboardAggregator, MouseAggregator, SinceLastInputTracker},
    logging,
    watcher::Watcher,
    VERSION,
};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "aw-watcher-input")]
#[command(version = VERSION)]
#[command(about = "Watches keyboard and mouse activity and reports it to ActivityWatch", long_about = None)]
struct Cli {
    /// Address of the aw-server host
    #[arg(long)]
    host: Option<String>,

    /// Port of the aw-server instance
    #[arg(long)]
    port: Option<u16>,

    /// Run against the testing server
    #[arg(long)]
    testing: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Seconds without input before the user counts as AFK
    #[arg(long)]
    timeout: Option<f64>,

    /// Seconds between polls for input activity
    #[arg(long)]
    poll_time: Option<f64>,

    /// Print the resolved configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Write the resolved configuration to the config file and exit
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Apply command line overrides on top of the file configuration.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if self.port.is_some() {
            config.port = self.port;
        }
        if self.testing {
            config.testing = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(poll_time) = self.poll_time {
            config.poll_time = poll_time;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load();
    let config = cli.apply(loaded.as_ref().cloned().unwrap_or_default());

    let log_path = logging::init(cli.verbose, config.testing);
    if let Err(e) = loaded {
        warn!("Could not load {:?}, using defaults: {e}", Config::config_path());
    }
    if let Some(path) = log_path {
        info!("Logging to {}", path.display());
    }

    if cli.print_config {
        println!("Config file: {:?}", Config::config_path());
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    // Validate before anything is started
    let settings = config.settings()?;

    if cli.save_config {
        config.save()?;
        println!("Saved configuration to {:?}", Config::config_path());
        return Ok(());
    }

    // Installed first so a Ctrl+C during startup takes the clean stop path
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let keyboard = Arc::new(KeyboardAggregator::new());
    let mouse = Arc::new(MouseAggregator::new());

    let handler = InputHandler::new(keyboard.clone(), mouse.clone());
    let mut collector = Collector::new(CollectorConfig::default(), handler);
    collector.start().with_context(|| {
        if check_permission() {
            "Failed to start input collector".to_string()
        } else {
            "Failed to start input collector: input monitoring permission not granted".to_string()
        }
    })?;

    let client = QueuedClient::new(ClientConfig::new(config.host.clone(), config.server_port()))?;
    let bucket_id = client.bucket_id();
    match client.test_connection() {
        Ok(_) => info!("Connected to aw-server at {}", client.config().url()),
        Err(e) => warn!("aw-server not reachable yet, requests will be queued: {e}"),
    }

    let tracker = SinceLastInputTracker::new(keyboard, mouse);
    let mut watcher = Watcher::new(
        settings.timeout(),
        settings.poll_time(),
        bucket_id,
        tracker,
        client,
    )?
    .with_shutdown_flag(running);

    info!(
        timeout = settings.timeout(),
        poll_time = settings.poll_time(),
        "Watching input"
    );
    watcher.run();

    collector.stop();
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
