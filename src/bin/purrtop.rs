//! purrtop: a system monitor with a cat in it.
//!
//! Run: `purrtop`, quit with `q`, re-scatter the stars with `r`.

use anyhow::{Context, Result};
use clap::Parser;
use purrtop::app;
use purrtop::collectors::SystemReaders;
use purrtop::config::Config;
use purrtop::terminal::{install_panic_hook, CrosstermConsole};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// purrtop: CPU, RAM, GPU and network as a moody cat
#[derive(Parser, Debug)]
#[command(name = "purrtop")]
#[command(author = "PAIML Team")]
#[command(version)]
#[command(about = "Mood-reactive terminal system monitor", long_about = None)]
struct Cli {
    /// Config file path [default: <config dir>/purrtop/config.yaml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append logs to this file (the screen is taken by the monitor)
    #[arg(long, env = "PURRTOP_LOG")]
    log_file: Option<PathBuf>,

    /// Frames per second, overrides the config file
    #[arg(long)]
    fps: Option<u32>,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to install log subscriber")
}

fn load_config(cli: &Cli) -> Config {
    let mut config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) if cli.config.is_some() || path.exists() => match Config::load(&path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using default config");
                Config::default()
            }
        },
        _ => Config::default(),
    };

    if let Some(fps) = cli.fps.filter(|&fps| fps > 0) {
        config.global.frame_rate = fps;
    }
    config
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }
    tracing::info!(version = purrtop::VERSION, "starting");

    let config = load_config(&cli);

    install_panic_hook();
    let mut readers = SystemReaders::open();
    let mut console = CrosstermConsole::new();

    app::run(&config, &mut readers, &mut console).context("monitor stopped")?;
    Ok(())
}
