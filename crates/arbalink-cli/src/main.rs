//! Arbalink Control Tool
//!
//! Drives an Arbalet LED-matrix table over its serial link.

mod config;
mod session;
mod sink;

use anyhow::{Context, Result};
use arbalink_hw::{parse_hex_color, DeviceSelector, Framebuffer, SerialEngine};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use session::{LoopOptions, LoopStats};
use sink::PrintSink;

#[derive(Parser)]
#[command(name = "arbalink")]
#[command(about = "Serial link driver for Arbalet LED tables")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Platform family used to pick the device list (default: this host's)
    #[arg(long)]
    platform: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate devices for this platform
    Devices,
    /// Try each candidate once and report which one completes the handshake
    Probe,
    /// Push a solid colour to the table
    Fill {
        /// Color in hex format (e.g., #FF0000 for red)
        #[arg(long, default_value = "#FFFFFF")]
        color: String,

        /// Stop after this many frames (default: until Ctrl-C)
        #[arg(long)]
        frames: Option<u64>,
    },
    /// Print touch key frames while keeping the table dark
    Touch {
        /// Print one JSON object per frame
        #[arg(long)]
        json: bool,

        /// Stop after this many touch frames (default: until Ctrl-C)
        #[arg(long)]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => Config::default(),
    };
    let platform = cli
        .platform
        .unwrap_or_else(|| std::env::consts::FAMILY.to_string());

    match cli.command {
        Commands::Devices => handle_devices(&config, &platform),
        Commands::Probe => handle_probe(config, platform).await,
        Commands::Fill { color, frames } => handle_fill(config, &platform, &color, frames).await,
        Commands::Touch { json, count } => handle_touch(config, &platform, json, count).await,
    }
}

fn handle_devices(config: &Config, platform: &str) -> Result<()> {
    let selector = config.device_selector(platform)?;
    println!("Candidate devices ({}):", platform);
    for line in device_lines(&selector) {
        println!("{}", line);
    }
    Ok(())
}

/// One line per candidate, the current one marked with `*`.
fn device_lines(selector: &DeviceSelector) -> Vec<String> {
    selector
        .paths()
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let marker = if index == selector.cursor() { '*' } else { ' ' };
            format!("{} {}: {}", marker, index, path)
        })
        .collect()
}

async fn handle_probe(config: Config, platform: String) -> Result<()> {
    let paths = config.device_paths(&platform)?.to_vec();

    let found = tokio::task::spawn_blocking(move || -> Result<Option<String>> {
        for path in paths {
            let mut engine = config.build_engine(DeviceSelector::new([path.as_str()])?)?;
            match engine.connect() {
                Ok(true) => {
                    engine.close();
                    return Ok(Some(path));
                }
                Ok(false) => {}
                Err(e) => warn!("{}: {}", path, e),
            }
        }
        Ok(None)
    })
    .await
    .context("Probe task panicked")??;

    match found {
        Some(path) => println!("Table found on {}", path),
        None => anyhow::bail!("No table answered on any candidate device"),
    }
    Ok(())
}

async fn handle_fill(
    config: Config,
    platform: &str,
    color: &str,
    frames: Option<u64>,
) -> Result<()> {
    let color = parse_hex_color(color)?;
    let frame = Framebuffer::filled(config.width, config.height, color);
    let engine = config.build_engine(config.device_selector(platform)?)?;
    let options = LoopOptions {
        frame_interval: config.frame_interval(),
        reconnect_delay: config.reconnect_delay(),
        max_frames: frames,
        max_touch_frames: None,
    };

    let stats = run_until_interrupted(engine, frame, options).await?;
    println!("Sent {} frames", stats.frames);
    Ok(())
}

async fn handle_touch(
    config: Config,
    platform: &str,
    json: bool,
    count: Option<u64>,
) -> Result<()> {
    if config.touch.num_keys == 0 {
        anyhow::bail!("No touch keys configured (set [touch] num_keys)");
    }
    let frame = Framebuffer::new(config.width, config.height);
    let engine = config
        .build_engine(config.device_selector(platform)?)?
        .with_touch_sink(PrintSink::new(json));
    let options = LoopOptions {
        frame_interval: config.frame_interval(),
        reconnect_delay: config.reconnect_delay(),
        max_frames: None,
        max_touch_frames: count,
    };

    let stats = run_until_interrupted(engine, frame, options).await?;
    info!("Received {} touch frames", stats.touch_frames);
    Ok(())
}

/// Runs the blocking link loop off the async runtime until it ends or
/// Ctrl-C is pressed.
async fn run_until_interrupted(
    mut engine: SerialEngine,
    frame: Framebuffer,
    options: LoopOptions,
) -> Result<LoopStats> {
    let stop = Arc::new(AtomicBool::new(false));

    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            signal_stop.store(true, Ordering::SeqCst);
        }
    });

    let stats = tokio::task::spawn_blocking(move || {
        session::run_link(&mut engine, &frame, &options, &stop)
    })
    .await
    .context("Link loop panicked")?
    .context("Link failed")?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_lines_mark_cursor() {
        let mut selector = DeviceSelector::new(["COM3", "COM4"]).unwrap();
        assert_eq!(device_lines(&selector), vec!["* 0: COM3", "  1: COM4"]);

        selector.advance();
        assert_eq!(device_lines(&selector), vec!["  0: COM3", "* 1: COM4"]);
    }
}
