//! pilot-bar waybar module
//!
//! Reads the cached snapshot and prints one JSON line for a waybar custom
//! module. With no usable snapshot it prints nothing.

mod format;

use anyhow::Result;
use clap::Parser;

use pilotbar_core::Config;
use pilotbar_weather::AirportCache;

use format::WaybarOutput;

/// Print the cached METAR as waybar JSON.
#[derive(Debug, Parser)]
#[command(name = "pilot-bar-waybar", version)]
struct Cli {
    /// Override the configured format string
    #[arg(short, long)]
    format: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    pilotbar_core::init_logging("warn");

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Using default config: {} ({})", e, e.user_message());
        Config::default()
    });
    let format = cli.format.unwrap_or(config.format);

    let airport = match AirportCache::open_default().and_then(|cache| cache.load()) {
        Ok(airport) if !airport.is_empty() => airport,
        Ok(_) => {
            tracing::debug!("Snapshot has no observation yet");
            return Ok(());
        }
        Err(e) => {
            tracing::debug!("No snapshot to render: {}", e);
            return Ok(());
        }
    };

    let output = WaybarOutput::render(&airport, &format);
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}
