//! pilot-bar daemon
//!
//! Runs one update cycle for the current airport (or switches to a new one)
//! and leaves the result in the snapshot cache for the status-bar renderer.

mod cli;
mod display;
mod switch;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use pilotbar_core::{Config, ConfigError};
use pilotbar_weather::{
    refresh_cached, AirportCache, AviationWeatherClient, StationId, UpdateError, Updater,
};

use cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    pilotbar_core::init_logging(cli.log_level());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(update) = e.downcast_ref::<UpdateError>() {
                tracing::error!("{:#} ({})", e, update.user_message());
            } else if let Some(config) = e.downcast_ref::<ConfigError>() {
                tracing::error!("{:#} ({})", e, config.user_message());
            } else {
                tracing::error!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config =
        Config::load_validated(cli.config.as_deref()).context("Failed to load configuration")?;
    let cache = AirportCache::open_default().context("Failed to locate weather cache")?;
    let client = AviationWeatherClient::new(config.client_settings())
        .context("Failed to build HTTP client")?;
    let updater = Updater::new(client, config.update_settings());

    if let Some(Command::Switch { icao }) = &cli.command {
        switch::switch_airport(&cache, &updater, icao, config.waybar.signal).await?;
        return Ok(());
    }

    let station = resolve_station(cli.airport, &config, &cache);
    let outcome = refresh_cached(&cache, &updater, &station, cli.update).await?;

    if cli.verbose {
        print!("{}", display::summary(outcome.airport()));
    }
    Ok(())
}

/// Command line, then whatever the cache last held, then config. The cache
/// wins over config so that a `switch` sticks across later runs.
fn resolve_station(requested: Option<StationId>, config: &Config, cache: &AirportCache) -> StationId {
    requested
        .or_else(|| cache.cached_station())
        .or_else(|| config.default_airport())
        .unwrap_or_else(|| {
            tracing::warn!("No cached or provided airport, using default: {}", StationId::fallback());
            StationId::fallback()
        })
}
