//! `switch <ICAO>`: point the cache at a new station and refresh it.

use anyhow::{Context, Result};
use tokio::process::Command;

use pilotbar_weather::{refresh_cached, Airport, AirportCache, StationId, Updater, WeatherSource};

pub async fn switch_airport<S: WeatherSource>(
    cache: &AirportCache,
    updater: &Updater<S>,
    icao: &StationId,
    waybar_signal: u8,
) -> Result<Airport> {
    tracing::info!("Switching airport to {}", icao);

    cache
        .store(&Airport::reset(icao.clone()))
        .context("Cache reset failed")?;

    let airport = refresh_cached(cache, updater, icao, true)
        .await
        .with_context(|| format!("Update for {} failed", icao))?
        .into_airport();

    println!("{}", airport.metar.raw_text);

    signal_waybar(waybar_signal).await;
    Ok(airport)
}

/// Ask waybar to re-run its module. Waybar not running is not an error.
async fn signal_waybar(signal: u8) {
    let result = Command::new("pkill")
        .arg(format!("-RTMIN+{}", signal))
        .arg("waybar")
        .status()
        .await;

    match result {
        Ok(status) if status.success() => tracing::debug!("Signalled waybar (RTMIN+{})", signal),
        Ok(status) => tracing::debug!("Waybar signal failed (waybar may not be running): {}", status),
        Err(e) => tracing::debug!("Waybar signal failed: {}", e),
    }
}
