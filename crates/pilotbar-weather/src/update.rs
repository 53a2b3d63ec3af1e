//! Staleness checks and the update cycle.
//!
//! [`Updater::reconcile`] decides whether the cached snapshot needs a refresh
//! and, if so, fetches, decodes and merges a new METAR into a fresh
//! [`Airport`]. It never touches the cache; [`refresh_cached`] wraps it with
//! load and store.

use std::time::Duration;

use crate::cache::AirportCache;
use crate::client::WeatherSource;
use crate::error::UpdateError;
use crate::metar;
use crate::station::StationId;
use crate::types::Airport;

/// Default seconds between refreshes.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSettings {
    /// A snapshot older than this (by `last_update`) is refreshed
    pub refresh_interval: Duration,
    /// Fetch the TAF after a successful METAR merge
    pub fetch_taf: bool,
    /// Fetch the area forecast discussion after a successful METAR merge
    pub fetch_discussion: bool,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            fetch_taf: false,
            fetch_discussion: false,
        }
    }
}

/// Why a refresh is (or is not) needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub forced: bool,
    pub station_changed: bool,
    pub never_populated: bool,
    pub expired: bool,
}

impl Staleness {
    pub fn evaluate(
        cached: &Airport,
        requested: &StationId,
        now: i64,
        force: bool,
        refresh_interval: Duration,
    ) -> Self {
        let interval = i64::try_from(refresh_interval.as_secs()).unwrap_or(i64::MAX);
        Self {
            forced: force,
            station_changed: cached.icao != *requested,
            never_populated: cached.is_empty(),
            expired: now.saturating_sub(cached.last_update_epoch) > interval,
        }
    }

    pub fn needs_update(&self) -> bool {
        self.forced || self.station_changed || self.never_populated || self.expired
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Nothing was stale; the snapshot is returned as given
    Current(Airport),
    /// A new observation was merged
    Refreshed(Airport),
}

impl UpdateOutcome {
    pub fn airport(&self) -> &Airport {
        match self {
            Self::Current(a) | Self::Refreshed(a) => a,
        }
    }

    pub fn into_airport(self) -> Airport {
        match self {
            Self::Current(a) | Self::Refreshed(a) => a,
        }
    }

    pub fn was_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed(_))
    }
}

fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct Updater<S> {
    source: S,
    settings: UpdateSettings,
    clock: fn() -> i64,
}

impl<S: WeatherSource> Updater<S> {
    pub fn new(source: S, settings: UpdateSettings) -> Self {
        Self {
            source,
            settings,
            clock: wall_clock,
        }
    }

    /// Replace the clock used to stamp `last_update`.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Bring `cached` up to date for `requested`.
    ///
    /// Fetch and decode failures are returned unchanged and leave `cached`
    /// as it was. Elevation and CWA are derived again only when the station
    /// changed or they are still unknown.
    pub async fn reconcile(
        &self,
        cached: &Airport,
        requested: &StationId,
        now: i64,
        force: bool,
    ) -> Result<UpdateOutcome, UpdateError> {
        let staleness =
            Staleness::evaluate(cached, requested, now, force, self.settings.refresh_interval);
        if !staleness.needs_update() {
            tracing::debug!("No update needed for {}", requested);
            return Ok(UpdateOutcome::Current(cached.clone()));
        }
        tracing::debug!(
            forced = staleness.forced,
            station_changed = staleness.station_changed,
            never_populated = staleness.never_populated,
            expired = staleness.expired,
            "Proceeding with update for {}",
            requested
        );

        let report = self.source.metar(requested).await?;
        tracing::debug!(metar = %report.raw_ob, "Fetched METAR");

        let observation = metar::decode_with_station(&report.raw_ob, &report.station_meta(), now)?;

        let elevation_ft = if staleness.station_changed || cached.elevation_ft.is_none() {
            Some(report.elevation_ft())
        } else {
            cached.elevation_ft
        };

        let (cwa, raw_taf, raw_afd) = if staleness.station_changed {
            (None, String::new(), String::new())
        } else {
            (cached.cwa.clone(), cached.raw_taf.clone(), cached.raw_afd.clone())
        };

        let mut airport = Airport {
            icao: requested.clone(),
            name: report.name.clone(),
            cwa,
            last_update_epoch: 0,
            elevation_ft,
            metar: observation,
            raw_taf,
            raw_afd,
        };

        if self.settings.fetch_taf {
            self.merge_taf(&mut airport).await;
        }
        if self.settings.fetch_discussion {
            if airport.cwa.is_none() {
                airport.cwa = self.resolve_cwa(report.lat, report.lon).await;
            }
            self.merge_discussion(&mut airport).await;
        }

        airport.last_update_epoch = (self.clock)();
        tracing::info!(
            "Updated {} ({}), observed {} min ago",
            airport.icao,
            airport.metar.flight_category,
            airport.metar.reported.age_minutes
        );
        Ok(UpdateOutcome::Refreshed(airport))
    }

    async fn merge_taf(&self, airport: &mut Airport) {
        match self.source.taf(&airport.icao).await {
            Ok(taf) => airport.raw_taf = taf.raw_taf,
            Err(e) => tracing::warn!("TAF update failed for {}: {}", airport.icao, e),
        }
    }

    async fn resolve_cwa(&self, lat: f64, lon: f64) -> Option<String> {
        match self.source.cwa(lat, lon).await {
            Ok(cwa) => Some(cwa),
            Err(e) => {
                tracing::warn!("CWA lookup failed: {}", e);
                None
            }
        }
    }

    async fn merge_discussion(&self, airport: &mut Airport) {
        let Some(cwa) = airport.cwa.as_deref() else {
            return;
        };
        match self.source.discussion(cwa).await {
            Ok(text) => airport.raw_afd = text,
            Err(e) => tracing::warn!("AFD update failed for {}: {}", cwa, e),
        }
    }
}

/// One full cycle against the cache: create the snapshot if missing, load
/// it, reconcile, and store the result only if it was refreshed.
pub async fn refresh_cached<S: WeatherSource>(
    cache: &AirportCache,
    updater: &Updater<S>,
    requested: &StationId,
    force: bool,
) -> Result<UpdateOutcome, UpdateError> {
    cache.ensure_exists(requested)?;
    let cached = cache.load()?;

    let outcome = updater
        .reconcile(&cached, requested, (updater.clock)(), force)
        .await?;
    if let UpdateOutcome::Refreshed(airport) = &outcome {
        cache.store(airport)?;
    }
    Ok(outcome)
}
