//! aviationweather.gov / api.weather.gov client.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::instrument;

use crate::error::FetchError;
use crate::retry::{with_retry, RetryPolicy};
use crate::station::StationId;
use crate::types::{MetarReport, TafReport};

pub const AVIATION_WEATHER_URL: &str = "https://aviationweather.gov/api/data";
pub const POINTS_URL: &str = "https://api.weather.gov/points";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("pilot-bar/", env!("CARGO_PKG_VERSION"));

/// Remote products the update cycle needs. Implemented by
/// [`AviationWeatherClient`]; tests substitute stubs.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    /// Latest METAR envelope for `station`, retried per the source's policy.
    async fn metar(&self, station: &StationId) -> Result<MetarReport, FetchError>;

    /// Latest TAF for `station`.
    async fn taf(&self, station: &StationId) -> Result<TafReport, FetchError>;

    /// County warning area for a coordinate.
    async fn cwa(&self, lat: f64, lon: f64) -> Result<String, FetchError>;

    /// Area forecast discussion text for a county warning area.
    async fn discussion(&self, cwa: &str) -> Result<String, FetchError>;
}

/// Connection settings for [`AviationWeatherClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub points_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: AVIATION_WEATHER_URL.to_string(),
            points_url: POINTS_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    #[serde(default)]
    cwa: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AviationWeatherClient {
    client: Client,
    base_url: String,
    points_url: String,
    retry: RetryPolicy,
}

impl AviationWeatherClient {
    pub fn new(settings: ClientSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            points_url: settings.points_url.trim_end_matches('/').to_string(),
            retry: settings.retry,
        })
    }

    /// Fetch the latest METAR, making at most `max_attempts` requests.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_metar(
        &self,
        station: &StationId,
        max_attempts: u32,
    ) -> Result<MetarReport, FetchError> {
        let url = format!("{}/metar?ids={}&format=json", self.base_url, station);
        self.fetch_first("METAR", station, &url, max_attempts).await
    }

    /// Fetch the latest TAF, making at most `max_attempts` requests.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_taf(
        &self,
        station: &StationId,
        max_attempts: u32,
    ) -> Result<TafReport, FetchError> {
        let url = format!("{}/taf?ids={}&format=json", self.base_url, station);
        self.fetch_first("TAF", station, &url, max_attempts).await
    }

    /// Resolve the county warning area for a coordinate. Single attempt.
    #[instrument(skip(self), level = "debug")]
    pub async fn lookup_cwa(&self, lat: f64, lon: f64) -> Result<String, FetchError> {
        let url = format!("{}/{:.4},{:.4}", self.points_url, lat, lon);
        let response = self.get(&url).await?;
        let body: PointsResponse = response.json().await.map_err(FetchError::from_transport)?;

        match body.properties.cwa.filter(|cwa| !cwa.is_empty()) {
            Some(cwa) => {
                tracing::info!("CWA resolved: {}", cwa);
                Ok(cwa)
            }
            None => Err(FetchError::NoData {
                product: "CWA",
                query: format!("{:.4},{:.4}", lat, lon),
            }),
        }
    }

    /// Fetch the area forecast discussion text. Single attempt.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_discussion(&self, cwa: &str) -> Result<String, FetchError> {
        let wfo = format!("k{}", cwa.to_ascii_lowercase());
        let url = format!("{}/fcstdisc?cwa={}&type=afd", self.base_url, wfo);
        let response = self.get(&url).await?;
        let text = response.text().await.map_err(FetchError::from_transport)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(FetchError::NoData {
                product: "AFD",
                query: cwa.to_string(),
            });
        }
        tracing::info!("AFD OK");
        Ok(text.to_string())
    }

    /// GET a JSON array and return its first element, with retries.
    async fn fetch_first<T: DeserializeOwned>(
        &self,
        product: &'static str,
        station: &StationId,
        url: &str,
        max_attempts: u32,
    ) -> Result<T, FetchError> {
        let policy = self.retry.with_max_attempts(max_attempts);
        let started = Instant::now();

        let first = with_retry(policy, |attempt| async move {
            if attempt > 1 {
                tracing::info!("Fetch {} retry ({} of {})", product, attempt, policy.max_attempts);
            } else {
                tracing::info!("Fetching {}", product);
            }

            let response = self.get(url).await?;
            let mut items: Vec<T> = response.json().await.map_err(FetchError::from_transport)?;

            if items.is_empty() {
                return Err(FetchError::NoData {
                    product,
                    query: station.to_string(),
                });
            }
            Ok(items.swap_remove(0))
        })
        .await?;

        tracing::info!(
            "{} OK, took {:.3}s",
            product,
            started.elapsed().as_secs_f64()
        );
        Ok(first)
    }

    /// One request; non-success statuses become classified errors.
    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} returned status {}", url, status);
            return Err(FetchError::from_status(status, url));
        }
        Ok(response)
    }
}

impl WeatherSource for AviationWeatherClient {
    async fn metar(&self, station: &StationId) -> Result<MetarReport, FetchError> {
        self.fetch_metar(station, self.retry.max_attempts).await
    }

    async fn taf(&self, station: &StationId) -> Result<TafReport, FetchError> {
        self.fetch_taf(station, self.retry.max_attempts).await
    }

    async fn cwa(&self, lat: f64, lon: f64) -> Result<String, FetchError> {
        self.lookup_cwa(lat, lon).await
    }

    async fn discussion(&self, cwa: &str) -> Result<String, FetchError> {
        self.fetch_discussion(cwa).await
    }
}
