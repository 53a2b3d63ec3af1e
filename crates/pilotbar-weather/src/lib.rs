//! Weather for pilot-bar
//!
//! Fetches METAR (and optionally TAF and forecast discussion) for a single
//! airport from aviationweather.gov, decodes it, classifies the flight
//! category and keeps the result in a JSON snapshot on disk.

pub mod cache;
pub mod category;
pub mod client;
pub mod error;
pub mod metar;
pub mod retry;
pub mod station;
pub mod types;
pub mod update;

pub use cache::AirportCache;
pub use category::FlightCategory;
pub use client::{AviationWeatherClient, ClientSettings, WeatherSource};
pub use error::{CacheError, DecodeError, FetchError, StationIdError, UpdateError};
pub use retry::{RetryDecision, RetryPolicy};
pub use station::StationId;
pub use types::*;
pub use update::{refresh_cached, Staleness, UpdateOutcome, UpdateSettings, Updater};
