//! Integration tests for the update cycle against a mock aviationweather.gov.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use pilotbar_weather::{
    refresh_cached, AirportCache, AviationWeatherClient, ClientSettings, FetchError,
    FlightCategory, RetryPolicy, StationId, UpdateError, UpdateSettings, Updater, Visibility,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 2025-10-15T19:00:00Z
fn fixed_clock() -> i64 {
    1_760_554_800
}

fn client_for(server: &MockServer) -> AviationWeatherClient {
    AviationWeatherClient::new(ClientSettings {
        base_url: server.uri(),
        points_url: format!("{}/points", server.uri()),
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::new(3, Duration::from_millis(1)),
    })
    .unwrap()
}

fn metar_body(station: &str, raw: &str, elev_m: f64) -> serde_json::Value {
    serde_json::json!([{
        "icaoId": station,
        "obsTime": 1_760_554_380,
        "rawOb": raw,
        "lat": 37.2253,
        "lon": -89.5708,
        "elev": elev_m,
        "name": format!("{} Test Field", station)
    }])
}

async fn mount_metar(server: &MockServer, station: &str, raw: &str, elev_m: f64) {
    Mock::given(method("GET"))
        .and(path("/metar"))
        .and(query_param("ids", station))
        .respond_with(ResponseTemplate::new(200).set_body_json(metar_body(station, raw, elev_m)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_first_run_creates_and_populates_snapshot() {
    let server = MockServer::start().await;
    mount_metar(
        &server,
        "KCGI",
        "KCGI 151853Z 18010KT 10SM BKN025 22/18 A2992",
        100.0,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let cache = AirportCache::new(dir.path());
    let updater =
        Updater::new(client_for(&server), UpdateSettings::default()).with_clock(fixed_clock);
    let kcgi = StationId::parse("kcgi").unwrap();

    let outcome = refresh_cached(&cache, &updater, &kcgi, false).await.unwrap();
    assert!(outcome.was_refreshed());

    let stored = cache.load().unwrap();
    assert_eq!(stored.icao, kcgi);
    assert_eq!(stored.name, "KCGI Test Field");
    assert_eq!(stored.last_update_epoch, fixed_clock());
    assert_eq!(stored.metar.flight_category, FlightCategory::Mvfr);
    assert_eq!(stored.metar.visibility, Visibility::Unlimited);
    assert_eq!(stored.metar.reported.age_minutes, 7);
    assert_eq!(stored.metar.temperature_c, Some(22));
    assert_eq!(stored.metar.altimeter_in_hg, Some(29.92));
}

#[tokio::test]
async fn test_switching_station_replaces_snapshot() {
    let server = MockServer::start().await;
    mount_metar(
        &server,
        "KCGI",
        "KCGI 151853Z 18010KT 10SM BKN025 22/18 A2992",
        100.0,
    )
    .await;
    mount_metar(
        &server,
        "KSEA",
        "KSEA 151853Z 16008KT 3/4SM FG OVC003 12/12 A3001",
        130.0,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let cache = AirportCache::new(dir.path());
    let updater =
        Updater::new(client_for(&server), UpdateSettings::default()).with_clock(fixed_clock);

    refresh_cached(&cache, &updater, &StationId::parse("KCGI").unwrap(), false)
        .await
        .unwrap();
    let outcome = refresh_cached(&cache, &updater, &StationId::parse("KSEA").unwrap(), false)
        .await
        .unwrap();
    assert!(outcome.was_refreshed());

    let stored = cache.load().unwrap();
    assert_eq!(stored.icao.as_str(), "KSEA");
    assert_eq!(stored.metar.flight_category, FlightCategory::Lifr);
    assert_eq!(stored.metar.weather, "FG");
    let elevation = stored.elevation_ft.unwrap();
    assert!((elevation - 130.0 * 3.28084).abs() < 1e-9);
}

#[tokio::test]
async fn test_outage_leaves_previous_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metar"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cache = AirportCache::new(dir.path());
    let kcgi = StationId::parse("KCGI").unwrap();
    cache.ensure_exists(&kcgi).unwrap();
    let before = cache.load().unwrap();

    let updater =
        Updater::new(client_for(&server), UpdateSettings::default()).with_clock(fixed_clock);
    let err = refresh_cached(&cache, &updater, &kcgi, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UpdateError::Fetch(FetchError::TransientStatus { .. })
    ));
    assert_eq!(cache.load().unwrap(), before);
}
