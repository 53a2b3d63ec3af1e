use serde::{Deserialize, Serialize};
use std::fmt;

use crate::category::FlightCategory;
use crate::station::StationId;

/// Conversion factor for station elevations, which the source reports in metres.
pub const FEET_PER_METER: f64 = 3.28084;

/// Cached weather for the current airport. Replaced whole on every
/// successful update cycle, never edited field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub icao: StationId,
    #[serde(default)]
    pub name: String,
    /// County warning area of the responsible forecast office
    #[serde(default)]
    pub cwa: Option<String>,
    /// Wall-clock seconds of the last successful merge; 0 means never
    #[serde(rename = "last_update", default)]
    pub last_update_epoch: i64,
    /// Station elevation in feet, unknown until the first fetch for a station
    #[serde(rename = "elevation", default)]
    pub elevation_ft: Option<f64>,
    #[serde(default)]
    pub metar: Metar,
    #[serde(rename = "rawTAF", default)]
    pub raw_taf: String,
    #[serde(rename = "rawAFD", default)]
    pub raw_afd: String,
}

impl Airport {
    /// A snapshot that has never been populated for `icao`.
    pub fn reset(icao: StationId) -> Self {
        Self {
            icao,
            name: String::new(),
            cwa: None,
            last_update_epoch: 0,
            elevation_ft: None,
            metar: Metar::default(),
            raw_taf: String::new(),
            raw_afd: String::new(),
        }
    }

    /// True until a real observation has been merged.
    pub fn is_empty(&self) -> bool {
        self.metar.reported.epoch == 0
    }
}

/// When the observation was taken and how old it was at decode time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub epoch: i64,
    #[serde(rename = "age")]
    pub age_minutes: i64,
}

/// Decoded METAR observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metar {
    pub reported: Timestamp,
    #[serde(rename = "rawOb")]
    pub raw_text: String,
    #[serde(rename = "temp")]
    pub temperature_c: Option<i32>,
    #[serde(rename = "dewp")]
    pub dewpoint_c: Option<i32>,
    pub wind: Wind,
    pub visibility: Visibility,
    pub clouds: Vec<CloudLayer>,
    /// Significant weather codes as reported, space separated
    #[serde(rename = "wxString")]
    pub weather: String,
    #[serde(rename = "altimeter")]
    pub altimeter_in_hg: Option<f64>,
    #[serde(rename = "fltCat")]
    pub flight_category: FlightCategory,
    #[serde(rename = "stationName", default)]
    pub station_name: String,
}

impl Metar {
    /// Base of the lowest broken or overcast layer, in feet AGL.
    pub fn ceiling_ft(&self) -> Option<u32> {
        effective_ceiling(&self.clouds)
    }

    /// Category implied by the ceiling and visibility.
    pub fn classify(&self) -> FlightCategory {
        FlightCategory::classify(self.ceiling_ft(), self.visibility)
    }
}

/// Lowest BKN/OVC base, in the order layers were reported.
pub fn effective_ceiling(clouds: &[CloudLayer]) -> Option<u32> {
    clouds
        .iter()
        .filter(|layer| layer.cover.is_ceiling())
        .map(|layer| layer.base_ft)
        .min()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wind {
    pub calm: bool,
    pub variable: bool,
    /// True degrees; meaningless when calm or variable
    pub direction: u16,
    #[serde(rename = "speed")]
    pub speed_kt: u16,
    #[serde(rename = "gusts")]
    pub gust_kt: Option<u16>,
    /// Group present but unreported (`/////KT`, typical of automated stations)
    #[serde(default)]
    pub missing: bool,
}

impl Wind {
    pub fn calm() -> Self {
        Self {
            calm: true,
            ..Self::default()
        }
    }

    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }
}

/// Prevailing visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// 10 statute miles or more, or not reported
    #[default]
    Unlimited,
    StatuteMiles(f64),
}

impl Visibility {
    /// At or beyond this many miles an unqualified report means unlimited.
    pub const UNLIMITED_THRESHOLD_SM: f64 = 10.0;

    pub fn miles(self) -> Option<f64> {
        match self {
            Visibility::Unlimited => None,
            Visibility::StatuteMiles(sm) => Some(sm),
        }
    }
}

/// Sky cover of a single layer. Codes other than the four standard ones are
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CloudCover {
    Few,
    Scattered,
    Broken,
    Overcast,
    Other(String),
}

impl CloudCover {
    pub fn from_code(code: &str) -> Self {
        match code {
            "FEW" => Self::Few,
            "SCT" => Self::Scattered,
            "BKN" => Self::Broken,
            "OVC" => Self::Overcast,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Few => "FEW",
            Self::Scattered => "SCT",
            Self::Broken => "BKN",
            Self::Overcast => "OVC",
            Self::Other(code) => code,
        }
    }

    /// Only broken and overcast layers form a ceiling.
    pub fn is_ceiling(&self) -> bool {
        matches!(self, Self::Broken | Self::Overcast)
    }
}

impl fmt::Display for CloudCover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for CloudCover {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<CloudCover> for String {
    fn from(cover: CloudCover) -> Self {
        cover.code().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudLayer {
    #[serde(rename = "cover")]
    pub cover: CloudCover,
    #[serde(rename = "base")]
    pub base_ft: u32,
}

/// Station metadata that travels with a report but is not part of its text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationMeta {
    pub name: String,
}

/// First element of the METAR endpoint's JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetarReport {
    #[serde(default)]
    pub icao_id: String,
    #[serde(default)]
    pub obs_time: i64,
    pub raw_ob: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    /// Station elevation in metres
    #[serde(default)]
    pub elev: f64,
    #[serde(default)]
    pub name: String,
}

impl MetarReport {
    pub fn elevation_ft(&self) -> f64 {
        self.elev * FEET_PER_METER
    }

    pub fn station_meta(&self) -> StationMeta {
        StationMeta {
            name: self.name.clone(),
        }
    }
}

/// First element of the TAF endpoint's JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TafReport {
    #[serde(rename = "rawTAF")]
    pub raw_taf: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn layer(code: &str, base_ft: u32) -> CloudLayer {
        CloudLayer {
            cover: CloudCover::from_code(code),
            base_ft,
        }
    }

    #[test]
    fn test_ceiling_ignores_few_scattered_and_unknown() {
        let clouds = vec![layer("FEW", 800), layer("SCT", 1200), layer("VV", 300)];
        assert_eq!(effective_ceiling(&clouds), None);
    }

    #[test]
    fn test_ceiling_is_lowest_broken_or_overcast_regardless_of_order() {
        let clouds = vec![layer("OVC", 4000), layer("SCT", 900), layer("BKN", 2500)];
        assert_eq!(effective_ceiling(&clouds), Some(2500));
    }

    #[test]
    fn test_cloud_cover_preserves_unknown_codes() {
        let cover: CloudCover = serde_json::from_str("\"VV\"").unwrap();
        assert_eq!(cover, CloudCover::Other("VV".into()));
        assert_eq!(serde_json::to_string(&cover).unwrap(), "\"VV\"");
        assert_eq!(CloudCover::from_code("BKN"), CloudCover::Broken);
    }

    #[test]
    fn test_reset_airport_is_empty() {
        let airport = Airport::reset(StationId::parse("KORD").unwrap());
        assert!(airport.is_empty());
        assert_eq!(airport.last_update_epoch, 0);
        assert_eq!(airport.elevation_ft, None);
    }

    #[test]
    fn test_metar_report_envelope() {
        let json = serde_json::json!({
            "icaoId": "KCGI",
            "obsTime": 1760551980,
            "rawOb": "KCGI 151853Z 18010KT 10SM BKN025 22/18 A2992",
            "lat": 37.2253,
            "lon": -89.5708,
            "elev": 100,
            "name": "Cape Girardeau Rgnl, MO, US",
            "temp": 22
        });
        let report: MetarReport = serde_json::from_value(json).unwrap();
        assert_eq!(report.icao_id, "KCGI");
        assert!((report.elevation_ft() - 328.084).abs() < 1e-9);
    }

    #[test]
    fn test_airport_snapshot_keys() {
        let airport = Airport::reset(StationId::parse("KCGI").unwrap());
        let value = serde_json::to_value(&airport).unwrap();
        assert_eq!(value["icao"], "KCGI");
        assert_eq!(value["last_update"], 0);
        assert!(value.get("rawTAF").is_some());
        assert_eq!(value["metar"]["reported"]["epoch"], 0);
    }
}
