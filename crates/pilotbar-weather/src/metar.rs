//! METAR decoding.
//!
//! Decoding is pure: the caller supplies the decode time, so identical input
//! always yields an identical [`Metar`]. The mandatory prefix (station, issue
//! time, wind) is positional; the rest of the body may come in any order and
//! unknown groups are skipped.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::category::FlightCategory;
use crate::error::DecodeError;
use crate::types::{
    effective_ceiling, CloudCover, CloudLayer, Metar, StationMeta, Timestamp, Visibility, Wind,
};

const METERS_PER_STATUTE_MILE: f64 = 1609.344;
const KNOTS_PER_MPS: f64 = 1.943_844;
const IN_HG_PER_HPA: f64 = 0.029_53;

/// Reports stamped up to this far ahead of the decode clock are taken as
/// current rather than as last month's.
const CLOCK_SKEW_SECS: i64 = 3600;

const DESCRIPTORS: [&str; 8] = ["MI", "PR", "BC", "DR", "BL", "SH", "TS", "FZ"];
const PHENOMENA: [&str; 22] = [
    "DZ", "RA", "SN", "SG", "IC", "PL", "GR", "GS", "UP", "BR", "FG", "FU", "VA", "DU", "SA",
    "HZ", "PY", "PO", "SQ", "FC", "SS", "DS",
];

/// Decode a report with no station metadata.
pub fn decode(raw: &str, decode_time: i64) -> Result<Metar, DecodeError> {
    decode_with_station(raw, &StationMeta::default(), decode_time)
}

/// Decode a report, attaching metadata from its envelope.
pub fn decode_with_station(
    raw: &str,
    meta: &StationMeta,
    decode_time: i64,
) -> Result<Metar, DecodeError> {
    let raw = raw.trim();
    let mut tokens = raw.split_whitespace();

    let mut station = tokens.next();
    while matches!(station, Some("METAR") | Some("SPECI")) {
        station = tokens.next();
    }
    station
        .filter(|t| is_station(t))
        .ok_or_else(|| DecodeError::malformed("missing station", raw))?;

    let (day, hour, minute) = tokens
        .next()
        .and_then(parse_issue_time)
        .ok_or_else(|| DecodeError::malformed("missing issue time", raw))?;
    let reported_epoch = resolve_issue_time(day, hour, minute, decode_time)
        .ok_or_else(|| DecodeError::malformed("issue time out of range", raw))?;

    let mut wind_token = tokens.next();
    while matches!(wind_token, Some("AUTO") | Some("COR") | Some("RTD")) {
        wind_token = tokens.next();
    }
    let wind = wind_token
        .and_then(parse_wind)
        .ok_or_else(|| DecodeError::malformed("missing wind group", raw))?;

    let body: Vec<&str> = tokens
        .take_while(|t| !matches!(*t, "RMK" | "BECMG" | "TEMPO"))
        .collect();
    let groups = decode_body(&body);

    let visibility = groups.visibility.unwrap_or(Visibility::Unlimited);
    let flight_category = FlightCategory::classify(effective_ceiling(&groups.clouds), visibility);

    Ok(Metar {
        reported: Timestamp {
            epoch: reported_epoch,
            age_minutes: ((decode_time - reported_epoch) / 60).max(0),
        },
        raw_text: raw.to_string(),
        temperature_c: groups.temperature.map(|(t, _)| t),
        dewpoint_c: groups.temperature.and_then(|(_, d)| d),
        wind,
        visibility,
        clouds: groups.clouds,
        weather: groups.weather.join(" "),
        altimeter_in_hg: groups.altimeter,
        flight_category,
        station_name: meta.name.clone(),
    })
}

/// Groups found after the wind.
#[derive(Debug, Default)]
struct BodyGroups {
    visibility: Option<Visibility>,
    clouds: Vec<CloudLayer>,
    weather: Vec<String>,
    temperature: Option<(i32, Option<i32>)>,
    altimeter: Option<f64>,
}

fn decode_body(body: &[&str]) -> BodyGroups {
    let mut groups = BodyGroups::default();
    let mut i = 0;

    while i < body.len() {
        let token = body[i];

        if token == "CAVOK" {
            groups.visibility.get_or_insert(Visibility::Unlimited);
            i += 1;
            continue;
        }

        if groups.visibility.is_none() {
            if let Some((vis, consumed)) = parse_visibility(&body[i..]) {
                groups.visibility = Some(vis);
                i += consumed;
                continue;
            }
        }

        if let Some(sky) = parse_sky(token) {
            if let Sky::Layer(layer) = sky {
                groups.clouds.push(layer);
            }
        } else if let Some(temps) = parse_temperature(token) {
            groups.temperature.get_or_insert(temps);
        } else if let Some(alt) = parse_altimeter(token) {
            groups.altimeter.get_or_insert(alt);
        } else if is_weather(token) {
            groups.weather.push(token.to_string());
        } else {
            tracing::trace!("Skipping unrecognized group {}", token);
        }
        i += 1;
    }

    groups
}

fn is_station(token: &str) -> bool {
    token.len() == 4
        && token.starts_with(|c: char| c.is_ascii_uppercase())
        && token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `DDHHMMZ`
fn parse_issue_time(token: &str) -> Option<(u32, u32, u32)> {
    let digits = token.strip_suffix('Z')?;
    if digits.len() != 6 || !all_digits(digits) {
        return None;
    }
    let day = digits[0..2].parse().ok()?;
    let hour = digits[2..4].parse().ok()?;
    let minute = digits[4..6].parse().ok()?;
    ((1..=31).contains(&day) && hour < 24 && minute < 60).then_some((day, hour, minute))
}

/// Place a day-of-month timestamp in the most recent month where it is not
/// (meaningfully) in the future relative to `decode_time`.
fn resolve_issue_time(day: u32, hour: u32, minute: u32, decode_time: i64) -> Option<i64> {
    let now = DateTime::<Utc>::from_timestamp(decode_time, 0)?;
    let (mut year, mut month) = (now.year(), now.month());

    // Day 31 may need to skip back past a 30-day month (and February).
    for _ in 0..4 {
        if let Some(t) = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
        {
            let epoch = t.timestamp();
            if epoch <= decode_time + CLOCK_SKEW_SECS {
                return Some(epoch);
            }
        }
        (year, month) = if month == 1 {
            (year - 1, 12)
        } else {
            (year, month - 1)
        };
    }
    None
}

/// `dddssKT`, `dddssGggKT`, `VRBssKT`, `00000KT`, `/////KT`, or the same in
/// `MPS`.
fn parse_wind(token: &str) -> Option<Wind> {
    let (body, mps) = if let Some(b) = token.strip_suffix("KT") {
        (b, false)
    } else if let Some(b) = token.strip_suffix("MPS") {
        (b, true)
    } else {
        return None;
    };
    if body.len() < 5 || !body.is_ascii() {
        return None;
    }
    if body.bytes().all(|b| b == b'/') {
        return Some(Wind::missing());
    }

    let (direction, rest) = body.split_at(3);
    let (speed, gust) = match rest.split_once('G') {
        Some((s, g)) => (s, Some(g)),
        None => (rest, None),
    };
    if !(2..=3).contains(&speed.len()) || !all_digits(speed) {
        return None;
    }
    let to_knots = |value: u16| {
        if mps {
            (f64::from(value) * KNOTS_PER_MPS).round() as u16
        } else {
            value
        }
    };

    // Stray direction or gust digits on a zero speed still mean calm.
    if speed.bytes().all(|b| b == b'0') {
        let direction_ok = direction == "VRB" || all_digits(direction);
        return direction_ok.then(Wind::calm);
    }

    let gust_kt = match gust {
        Some(g) if (2..=3).contains(&g.len()) && all_digits(g) => Some(to_knots(g.parse().ok()?)),
        Some(_) => return None,
        None => None,
    };

    let variable = direction == "VRB";
    let direction = if variable {
        0
    } else if all_digits(direction) {
        direction.parse::<u16>().ok().filter(|d| *d <= 360)?
    } else {
        return None;
    };

    Some(Wind {
        calm: false,
        variable,
        direction,
        speed_kt: to_knots(speed.parse().ok()?),
        gust_kt,
        missing: false,
    })
}

/// Prevailing visibility starting at `tokens[0]`. Returns the value and how
/// many tokens it spans (the mixed form `1 1/2SM` spans two).
fn parse_visibility(tokens: &[&str]) -> Option<(Visibility, usize)> {
    let first = *tokens.first()?;

    if let Some(sm) = first.strip_suffix("SM") {
        return parse_statute_miles(sm).map(|vis| (vis, 1));
    }

    if first.len() <= 2 && all_digits(first) {
        let fraction = tokens.get(1).and_then(|next| next.strip_suffix("SM"))?;
        if !fraction.contains('/') {
            return None;
        }
        let whole: f64 = first.parse::<u32>().ok()?.into();
        let miles = whole + parse_miles(fraction)?;
        return Some((unqualified_miles(miles), 2));
    }

    if first.len() == 4 && all_digits(first) {
        let meters: u32 = first.parse().ok()?;
        if meters == 9999 {
            return Some((Visibility::Unlimited, 1));
        }
        let miles = round2(f64::from(meters) / METERS_PER_STATUTE_MILE);
        return Some((unqualified_miles(miles), 1));
    }

    None
}

/// Body of an `...SM` group, possibly prefixed `M` (less than) or `P`
/// (greater than). Qualified values are never treated as unlimited.
fn parse_statute_miles(s: &str) -> Option<Visibility> {
    if let Some(rest) = s.strip_prefix('M').or_else(|| s.strip_prefix('P')) {
        return parse_miles(rest).map(Visibility::StatuteMiles);
    }
    parse_miles(s).map(unqualified_miles)
}

fn unqualified_miles(miles: f64) -> Visibility {
    if miles >= Visibility::UNLIMITED_THRESHOLD_SM {
        Visibility::Unlimited
    } else {
        Visibility::StatuteMiles(miles)
    }
}

/// `N` or `N/D`
fn parse_miles(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            if !all_digits(num) || !all_digits(den) {
                return None;
            }
            let num: f64 = num.parse::<u32>().ok()?.into();
            let den: f64 = den.parse::<u32>().ok()?.into();
            (den > 0.0).then(|| num / den)
        }
        None if all_digits(s) => s.parse::<u32>().ok().map(f64::from),
        None => None,
    }
}

enum Sky {
    /// Clear-sky indicator or a layer with no reported base
    NoLayer,
    Layer(CloudLayer),
}

/// `FEW025`, `BKN120CB`, `VV003`, `SKC`/`CLR`/`NSC`/`NCD`.
fn parse_sky(token: &str) -> Option<Sky> {
    if matches!(token, "SKC" | "CLR" | "NSC" | "NCD") {
        return Some(Sky::NoLayer);
    }
    if !token.is_ascii() {
        return None;
    }

    let code_len = if token.starts_with("VV") { 2 } else { 3 };
    if token.len() < code_len + 3 {
        return None;
    }
    let (code, rest) = token.split_at(code_len);
    if !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let (base, suffix) = rest.split_at(3);
    if !matches!(suffix, "" | "CB" | "TCU" | "///") {
        return None;
    }
    if base == "///" {
        return Some(Sky::NoLayer);
    }
    if !all_digits(base) {
        return None;
    }

    Some(Sky::Layer(CloudLayer {
        cover: CloudCover::from_code(code),
        base_ft: base.parse::<u32>().ok()? * 100,
    }))
}

/// `TT/DD` with `M` for negatives. The dewpoint may be missing (`22/`).
fn parse_temperature(token: &str) -> Option<(i32, Option<i32>)> {
    let (temp, dew) = token.split_once('/')?;
    let temp = parse_signed(temp)?;
    let dew = match dew {
        "" | "//" => None,
        d => Some(parse_signed(d)?),
    };
    Some((temp, dew))
}

fn parse_signed(s: &str) -> Option<i32> {
    let (negative, digits) = match s.strip_prefix('M') {
        Some(d) => (true, d),
        None => (false, s),
    };
    if !(1..=2).contains(&digits.len()) || !all_digits(digits) {
        return None;
    }
    let value: i32 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// `A2992` (hundredths of inHg) or `Q1013` (hPa), as inHg.
fn parse_altimeter(token: &str) -> Option<f64> {
    if token.len() != 5 || !token.is_ascii() {
        return None;
    }
    let (unit, digits) = token.split_at(1);
    if !all_digits(digits) {
        return None;
    }
    let value: f64 = digits.parse::<u32>().ok()?.into();
    match unit {
        "A" => Some(value / 100.0),
        "Q" => Some(round2(value * IN_HG_PER_HPA)),
        _ => None,
    }
}

/// Present-weather group: optional intensity or vicinity prefix followed by
/// two-letter descriptor/phenomenon codes.
fn is_weather(token: &str) -> bool {
    let body = token
        .strip_prefix('+')
        .or_else(|| token.strip_prefix('-'))
        .unwrap_or(token);
    let body = body.strip_prefix("VC").unwrap_or(body);
    if body.is_empty() || body.len() % 2 != 0 {
        return false;
    }
    body.as_bytes().chunks(2).all(|pair| {
        DESCRIPTORS
            .iter()
            .chain(PHENOMENA.iter())
            .any(|code| code.as_bytes() == pair)
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    /// 2025-10-15T19:00:00Z
    const NOW: i64 = 1_760_554_800;

    fn decode_ok(raw: &str) -> Metar {
        decode(raw, NOW).unwrap()
    }

    #[test]
    fn test_decodes_typical_report() {
        let m = decode_ok("KCGI 151853Z 18010KT 10SM BKN025 22/18 A2992");

        assert_eq!(m.reported.epoch, NOW - 7 * 60);
        assert_eq!(m.reported.age_minutes, 7);
        assert_eq!(m.wind.direction, 180);
        assert_eq!(m.wind.speed_kt, 10);
        assert_eq!(m.wind.gust_kt, None);
        assert!(!m.wind.calm && !m.wind.variable);
        assert_eq!(m.visibility, Visibility::Unlimited);
        assert_eq!(
            m.clouds,
            vec![CloudLayer {
                cover: CloudCover::Broken,
                base_ft: 2500
            }]
        );
        assert_eq!(m.temperature_c, Some(22));
        assert_eq!(m.dewpoint_c, Some(18));
        assert_eq!(m.altimeter_in_hg, Some(29.92));
        assert_eq!(m.flight_category, FlightCategory::Mvfr);
        assert_eq!(m.raw_text, "KCGI 151853Z 18010KT 10SM BKN025 22/18 A2992");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let raw = "KORD 151851Z 27015G25KT 1 1/2SM -RA BR OVC008 M02/M04 A3001 RMK AO2";
        let a = serde_json::to_string(&decode_ok(raw)).unwrap();
        let b = serde_json::to_string(&decode_ok(raw)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_station_name_from_metadata() {
        let meta = StationMeta {
            name: "Chicago O'Hare Intl".into(),
        };
        let m = decode_with_station("KORD 151851Z 27015KT 10SM CLR 10/05 A3001", &meta, NOW)
            .unwrap();
        assert_eq!(m.station_name, "Chicago O'Hare Intl");
    }

    #[test]
    fn test_calm_wind_drops_stray_digits() {
        let m = decode_ok("KCGI 151853Z 27000G05KT 10SM CLR 10/05 A3000");
        assert!(m.wind.calm);
        assert_eq!(m.wind.direction, 0);
        assert_eq!(m.wind.speed_kt, 0);
        assert_eq!(m.wind.gust_kt, None);

        let m = decode_ok("KCGI 151853Z 00000KT 10SM CLR 10/05 A3000");
        assert_eq!(m.wind, Wind::calm());
    }

    #[test]
    fn test_unreported_wind_group() {
        let m = decode_ok("KCGI 151853Z AUTO /////KT 10SM OVC008 22/18 A2992 RMK AO2");
        assert_eq!(m.wind, Wind::missing());
        assert!(!m.wind.calm);
        assert_eq!(m.flight_category, FlightCategory::Ifr);
        assert_eq!(m.altimeter_in_hg, Some(29.92));

        assert!(matches!(
            decode("KCGI 151853Z ///KT 10SM CLR 22/18 A2992", NOW),
            Err(DecodeError::MalformedReport { .. })
        ));
    }

    #[test]
    fn test_variable_wind() {
        let m = decode_ok("KCGI 151853Z VRB10KT 10SM CLR 10/05 A3000");
        assert!(m.wind.variable);
        assert!(!m.wind.calm);
        assert_eq!(m.wind.speed_kt, 10);
        assert_eq!(m.wind.gust_kt, None);
    }

    #[test]
    fn test_gusts_only_when_reported() {
        let m = decode_ok("KCGI 151853Z 31020G35KT 10SM CLR 10/05 A3000");
        assert_eq!(m.wind.gust_kt, Some(35));
        assert_eq!(m.wind.speed_kt, 20);
    }

    #[test]
    fn test_wind_in_meters_per_second() {
        let m = decode_ok("EGLL 151850Z 24005MPS 9999 FEW030 12/08 Q1013");
        assert_eq!(m.wind.speed_kt, 10);
        assert_eq!(m.visibility, Visibility::Unlimited);
        assert_eq!(m.altimeter_in_hg, Some(29.91));
    }

    #[test]
    fn test_modifiers_and_report_type_are_skipped() {
        let m = decode_ok("METAR KCGI 151853Z AUTO 18010KT 10SM CLR 22/18 A2992");
        assert_eq!(m.wind.speed_kt, 10);
        let m = decode_ok("SPECI KCGI 151853Z COR 18010KT 10SM CLR 22/18 A2992");
        assert_eq!(m.wind.direction, 180);
    }

    #[test]
    fn test_visibility_forms() {
        let vis = |raw: &str| decode_ok(raw).visibility;
        assert_eq!(
            vis("KCGI 151853Z 18010KT 1/2SM FG OVC002 10/10 A2992"),
            Visibility::StatuteMiles(0.5)
        );
        assert_eq!(
            vis("KCGI 151853Z 18010KT 1 1/2SM BR OVC008 10/10 A2992"),
            Visibility::StatuteMiles(1.5)
        );
        assert_eq!(
            vis("KCGI 151853Z 18010KT 3SM HZ CLR 10/10 A2992"),
            Visibility::StatuteMiles(3.0)
        );
        assert_eq!(
            vis("KCGI 151853Z 18010KT M1/4SM FG VV001 10/10 A2992"),
            Visibility::StatuteMiles(0.25)
        );
        assert_eq!(
            vis("KCGI 151853Z 18010KT P6SM CLR 10/10 A2992"),
            Visibility::StatuteMiles(6.0)
        );
        assert_eq!(
            vis("KCGI 151853Z 18010KT 15SM CLR 10/10 A2992"),
            Visibility::Unlimited
        );
        // Not reported
        assert_eq!(vis("KCGI 151853Z 18010KT CLR 10/10 A2992"), Visibility::Unlimited);
    }

    #[test]
    fn test_cloud_layers_keep_reported_order() {
        let m = decode_ok("KCGI 151853Z 18010KT 10SM OVC050 FEW010 BKN030CB 22/18 A2992");
        let covers: Vec<_> = m.clouds.iter().map(|l| l.cover.code()).collect();
        assert_eq!(covers, ["OVC", "FEW", "BKN"]);
        assert_eq!(m.ceiling_ft(), Some(3000));
        assert_eq!(m.flight_category, FlightCategory::Mvfr);
    }

    #[test]
    fn test_unknown_cover_preserved_but_not_a_ceiling() {
        let m = decode_ok("KCGI 151853Z 18010KT 10SM VV003 22/18 A2992");
        assert_eq!(m.clouds.len(), 1);
        assert_eq!(m.clouds[0].cover, CloudCover::Other("VV".into()));
        assert_eq!(m.clouds[0].base_ft, 300);
        assert_eq!(m.ceiling_ft(), None);
    }

    #[test]
    fn test_clear_sky_yields_no_layers() {
        for clear in ["SKC", "CLR", "NSC", "NCD"] {
            let raw = format!("KCGI 151853Z 18010KT 10SM {} 22/18 A2992", clear);
            assert!(decode_ok(&raw).clouds.is_empty(), "{}", clear);
        }
        let m = decode_ok("LFPG 151830Z 22008KT CAVOK 18/09 Q1020");
        assert!(m.clouds.is_empty());
        assert_eq!(m.visibility, Visibility::Unlimited);
        assert_eq!(m.flight_category, FlightCategory::Vfr);
    }

    #[test]
    fn test_weather_codes_collected_in_order() {
        let m = decode_ok("KCGI 151853Z 18010KT 2SM +TSRA VCSH BR BKN008CB 22/21 A2980");
        assert_eq!(m.weather, "+TSRA VCSH BR");
        assert_eq!(m.flight_category, FlightCategory::Ifr);
    }

    #[test]
    fn test_negative_and_missing_temperatures() {
        let m = decode_ok("KCGI 151853Z 18010KT 10SM CLR M05/M12 A3040");
        assert_eq!(m.temperature_c, Some(-5));
        assert_eq!(m.dewpoint_c, Some(-12));

        let m = decode_ok("KCGI 151853Z 18010KT 10SM CLR 05/ A3040");
        assert_eq!(m.temperature_c, Some(5));
        assert_eq!(m.dewpoint_c, None);

        let m = decode_ok("KCGI 151853Z 18010KT 10SM CLR A3040");
        assert_eq!(m.temperature_c, None);
    }

    #[test]
    fn test_tokens_out_of_order_and_runway_visual_range() {
        let m = decode_ok("KCGI 151853Z 18010KT A2992 BKN004 R28L/2400FT 3/4SM 22/18 FG");
        assert_eq!(m.visibility, Visibility::StatuteMiles(0.75));
        assert_eq!(m.altimeter_in_hg, Some(29.92));
        assert_eq!(m.weather, "FG");
        assert_eq!(m.flight_category, FlightCategory::Lifr);
    }

    #[test]
    fn test_remarks_and_unknown_groups_ignored() {
        let m = decode_ok(
            "KCGI 151853Z 18010KT 170V230 10SM FEW250 22/18 A2992 RMK AO2 SLP132 T02220183 BKN001",
        );
        assert_eq!(m.clouds.len(), 1);
        assert_eq!(m.flight_category, FlightCategory::Vfr);
    }

    #[test]
    fn test_missing_prefix_is_malformed() {
        for raw in [
            "",
            "151853Z 18010KT 10SM CLR",
            "KCGI 18010KT 10SM CLR",
            "KCGI 151853Z 10SM CLR 22/18 A2992",
            "KCGI 151853Z",
            "KCGI 159953Z 18010KT 10SM CLR",
        ] {
            assert!(
                matches!(decode(raw, NOW), Err(DecodeError::MalformedReport { .. })),
                "expected malformed: {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_issue_time_rolls_back_to_previous_month() {
        // Day 31 decoded on 2025-10-15 lands in August (September has 30 days)
        let m = decode_ok("KCGI 311200Z 18010KT 10SM CLR 22/18 A2992");
        let expected = Utc.with_ymd_and_hms(2025, 8, 31, 12, 0, 0).unwrap().timestamp();
        assert_eq!(m.reported.epoch, expected);

        // Slightly ahead of the decode clock stays in the current month
        let m = decode_ok("KCGI 151905Z 18010KT 10SM CLR 22/18 A2992");
        assert_eq!(m.reported.epoch, NOW + 5 * 60);
        assert_eq!(m.reported.age_minutes, 0);
    }

    #[test]
    fn test_metric_visibility_converted() {
        let m = decode_ok("EGLL 151850Z 24010KT 0800 FG VV002 08/08 Q1013");
        assert_eq!(m.visibility, Visibility::StatuteMiles(0.5));
        assert_eq!(m.flight_category, FlightCategory::Lifr);
    }
}
