//! Rendering a snapshot as a waybar custom-module JSON object.

use serde::Serialize;

use pilotbar_weather::{Airport, CloudCover, CloudLayer, Visibility, Wind};

/// Visibility at or above this is not worth showing.
const VISIBILITY_DISPLAY_LIMIT_SM: f64 = 6.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaybarOutput {
    pub text: String,
    pub tooltip: String,
    pub class: String,
    pub alt: String,
}

impl WaybarOutput {
    pub fn render(airport: &Airport, format: &str) -> Self {
        let category = airport.metar.flight_category.as_str();
        Self {
            text: format_text(airport, format),
            tooltip: format_tooltip(airport),
            class: category.to_lowercase(),
            alt: category.to_string(),
        }
    }
}

/// Substitute `{placeholder}`s in `format`. Unknown placeholders are left
/// as written. Runs of spaces left by empty values collapse to one.
pub fn format_text(airport: &Airport, format: &str) -> String {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        match after.find('}') {
            Some(close) => {
                let key = &after[1..close];
                match placeholder(airport, key) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&after[..=close]),
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    collapse_spaces(&out)
}

fn placeholder(airport: &Airport, key: &str) -> Option<String> {
    let metar = &airport.metar;
    let value = match key {
        "temps" => match (metar.temperature_c, metar.dewpoint_c) {
            (Some(t), Some(d)) => format!("{}/{}", t, d),
            (Some(t), None) => t.to_string(),
            _ => String::new(),
        },
        "temp" => metar.temperature_c.map(|t| t.to_string()).unwrap_or_default(),
        "dewpoint" => metar.dewpoint_c.map(|d| d.to_string()).unwrap_or_default(),
        "winds" => format_wind(&metar.wind),
        "cloud-icon" => sky_layer(&metar.clouds)
            .map(|(icon, _)| icon.to_string())
            .unwrap_or_default(),
        "clouds" => sky_layer(&metar.clouds)
            .map(|(_, layer)| format!("{:03}", layer.base_ft / 100))
            .unwrap_or_default(),
        "vis" => format_visibility(metar.visibility),
        "wx" => metar.weather.clone(),
        "stationID" => airport.icao.to_string(),
        "age" => metar.reported.age_minutes.to_string(),
        "fltcat" => metar.flight_category.to_string(),
        "altimeter" => metar
            .altimeter_in_hg
            .map(|a| format!("{:.2}", a))
            .unwrap_or_default(),
        _ => return None,
    };
    Some(value)
}

fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out.trim().to_string()
}

pub fn format_wind(wind: &Wind) -> String {
    if wind.calm || wind.missing {
        return String::new();
    }
    let mut s = if wind.variable {
        format!("V{}", wind.speed_kt)
    } else {
        format!("{:03}/{}", wind.direction, wind.speed_kt)
    };
    if let Some(gust) = wind.gust_kt {
        s.push_str(&format!("G{}", gust));
    }
    s
}

/// Only restricted visibility is shown.
pub fn format_visibility(visibility: Visibility) -> String {
    match visibility.miles() {
        Some(sm) if sm > 0.0 && sm < VISIBILITY_DISPLAY_LIMIT_SM => format!("{}SM", sm),
        _ => String::new(),
    }
}

pub fn cloud_icon(cover: &CloudCover) -> Option<&'static str> {
    match cover {
        CloudCover::Few => Some("\u{F0468}"),
        CloudCover::Scattered => Some("\u{F0A9F}"),
        CloudCover::Broken => Some("\u{F0AA3}"),
        CloudCover::Overcast => Some("\u{F0AA5}"),
        CloudCover::Other(_) => None,
    }
}

/// Layer shown in the bar: the ceiling if there is one, else the first
/// layer with a known cover.
fn sky_layer(clouds: &[CloudLayer]) -> Option<(&'static str, &CloudLayer)> {
    let ceiling = clouds
        .iter()
        .filter(|layer| layer.cover.is_ceiling())
        .min_by_key(|layer| layer.base_ft);
    let layer = ceiling.or_else(|| clouds.iter().find(|l| cloud_icon(&l.cover).is_some()))?;
    cloud_icon(&layer.cover).map(|icon| (icon, layer))
}

pub fn format_tooltip(airport: &Airport) -> String {
    let mut out = format!("<tt>{}</tt>", escape_markup(&airport.metar.raw_text));
    if !airport.raw_taf.is_empty() {
        out.push_str(&format!(
            "\n\n<tt>{}</tt>",
            escape_markup(&wrap_taf(&airport.raw_taf))
        ));
    }
    if !airport.raw_afd.is_empty() {
        out.push_str("\n\n");
        out.push_str(&escape_markup(&airport.raw_afd));
    }
    out
}

/// Break a TAF onto one line per change group.
pub fn wrap_taf(raw: &str) -> String {
    raw.replace(" FM", "\n  FM")
        .replace(" TEMPO", "\n  TEMPO")
        .replace(" BECMG", "\n  BECMG")
        .replace(" PROB", "\n  PROB")
}

/// Waybar tooltips are Pango markup.
fn escape_markup(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
