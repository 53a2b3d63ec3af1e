//! Human-readable summary printed with `--verbose`.

use chrono::DateTime;
use std::fmt::{self, Write};

use pilotbar_weather::{Airport, Visibility, Wind};

pub fn summary(airport: &Airport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    write_summary(&mut out, airport).map(|()| out).unwrap_or_default()
}

fn write_summary(out: &mut String, airport: &Airport) -> fmt::Result {
    let metar = &airport.metar;

    writeln!(out, "{}  {}", airport.icao, airport.name)?;
    if airport.is_empty() {
        return writeln!(out, "  no observation yet");
    }

    let observed = DateTime::from_timestamp(metar.reported.epoch, 0)
        .map(|t| t.format("%d%H%MZ").to_string())
        .unwrap_or_default();
    writeln!(
        out,
        "  observed    {} ({} min ago)",
        observed, metar.reported.age_minutes
    )?;
    writeln!(out, "  category    {}", metar.flight_category)?;
    writeln!(out, "  wind        {}", describe_wind(&metar.wind))?;
    writeln!(out, "  visibility  {}", describe_visibility(metar.visibility))?;

    let clouds = if metar.clouds.is_empty() {
        "clear".to_string()
    } else {
        metar
            .clouds
            .iter()
            .map(|layer| format!("{}{:03}", layer.cover, layer.base_ft / 100))
            .collect::<Vec<_>>()
            .join(" ")
    };
    writeln!(out, "  clouds      {}", clouds)?;
    if let Some(ceiling) = metar.ceiling_ft() {
        writeln!(out, "  ceiling     {} ft", ceiling)?;
    }
    if !metar.weather.is_empty() {
        writeln!(out, "  weather     {}", metar.weather)?;
    }

    match (metar.temperature_c, metar.dewpoint_c) {
        (Some(t), Some(d)) => writeln!(out, "  temp/dew    {}/{} C", t, d)?,
        (Some(t), None) => writeln!(out, "  temp        {} C", t)?,
        _ => {}
    }
    if let Some(alt) = metar.altimeter_in_hg {
        writeln!(out, "  altimeter   {:.2} inHg", alt)?;
    }
    if let Some(elev) = airport.elevation_ft {
        writeln!(out, "  elevation   {:.0} ft", elev)?;
    }
    writeln!(out, "  raw         {}", metar.raw_text)
}

fn describe_wind(wind: &Wind) -> String {
    if wind.missing {
        return "not reported".to_string();
    }
    if wind.calm {
        return "calm".to_string();
    }
    let mut s = if wind.variable {
        format!("variable at {} kt", wind.speed_kt)
    } else {
        format!("{:03} at {} kt", wind.direction, wind.speed_kt)
    };
    if let Some(gust) = wind.gust_kt {
        s.push_str(&format!(", gusting {}", gust));
    }
    s
}

fn describe_visibility(visibility: Visibility) -> String {
    match visibility {
        Visibility::Unlimited => "10+ SM".to_string(),
        Visibility::StatuteMiles(sm) => format!("{} SM", sm),
    }
}
