//! NWS-shaped JSON fixtures.
//!
//! Payloads mirror `GET /zones?type=forecast` and
//! `GET /zones/forecast/{id}/forecast` closely enough for the client's
//! decoders, without the GeoJSON geometry.

use serde_json::{json, Value};

/// Zones pre-warmed by default.
pub const POPULAR_ZONES: [&str; 3] = ["DCZ001", "NYZ072", "PAZ071"];

/// A zone catalog feature.
pub fn zone_feature(id: &str, name: &str, stations: &[&str]) -> Value {
    let stations: Vec<String> = stations
        .iter()
        .map(|s| format!("https://api.weather.gov/stations/{}", s))
        .collect();

    json!({
        "id": format!("https://api.weather.gov/zones/forecast/{}", id),
        "type": "Feature",
        "geometry": null,
        "properties": {
            "@id": format!("https://api.weather.gov/zones/forecast/{}", id),
            "@type": "wx:Zone",
            "id": id,
            "type": "public",
            "name": name,
            "state": id.get(..2).unwrap_or_default(),
            "observationStations": stations,
        }
    })
}

/// A catalog with the popular zones, a marine zone without stations and a
/// duplicate record.
pub fn zone_catalog() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            zone_feature("DCZ001", "District of Columbia", &["KDCA"]),
            zone_feature("NYZ072", "New York (Manhattan)", &["KNYC", "KLGA"]),
            zone_feature("ANZ530", "Chesapeake Bay north of Pooles Island", &[]),
            zone_feature("PAZ071", "Philadelphia", &["KPHL"]),
            zone_feature("DCZ001", "District of Columbia (duplicate)", &["KDCA"]),
        ]
    })
}

/// Identifiers `zone_catalog()` should decode to.
pub fn expected_zone_ids() -> Vec<&'static str> {
    vec!["DCZ001", "NYZ072", "PAZ071"]
}

/// A zone forecast document with `periods` generic periods.
pub fn zone_forecast(zone_id: &str, periods: usize) -> Value {
    const NAMES: [&str; 4] = ["Today", "Tonight", "Tomorrow", "Tomorrow Night"];

    let periods: Vec<Value> = (0..periods)
        .map(|i| {
            json!({
                "number": i + 1,
                "name": NAMES[i % NAMES.len()],
                "detailedForecast": format!("Forecast period {} for {}.", i + 1, zone_id),
            })
        })
        .collect();

    json!({
        "type": "Feature",
        "geometry": null,
        "properties": {
            "zone": format!("https://api.weather.gov/zones/forecast/{}", zone_id),
            "updated": "2024-06-01T10:05:00+00:00",
            "periods": periods,
        }
    })
}

/// A forecast document without any periods.
pub fn empty_zone_forecast(zone_id: &str) -> Value {
    json!({
        "properties": {
            "zone": format!("https://api.weather.gov/zones/forecast/{}", zone_id),
            "periods": [],
        }
    })
}
