//! Forecast period types.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One forecast period for a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Period sequence number within the forecast (1-based)
    pub number: u32,
    /// Period name (e.g., "Tonight", "Thursday")
    pub name: String,
    pub detailed_forecast: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_forecast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<FixedOffset>>,
}

impl Forecast {
    pub fn new(number: u32, name: impl Into<String>, detailed_forecast: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            detailed_forecast: detailed_forecast.into(),
            short_forecast: None,
            temperature: None,
            temperature_unit: None,
            wind_speed: None,
            wind_direction: None,
            start_time: None,
            end_time: None,
        }
    }
}

/// Zone forecast document as returned by `GET /zones/forecast/{id}/forecast`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoneForecastDocument {
    #[serde(default)]
    pub properties: Option<ZoneForecastProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoneForecastProperties {
    #[serde(default)]
    pub periods: Vec<ForecastPeriodRecord>,
}

/// Upstream forecast period record.
///
/// Zone forecasts only guarantee `number`, `name` and `detailedForecast`;
/// gridpoint-style fields are carried over when present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriodRecord {
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub detailed_forecast: String,
    #[serde(default)]
    pub short_forecast: Option<String>,
    #[serde(default)]
    pub temperature: Option<i32>,
    #[serde(default)]
    pub temperature_unit: Option<String>,
    #[serde(default)]
    pub wind_speed: Option<String>,
    #[serde(default)]
    pub wind_direction: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub end_time: Option<DateTime<FixedOffset>>,
}

impl From<ForecastPeriodRecord> for Forecast {
    fn from(record: ForecastPeriodRecord) -> Self {
        Self {
            number: record.number,
            name: record.name,
            detailed_forecast: record.detailed_forecast,
            short_forecast: record.short_forecast,
            temperature: record.temperature,
            temperature_unit: record.temperature_unit,
            wind_speed: record.wind_speed,
            wind_direction: record.wind_direction,
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}

impl ZoneForecastDocument {
    /// Convert the document into forecast periods (empty when there are none).
    pub fn into_forecasts(self) -> Vec<Forecast> {
        self.properties
            .map(|props| props.periods.into_iter().map(Forecast::from).collect())
            .unwrap_or_default()
    }
}
