//! Forecast zone types.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A geographic forecast region known to the upstream weather service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone identifier (e.g., "DCZ001")
    pub id: String,
    /// Display name (e.g., "District of Columbia")
    pub name: String,
    /// Two-letter state code, when the upstream record carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// Whether `id` has the shape of an NWS zone identifier: a two-letter state
/// code, `Z` (forecast zone) or `C` (county), and three digits, e.g. "DCZ001".
pub fn is_valid_zone_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    bytes.len() == 6
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && matches!(bytes[2], b'Z' | b'C')
        && bytes[3..].iter().all(u8::is_ascii_digit)
}

/// Zone catalog document as returned by `GET /zones?type=forecast`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoneCatalog {
    #[serde(default)]
    pub features: Vec<ZoneFeature>,
}

/// One GeoJSON feature of the zone catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneFeature {
    pub properties: ZoneProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneProperties {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub observation_stations: Vec<String>,
}

impl ZoneCatalog {
    /// Convert the catalog into zones.
    ///
    /// Only zones with at least one observation station are kept. Duplicate
    /// identifiers keep their first occurrence, and upstream order is preserved.
    pub fn into_zones(self) -> Vec<Zone> {
        let mut seen = HashSet::new();

        self.features
            .into_iter()
            .map(|feature| feature.properties)
            .filter(|props| !props.observation_stations.is_empty())
            .filter(|props| seen.insert(props.id.clone()))
            .map(|props| Zone {
                id: props.id,
                name: props.name,
                state: props.state.filter(|s| !s.is_empty()),
            })
            .collect()
    }
}
