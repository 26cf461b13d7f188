//! Common types shared across the zone forecast workspace.

pub mod error;
pub mod forecast;
pub mod zone;

pub use error::{ForecastError, ForecastResult};
pub use forecast::{Forecast, ForecastPeriodRecord, ZoneForecastDocument};
pub use zone::{is_valid_zone_id, Zone, ZoneCatalog, ZoneFeature};
