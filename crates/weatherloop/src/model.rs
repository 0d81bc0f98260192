//! Normalized data model shared by every source and consumer.
//!
//! Everything here is immutable once a source has produced it. Coordinators
//! only ever replace whole values; nothing is patched in place.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// One hourly forecast step.
///
/// Timestamps keep the UTC offset of the forecast location so that
/// time-of-day windows and calendar-day grouping operate in local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<FixedOffset>,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,
    /// Mean wind speed in m/s.
    pub wind_speed: f64,
    /// Cloud cover in %.
    pub cloud_cover: f64,
    /// Probability of precipitation in %.
    pub precipitation_probability: f64,
    /// WMO weather interpretation code.
    pub symbol_code: u16,
    /// Wind direction in degrees.
    pub wind_direction: Option<f64>,
    /// Wind gust speed in m/s.
    pub wind_gust: Option<f64>,
    /// Precipitation amount in mm for the step.
    pub precipitation: Option<f64>,
    /// Sea-level pressure in hPa.
    pub pressure: Option<f64>,
    pub uv_index: Option<f64>,
    pub is_day: Option<bool>,
}

impl ForecastPoint {
    /// Condition for this step, with `sunny` turned into `clear-night`
    /// when the step is known to be after dark.
    pub fn condition(&self) -> Condition {
        let condition = Condition::from_wmo_code(self.symbol_code);
        if condition == Condition::Sunny && self.is_day == Some(false) {
            Condition::ClearNight
        } else {
            condition
        }
    }
}

/// Latest reading of a fixed observation station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationReading {
    pub station_id: String,
    pub station_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: Option<f64>,
    pub wind_gust: Option<f64>,
    pub pressure: Option<f64>,
    pub dew_point: Option<f64>,
    /// Precipitation intensity in mm/h.
    pub precipitation: Option<f64>,
    pub cloud_cover: Option<f64>,
}

/// A single located lightning strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightningStrike {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance from the configured location, in km.
    pub distance_km: f64,
    /// Peak current in kA.
    pub peak_current: f64,
    pub multiplicity: u32,
}

/// One step of the predicted sea level series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeaLevelPoint {
    pub timestamp: DateTime<Utc>,
    pub predicted_level_cm: f64,
}

/// Weather condition derived from a weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Sunny,
    ClearNight,
    #[serde(rename = "partlycloudy")]
    PartlyCloudy,
    Cloudy,
    Fog,
    Rainy,
    Pouring,
    Snowy,
    SnowyRainy,
    Hail,
    Lightning,
    LightningRainy,
    Exceptional,
}

impl Condition {
    /// Map a WMO weather interpretation code (as used by Open-Meteo).
    pub fn from_wmo_code(code: u16) -> Self {
        match code {
            0 => Condition::Sunny,
            1 | 2 => Condition::PartlyCloudy,
            3 => Condition::Cloudy,
            45 | 48 => Condition::Fog,
            51 | 53 | 55 | 56 | 57 | 61 | 63 | 80 | 81 => Condition::Rainy,
            65 | 82 => Condition::Pouring,
            66 | 67 => Condition::SnowyRainy,
            71 | 73 | 75 | 77 | 85 | 86 => Condition::Snowy,
            95 => Condition::LightningRainy,
            96 | 99 => Condition::Hail,
            _ => Condition::Exceptional,
        }
    }

    /// Severity on a 0-100 scale used when summarising a day.
    ///
    /// Tiers: >= 90 severe, >= 55 precipitation, >= 37 visibility.
    pub fn severity(self) -> u8 {
        match self {
            Condition::LightningRainy => 100,
            Condition::Lightning => 95,
            Condition::Exceptional => 92,
            Condition::Hail => 90,
            Condition::Pouring => 80,
            Condition::SnowyRainy => 70,
            Condition::Snowy => 65,
            Condition::Rainy => 60,
            Condition::Fog => 40,
            Condition::Cloudy => 20,
            Condition::PartlyCloudy => 10,
            Condition::Sunny | Condition::ClearNight => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Sunny => "sunny",
            Condition::ClearNight => "clear-night",
            Condition::PartlyCloudy => "partlycloudy",
            Condition::Cloudy => "cloudy",
            Condition::Fog => "fog",
            Condition::Rainy => "rainy",
            Condition::Pouring => "pouring",
            Condition::Snowy => "snowy",
            Condition::SnowyRainy => "snowy-rainy",
            Condition::Hail => "hail",
            Condition::Lightning => "lightning",
            Condition::LightningRainy => "lightning-rainy",
            Condition::Exceptional => "exceptional",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
