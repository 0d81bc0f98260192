use crate::best_time::PreferenceProfile;
use crate::coordinator::{ForecastSettings, ForecastSources, ObservationSettings};
use crate::source::{
    self, LightningFeed, MareographFeed, ObservationSource, OpenMeteoForecast, StationObservation,
};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Root configuration of a weatherloop instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub location: LocationConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub observation: ObservationConfig,
    #[serde(default)]
    pub lightning: LightningConfig,
    #[serde(default)]
    pub mareograph: MareographConfig,
    #[serde(default)]
    pub preferences: PreferenceProfile,
    /// Clear an optional field after this many consecutive failed cycles.
    #[serde(default)]
    pub stale_after_failures: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Display name for the place sensor
    #[serde(default)]
    pub name: Option<String>,
}

impl LocationConfig {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{:.4}, {:.4}", self.latitude, self.longitude))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub base_url: String,
    pub update_interval_secs: u64,
    pub timeout_ms: u64,
    pub forecast_hours: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: source::forecast::DEFAULT_BASE_URL.to_string(),
            update_interval_secs: 1800,
            timeout_ms: 40_000,
            forecast_hours: 48,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    pub station_id: String,
    pub base_url: String,
    pub update_interval_secs: u64,
    pub timeout_ms: u64,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            station_id: String::new(),
            base_url: "http://localhost:8080".to_string(),
            update_interval_secs: 600,
            timeout_ms: 40_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightningConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_ms: u64,
    pub radius_km: f64,
    pub max_strikes: usize,
    pub lookback_minutes: u32,
}

impl Default for LightningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 5_000,
            radius_km: 50.0,
            max_strikes: 5,
            lookback_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MareographConfig {
    pub enabled: bool,
    pub base_url: String,
    pub station_id: String,
    pub timeout_ms: u64,
    pub horizon_hours: u32,
}

impl Default for MareographConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8080".to_string(),
            station_id: String::new(),
            timeout_ms: 5_000,
            horizon_hours: 24,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check every value the coordinators rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_latitude(self.location.latitude).map_err(ConfigError::Invalid)?;
        validation::validate_longitude(self.location.longitude).map_err(ConfigError::Invalid)?;

        validation::validate_base_url(&self.forecast.base_url).map_err(ConfigError::Invalid)?;
        validation::validate_positive("forecast.update_interval_secs", self.forecast.update_interval_secs)
            .map_err(ConfigError::Invalid)?;
        validation::validate_positive("forecast.timeout_ms", self.forecast.timeout_ms)
            .map_err(ConfigError::Invalid)?;
        validation::validate_positive("forecast.forecast_hours", u64::from(self.forecast.forecast_hours))
            .map_err(ConfigError::Invalid)?;

        validation::validate_station_id(&self.observation.station_id).map_err(ConfigError::Invalid)?;
        validation::validate_base_url(&self.observation.base_url).map_err(ConfigError::Invalid)?;
        validation::validate_positive(
            "observation.update_interval_secs",
            self.observation.update_interval_secs,
        )
        .map_err(ConfigError::Invalid)?;
        validation::validate_positive("observation.timeout_ms", self.observation.timeout_ms)
            .map_err(ConfigError::Invalid)?;

        if self.lightning.enabled {
            validation::validate_base_url(&self.lightning.base_url).map_err(ConfigError::Invalid)?;
            validation::validate_positive("lightning.timeout_ms", self.lightning.timeout_ms)
                .map_err(ConfigError::Invalid)?;
            validation::validate_positive("lightning.max_strikes", self.lightning.max_strikes as u64)
                .map_err(ConfigError::Invalid)?;
            if !self.lightning.radius_km.is_finite() || self.lightning.radius_km <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "lightning.radius_km must be positive, got {}",
                    self.lightning.radius_km
                )));
            }
        }

        if self.mareograph.enabled {
            validation::validate_station_id(&self.mareograph.station_id)
                .map_err(ConfigError::Invalid)?;
            validation::validate_base_url(&self.mareograph.base_url).map_err(ConfigError::Invalid)?;
            validation::validate_positive("mareograph.timeout_ms", self.mareograph.timeout_ms)
                .map_err(ConfigError::Invalid)?;
            validation::validate_positive(
                "mareograph.horizon_hours",
                u64::from(self.mareograph.horizon_hours),
            )
            .map_err(ConfigError::Invalid)?;
        }

        let prefs = &self.preferences;
        validation::validate_temperature_range(prefs.temp_min, prefs.temp_max)
            .map_err(ConfigError::Invalid)?;
        validation::validate_threshold("preferences.max_wind", prefs.max_wind)
            .map_err(ConfigError::Invalid)?;
        validation::validate_percentage("preferences.max_rain_probability", prefs.max_rain_probability)
            .map_err(ConfigError::Invalid)?;
        validation::validate_threshold("preferences.weights.temperature", prefs.weights.temperature)
            .map_err(ConfigError::Invalid)?;
        validation::validate_threshold("preferences.weights.wind", prefs.weights.wind)
            .map_err(ConfigError::Invalid)?;
        validation::validate_threshold("preferences.weights.rain", prefs.weights.rain)
            .map_err(ConfigError::Invalid)?;

        if self.stale_after_failures == Some(0) {
            return Err(ConfigError::Invalid(
                "stale_after_failures must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the HTTP-backed forecast sources.
    pub fn forecast_sources(&self, client: &reqwest::Client) -> ForecastSources {
        let location = &self.location;
        ForecastSources {
            forecast: Arc::new(OpenMeteoForecast::new(
                client.clone(),
                self.forecast.base_url.clone(),
                location.latitude,
                location.longitude,
                self.forecast.forecast_hours,
            )),
            lightning: self.lightning.enabled.then(|| -> source::LightningSource {
                Arc::new(LightningFeed::new(
                    client.clone(),
                    self.lightning.base_url.clone(),
                    location.latitude,
                    location.longitude,
                    self.lightning.radius_km,
                    self.lightning.max_strikes,
                    self.lightning.lookback_minutes,
                ))
            }),
            sea_level: self.mareograph.enabled.then(|| -> source::SeaLevelSource {
                Arc::new(MareographFeed::new(
                    client.clone(),
                    self.mareograph.base_url.clone(),
                    self.mareograph.station_id.clone(),
                    self.mareograph.horizon_hours,
                ))
            }),
        }
    }

    pub fn observation_source(&self, client: &reqwest::Client) -> ObservationSource {
        Arc::new(StationObservation::new(
            client.clone(),
            self.observation.base_url.clone(),
            self.observation.station_id.clone(),
        ))
    }

    pub fn forecast_settings(&self) -> ForecastSettings {
        ForecastSettings {
            update_interval: Duration::from_secs(self.forecast.update_interval_secs),
            forecast_timeout: Duration::from_millis(self.forecast.timeout_ms),
            lightning_timeout: Duration::from_millis(self.lightning.timeout_ms),
            sea_level_timeout: Duration::from_millis(self.mareograph.timeout_ms),
            profile: self.preferences.clone(),
            stale_after_failures: self.stale_after_failures,
        }
    }

    pub fn observation_settings(&self) -> ObservationSettings {
        ObservationSettings {
            update_interval: Duration::from_secs(self.observation.update_interval_secs),
            timeout: Duration::from_millis(self.observation.timeout_ms),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
