//! Coordinate-based hourly forecast from the Open-Meteo API.

use super::{finite, get_json, required, Result, SourceClient, SourceError, SourceKind};
use crate::model::ForecastPoint;
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use serde::Deserialize;

/// Public Open-Meteo forecast endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Hourly variables requested from the API.
const HOURLY_VARIABLES: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,\
wind_direction_10m,wind_gusts_10m,cloud_cover,precipitation_probability,precipitation,\
pressure_msl,weather_code,is_day,uv_index";

/// Open-Meteo local time format (no seconds, no offset).
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Hourly forecast client bound to one location.
#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    client: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    forecast_hours: u32,
}

impl OpenMeteoForecast {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        latitude: f64,
        longitude: f64,
        forecast_hours: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            latitude,
            longitude,
            forecast_hours,
        }
    }
}

#[async_trait]
impl SourceClient for OpenMeteoForecast {
    type Output = Vec<ForecastPoint>;

    fn kind(&self) -> SourceKind {
        SourceKind::Forecast
    }

    async fn fetch(&self) -> Result<Vec<ForecastPoint>> {
        let request = self.client.get(&self.base_url).query(&[
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("hourly", HOURLY_VARIABLES.to_string()),
            ("forecast_hours", self.forecast_hours.to_string()),
            ("wind_speed_unit", "ms".to_string()),
            ("timezone", "auto".to_string()),
        ]);

        let response: ForecastResponse = get_json(request).await?;
        let points = normalize(response)?;
        log::debug!("[Source] forecast: {} hourly points", points.len());
        Ok(points)
    }
}

/// Wire format of the forecast response (columnar arrays).
#[derive(Debug, Deserialize)]
pub(crate) struct ForecastResponse {
    utc_offset_seconds: i32,
    hourly: HourlyColumns,
}

#[derive(Debug, Deserialize)]
struct HourlyColumns {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    relative_humidity_2m: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    cloud_cover: Vec<Option<f64>>,
    precipitation_probability: Vec<Option<f64>>,
    weather_code: Vec<Option<f64>>,
    wind_direction_10m: Option<Vec<Option<f64>>>,
    wind_gusts_10m: Option<Vec<Option<f64>>>,
    precipitation: Option<Vec<Option<f64>>>,
    pressure_msl: Option<Vec<Option<f64>>>,
    is_day: Option<Vec<Option<u8>>>,
    uv_index: Option<Vec<Option<f64>>>,
}

/// Zip the columns into chronologically ordered points.
pub(crate) fn normalize(response: ForecastResponse) -> Result<Vec<ForecastPoint>> {
    let offset = FixedOffset::east_opt(response.utc_offset_seconds).ok_or_else(|| {
        SourceError::MalformedResponse(format!(
            "utc_offset_seconds out of range: {}",
            response.utc_offset_seconds
        ))
    })?;
    let hourly = response.hourly;
    let len = hourly.time.len();

    check_len("temperature_2m", hourly.temperature_2m.len(), len)?;
    check_len("relative_humidity_2m", hourly.relative_humidity_2m.len(), len)?;
    check_len("wind_speed_10m", hourly.wind_speed_10m.len(), len)?;
    check_len("cloud_cover", hourly.cloud_cover.len(), len)?;
    check_len("precipitation_probability", hourly.precipitation_probability.len(), len)?;
    check_len("weather_code", hourly.weather_code.len(), len)?;
    for (name, column) in [
        ("wind_direction_10m", &hourly.wind_direction_10m),
        ("wind_gusts_10m", &hourly.wind_gusts_10m),
        ("precipitation", &hourly.precipitation),
        ("pressure_msl", &hourly.pressure_msl),
        ("uv_index", &hourly.uv_index),
    ] {
        if let Some(column) = column {
            check_len(name, column.len(), len)?;
        }
    }
    if let Some(is_day) = &hourly.is_day {
        check_len("is_day", is_day.len(), len)?;
    }

    let optional = |column: &Option<Vec<Option<f64>>>, i: usize| {
        column.as_ref().and_then(|c| finite(c[i]))
    };

    let mut points = Vec::with_capacity(len);
    for (i, raw_time) in hourly.time.iter().enumerate() {
        let naive = NaiveDateTime::parse_from_str(raw_time, TIME_FORMAT).map_err(|e| {
            SourceError::MalformedResponse(format!("time[{}]: invalid '{}': {}", i, raw_time, e))
        })?;
        let timestamp = offset.from_local_datetime(&naive).single().ok_or_else(|| {
            SourceError::MalformedResponse(format!("time[{}]: ambiguous '{}'", i, raw_time))
        })?;

        let code = required(&format!("weather_code[{}]", i), hourly.weather_code[i])?;
        if !(0.0..=f64::from(u16::MAX)).contains(&code) {
            return Err(SourceError::MalformedResponse(format!(
                "weather_code[{}] out of range: {}",
                i, code
            )));
        }

        points.push(ForecastPoint {
            timestamp,
            temperature: required(&format!("temperature_2m[{}]", i), hourly.temperature_2m[i])?,
            humidity: required(
                &format!("relative_humidity_2m[{}]", i),
                hourly.relative_humidity_2m[i],
            )?,
            wind_speed: required(&format!("wind_speed_10m[{}]", i), hourly.wind_speed_10m[i])?,
            cloud_cover: required(&format!("cloud_cover[{}]", i), hourly.cloud_cover[i])?,
            precipitation_probability: required(
                &format!("precipitation_probability[{}]", i),
                hourly.precipitation_probability[i],
            )?,
            symbol_code: code as u16,
            wind_direction: optional(&hourly.wind_direction_10m, i),
            wind_gust: optional(&hourly.wind_gusts_10m, i),
            precipitation: optional(&hourly.precipitation, i),
            pressure: optional(&hourly.pressure_msl, i),
            uv_index: optional(&hourly.uv_index, i),
            is_day: hourly
                .is_day
                .as_ref()
                .and_then(|c| c[i])
                .map(|flag| flag != 0),
        });
    }

    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

fn check_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(SourceError::MalformedResponse(format!(
            "{} has {} values, expected {}",
            name, actual, expected
        )));
    }
    Ok(())
}
