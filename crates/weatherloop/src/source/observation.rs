//! Latest reading of a fixed observation station.

use super::{finite, get_json, join_url, parse_utc, required, Result, SourceClient, SourceError, SourceKind};
use crate::model::ObservationReading;
use async_trait::async_trait;
use serde::Deserialize;

/// Station observation client bound to one station.
#[derive(Debug, Clone)]
pub struct StationObservation {
    client: reqwest::Client,
    base_url: String,
    station_id: String,
}

impl StationObservation {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, station_id: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            station_id: station_id.into(),
        }
    }
}

#[async_trait]
impl SourceClient for StationObservation {
    type Output = ObservationReading;

    fn kind(&self) -> SourceKind {
        SourceKind::Observation
    }

    async fn fetch(&self) -> Result<ObservationReading> {
        let url = join_url(
            &self.base_url,
            &format!("stations/{}/latest", self.station_id),
        );
        let response: ObservationResponse = get_json(self.client.get(url)).await?;
        normalize(&self.station_id, response)
    }
}

/// Wire format of a station reading.
#[derive(Debug, Deserialize)]
pub(crate) struct ObservationResponse {
    station_id: String,
    name: Option<String>,
    time: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    wind_direction: Option<f64>,
    wind_gust: Option<f64>,
    pressure: Option<f64>,
    dew_point: Option<f64>,
    precipitation: Option<f64>,
    cloud_cover: Option<f64>,
}

pub(crate) fn normalize(expected_station: &str, response: ObservationResponse) -> Result<ObservationReading> {
    if response.station_id != expected_station {
        return Err(SourceError::MalformedResponse(format!(
            "reading is for station '{}', requested '{}'",
            response.station_id, expected_station
        )));
    }

    Ok(ObservationReading {
        timestamp: parse_utc("time", &response.time)?,
        temperature: required("temperature", response.temperature)?,
        humidity: required("humidity", response.humidity)?,
        wind_speed: required("wind_speed", response.wind_speed)?,
        wind_direction: finite(response.wind_direction),
        wind_gust: finite(response.wind_gust),
        pressure: finite(response.pressure),
        dew_point: finite(response.dew_point),
        precipitation: finite(response.precipitation),
        cloud_cover: finite(response.cloud_cover),
        station_name: response.name,
        station_id: response.station_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ObservationReading> {
        let response: ObservationResponse = serde_json::from_str(json).unwrap();
        normalize("100971", response)
    }

    #[test]
    fn normalizes_reading() {
        let reading = parse(
            r#"{"station_id": "100971", "name": "Helsinki Kaisaniemi",
                "time": "2024-06-15T09:50:00Z", "temperature": 18.2, "humidity": 71,
                "wind_speed": 3.4, "wind_direction": 220, "pressure": 1012.3}"#,
        )
        .unwrap();
        assert_eq!(reading.station_id, "100971");
        assert_eq!(reading.station_name.as_deref(), Some("Helsinki Kaisaniemi"));
        assert_eq!(reading.temperature, 18.2);
        assert_eq!(reading.wind_direction, Some(220.0));
        assert_eq!(reading.wind_gust, None);
    }

    #[test]
    fn missing_temperature_is_malformed() {
        let err = parse(
            r#"{"station_id": "100971", "time": "2024-06-15T09:50:00Z",
                "humidity": 71, "wind_speed": 3.4}"#,
        )
        .unwrap_err();
        assert_eq!(err, SourceError::MalformedResponse("missing temperature".to_string()));
    }

    #[test]
    fn wrong_station_is_malformed() {
        let err = parse(
            r#"{"station_id": "999", "time": "2024-06-15T09:50:00Z",
                "temperature": 1, "humidity": 2, "wind_speed": 3}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::MalformedResponse(_)));
    }
}
