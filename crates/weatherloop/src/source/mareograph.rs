//! Sea level forecast from a mareograph station.

use super::{get_json, join_url, parse_utc, required, Result, SourceClient, SourceError, SourceKind};
use crate::model::SeaLevelPoint;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct MareographFeed {
    client: reqwest::Client,
    base_url: String,
    station_id: String,
    horizon_hours: u32,
}

impl MareographFeed {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        station_id: impl Into<String>,
        horizon_hours: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            station_id: station_id.into(),
            horizon_hours,
        }
    }
}

#[async_trait]
impl SourceClient for MareographFeed {
    type Output = Vec<SeaLevelPoint>;

    fn kind(&self) -> SourceKind {
        SourceKind::Mareograph
    }

    async fn fetch(&self) -> Result<Vec<SeaLevelPoint>> {
        let url = join_url(
            &self.base_url,
            &format!("stations/{}/forecast", self.station_id),
        );
        let request = self
            .client
            .get(url)
            .query(&[("hours", self.horizon_hours.to_string())]);
        let response: SeaLevelResponse = get_json(request).await?;
        normalize(&self.station_id, response)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SeaLevelResponse {
    station_id: String,
    series: Vec<WireLevel>,
}

#[derive(Debug, Deserialize)]
struct WireLevel {
    time: String,
    level_cm: Option<f64>,
}

pub(crate) fn normalize(expected_station: &str, response: SeaLevelResponse) -> Result<Vec<SeaLevelPoint>> {
    if response.station_id != expected_station {
        return Err(SourceError::MalformedResponse(format!(
            "series is for station '{}', requested '{}'",
            response.station_id, expected_station
        )));
    }

    let mut points = response
        .series
        .into_iter()
        .enumerate()
        .map(|(i, level)| {
            Ok(SeaLevelPoint {
                timestamp: parse_utc(&format!("series[{}].time", i), &level.time)?,
                predicted_level_cm: required(&format!("series[{}].level_cm", i), level.level_cm)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}
