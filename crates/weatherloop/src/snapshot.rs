//! Published snapshots.
//!
//! Each coordinator publishes its own immutable part. [`Snapshot`] bundles
//! the latest `Arc` of each part so readers get a consistent view of every
//! field without copying.

use crate::best_time::BestTimeResult;
use crate::daily::DailyForecast;
use crate::model::{ForecastPoint, LightningStrike, ObservationReading, SeaLevelPoint};
use crate::source::{SourceError, SourceKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Last failure of an optional source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub error: SourceError,
    /// Cycles in a row that this source has failed.
    pub consecutive_failures: u32,
    /// When the current run of failures started.
    pub since: DateTime<Utc>,
}

/// Output of one forecast cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSnapshot {
    pub forecast: Vec<ForecastPoint>,
    pub best_time: Option<BestTimeResult>,
    pub daily: Vec<DailyForecast>,
    pub lightning: Option<Vec<LightningStrike>>,
    pub sea_level: Option<Vec<SeaLevelPoint>>,
    pub fetched_at: DateTime<Utc>,
    pub source_errors: BTreeMap<SourceKind, SourceFailure>,
}

impl ForecastSnapshot {
    /// The forecast point closest to `now`, not after it when possible.
    pub fn current_point(&self, now: DateTime<Utc>) -> Option<&ForecastPoint> {
        self.forecast
            .iter()
            .rev()
            .find(|p| p.timestamp <= now)
            .or_else(|| self.forecast.first())
    }
}

/// Output of one observation cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationSnapshot {
    pub reading: ObservationReading,
    pub fetched_at: DateTime<Utc>,
}

/// Read-only view over the latest published parts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub forecast_part: Option<Arc<ForecastSnapshot>>,
    pub observation_part: Option<Arc<ObservationSnapshot>>,
}

impl Snapshot {
    pub fn forecast(&self) -> &[ForecastPoint] {
        self.forecast_part
            .as_deref()
            .map(|f| f.forecast.as_slice())
            .unwrap_or_default()
    }

    pub fn best_time(&self) -> Option<&BestTimeResult> {
        self.forecast_part.as_deref()?.best_time.as_ref()
    }

    pub fn daily(&self) -> &[DailyForecast] {
        self.forecast_part
            .as_deref()
            .map(|f| f.daily.as_slice())
            .unwrap_or_default()
    }

    pub fn lightning(&self) -> Option<&[LightningStrike]> {
        self.forecast_part.as_deref()?.lightning.as_deref()
    }

    pub fn sea_level(&self) -> Option<&[SeaLevelPoint]> {
        self.forecast_part.as_deref()?.sea_level.as_deref()
    }

    pub fn observation(&self) -> Option<&ObservationReading> {
        self.observation_part.as_deref().map(|o| &o.reading)
    }

    /// Most recent publish time across both parts.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        let forecast = self.forecast_part.as_deref().map(|f| f.fetched_at);
        let observation = self.observation_part.as_deref().map(|o| o.fetched_at);
        forecast.max(observation)
    }

    pub fn source_errors(&self) -> Option<&BTreeMap<SourceKind, SourceFailure>> {
        self.forecast_part.as_deref().map(|f| &f.source_errors)
    }

    /// Forecast point for the current hour.
    pub fn current_point(&self, now: DateTime<Utc>) -> Option<&ForecastPoint> {
        self.forecast_part.as_deref()?.current_point(now)
    }

    pub fn is_empty(&self) -> bool {
        self.forecast_part.is_none() && self.observation_part.is_none()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::fixtures::point;

    pub fn forecast_snapshot() -> ForecastSnapshot {
        ForecastSnapshot {
            forecast: vec![point(8, 15.0, 2.0, 10.0), point(12, 22.0, 1.0, 0.0)],
            best_time: None,
            daily: Vec::new(),
            lightning: None,
            sea_level: None,
            fetched_at: "2024-06-15T09:30:00Z".parse().unwrap(),
            source_errors: BTreeMap::new(),
        }
    }

    pub fn observation_snapshot() -> ObservationSnapshot {
        ObservationSnapshot {
            reading: ObservationReading {
                station_id: "100971".to_string(),
                station_name: None,
                timestamp: "2024-06-15T09:50:00Z".parse().unwrap(),
                temperature: 18.0,
                humidity: 70.0,
                wind_speed: 3.0,
                wind_direction: None,
                wind_gust: None,
                pressure: Some(1012.0),
                dew_point: None,
                precipitation: None,
                cloud_cover: None,
            },
            fetched_at: "2024-06-15T09:55:00Z".parse().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn empty_view_has_no_data() {
        let view = Snapshot::default();
        assert!(view.is_empty());
        assert!(view.forecast().is_empty());
        assert!(view.best_time().is_none());
        assert!(view.observation().is_none());
        assert!(view.fetched_at().is_none());
    }

    #[test]
    fn fetched_at_is_latest_part() {
        let view = Snapshot {
            forecast_part: Some(Arc::new(forecast_snapshot())),
            observation_part: Some(Arc::new(observation_snapshot())),
        };
        assert_eq!(
            view.fetched_at(),
            Some("2024-06-15T09:55:00Z".parse().unwrap())
        );
        assert_eq!(view.forecast().len(), 2);
        assert_eq!(view.observation().map(|r| r.temperature), Some(18.0));
    }

    #[test]
    fn current_point_picks_last_started_hour() {
        let snapshot = forecast_snapshot();
        // 08:00 and 12:00 at +03:00 are 05:00Z and 09:00Z
        let now: DateTime<Utc> = "2024-06-15T10:15:00Z".parse().unwrap();
        assert_eq!(snapshot.current_point(now).unwrap().temperature, 22.0);

        let before: DateTime<Utc> = "2024-06-15T01:00:00Z".parse().unwrap();
        assert_eq!(snapshot.current_point(before).unwrap().temperature, 15.0);
    }
}
