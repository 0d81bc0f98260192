//! Sensor table exposed to the presentation layer.

use crate::snapshot::Snapshot;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

/// A sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
    Time(DateTime<FixedOffset>),
}

impl std::fmt::Display for SensorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorValue::Number(n) => write!(f, "{:.1}", n),
            SensorValue::Text(s) => f.write_str(s),
            SensorValue::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M %:z")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Place,
    Condition,
    Temperature,
    Humidity,
    WindSpeed,
    WindDirection,
    WindGust,
    CloudCover,
    RainProbability,
    Precipitation,
    Pressure,
    UvIndex,
    BestTime,
    BestTimeScore,
    LightningDistance,
    LightningStrikes,
    SeaLevel,
    ObservedTemperature,
    ObservedHumidity,
    ObservedWindSpeed,
    ObservedPressure,
}

impl SensorKind {
    pub const ALL: [SensorKind; 21] = [
        SensorKind::Place,
        SensorKind::Condition,
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::WindSpeed,
        SensorKind::WindDirection,
        SensorKind::WindGust,
        SensorKind::CloudCover,
        SensorKind::RainProbability,
        SensorKind::Precipitation,
        SensorKind::Pressure,
        SensorKind::UvIndex,
        SensorKind::BestTime,
        SensorKind::BestTimeScore,
        SensorKind::LightningDistance,
        SensorKind::LightningStrikes,
        SensorKind::SeaLevel,
        SensorKind::ObservedTemperature,
        SensorKind::ObservedHumidity,
        SensorKind::ObservedWindSpeed,
        SensorKind::ObservedPressure,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SensorKind::Place => "place",
            SensorKind::Condition => "condition",
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::WindSpeed => "wind_speed",
            SensorKind::WindDirection => "wind_direction",
            SensorKind::WindGust => "wind_gust",
            SensorKind::CloudCover => "cloud_cover",
            SensorKind::RainProbability => "rain_probability",
            SensorKind::Precipitation => "precipitation",
            SensorKind::Pressure => "pressure",
            SensorKind::UvIndex => "uv_index",
            SensorKind::BestTime => "best_time",
            SensorKind::BestTimeScore => "best_time_score",
            SensorKind::LightningDistance => "lightning_distance",
            SensorKind::LightningStrikes => "lightning_strikes",
            SensorKind::SeaLevel => "sea_level",
            SensorKind::ObservedTemperature => "observed_temperature",
            SensorKind::ObservedHumidity => "observed_humidity",
            SensorKind::ObservedWindSpeed => "observed_wind_speed",
            SensorKind::ObservedPressure => "observed_pressure",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Place => "Place",
            SensorKind::Condition => "Condition",
            SensorKind::Temperature => "Temperature",
            SensorKind::Humidity => "Humidity",
            SensorKind::WindSpeed => "Wind speed",
            SensorKind::WindDirection => "Wind direction",
            SensorKind::WindGust => "Wind gust",
            SensorKind::CloudCover => "Cloud cover",
            SensorKind::RainProbability => "Rain probability",
            SensorKind::Precipitation => "Precipitation",
            SensorKind::Pressure => "Pressure",
            SensorKind::UvIndex => "UV index",
            SensorKind::BestTime => "Best time of day",
            SensorKind::BestTimeScore => "Best time score",
            SensorKind::LightningDistance => "Closest lightning",
            SensorKind::LightningStrikes => "Lightning strikes",
            SensorKind::SeaLevel => "Sea level",
            SensorKind::ObservedTemperature => "Observed temperature",
            SensorKind::ObservedHumidity => "Observed humidity",
            SensorKind::ObservedWindSpeed => "Observed wind speed",
            SensorKind::ObservedPressure => "Observed pressure",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            SensorKind::Temperature | SensorKind::ObservedTemperature => Some("°C"),
            SensorKind::Humidity
            | SensorKind::ObservedHumidity
            | SensorKind::CloudCover
            | SensorKind::RainProbability => Some("%"),
            SensorKind::WindSpeed | SensorKind::WindGust | SensorKind::ObservedWindSpeed => {
                Some("m/s")
            }
            SensorKind::WindDirection => Some("°"),
            SensorKind::Precipitation => Some("mm"),
            SensorKind::Pressure | SensorKind::ObservedPressure => Some("hPa"),
            SensorKind::LightningDistance => Some("km"),
            SensorKind::SeaLevel => Some("cm"),
            SensorKind::Place
            | SensorKind::Condition
            | SensorKind::UvIndex
            | SensorKind::BestTime
            | SensorKind::BestTimeScore
            | SensorKind::LightningStrikes => None,
        }
    }

    /// Current value, or `None` when the data behind it is unavailable.
    pub fn read(self, snapshot: &Snapshot, place: &str, now: DateTime<Utc>) -> Option<SensorValue> {
        let current = || snapshot.current_point(now);
        let number = SensorValue::Number;
        match self {
            SensorKind::Place => Some(SensorValue::Text(place.to_string())),
            SensorKind::Condition => current().map(|p| SensorValue::Text(p.condition().to_string())),
            SensorKind::Temperature => current().map(|p| number(p.temperature)),
            SensorKind::Humidity => current().map(|p| number(p.humidity)),
            SensorKind::WindSpeed => current().map(|p| number(p.wind_speed)),
            SensorKind::WindDirection => current()?.wind_direction.map(number),
            SensorKind::WindGust => current()?.wind_gust.map(number),
            SensorKind::CloudCover => current().map(|p| number(p.cloud_cover)),
            SensorKind::RainProbability => current().map(|p| number(p.precipitation_probability)),
            SensorKind::Precipitation => current()?.precipitation.map(number),
            SensorKind::Pressure => current()?.pressure.map(number),
            SensorKind::UvIndex => current()?.uv_index.map(number),
            SensorKind::BestTime => snapshot
                .best_time()
                .map(|best| SensorValue::Time(best.point.timestamp)),
            SensorKind::BestTimeScore => snapshot.best_time().map(|best| number(best.score)),
            SensorKind::LightningDistance => snapshot
                .lightning()?
                .first()
                .map(|strike| number(strike.distance_km)),
            SensorKind::LightningStrikes => snapshot
                .lightning()
                .map(|strikes| number(strikes.len() as f64)),
            SensorKind::SeaLevel => {
                let series = snapshot.sea_level()?;
                series
                    .iter()
                    .rev()
                    .find(|p| p.timestamp <= now)
                    .or_else(|| series.first())
                    .map(|p| number(p.predicted_level_cm))
            }
            SensorKind::ObservedTemperature => snapshot.observation().map(|r| number(r.temperature)),
            SensorKind::ObservedHumidity => snapshot.observation().map(|r| number(r.humidity)),
            SensorKind::ObservedWindSpeed => snapshot.observation().map(|r| number(r.wind_speed)),
            SensorKind::ObservedPressure => snapshot.observation()?.pressure.map(number),
        }
    }
}

/// Every sensor with a value, in table order.
pub fn read_all(snapshot: &Snapshot, place: &str, now: DateTime<Utc>) -> Vec<(SensorKind, SensorValue)> {
    SensorKind::ALL
        .iter()
        .filter_map(|kind| kind.read(snapshot, place, now).map(|value| (*kind, value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::best_time::{self, PreferenceProfile};
    use crate::model::fixtures::point;
    use crate::model::LightningStrike;
    use crate::snapshot::fixtures::{forecast_snapshot, observation_snapshot};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        "2024-06-15T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn keys_are_unique() {
        let keys: HashSet<_> = SensorKind::ALL.iter().map(|k| k.key()).collect();
        assert_eq!(keys.len(), SensorKind::ALL.len());
    }

    #[test]
    fn empty_snapshot_only_has_place() {
        let values = read_all(&Snapshot::default(), "Home", now());
        assert_eq!(values, vec![(SensorKind::Place, SensorValue::Text("Home".into()))]);
    }

    #[test]
    fn reads_forecast_and_observation() {
        let mut forecast = forecast_snapshot();
        forecast.forecast = vec![point(8, 15.0, 2.0, 10.0), point(12, 22.0, 1.0, 0.0)];
        forecast.best_time = best_time::select(&forecast.forecast, &PreferenceProfile::default());
        forecast.lightning = Some(vec![LightningStrike {
            timestamp: now(),
            latitude: 60.0,
            longitude: 25.0,
            distance_km: 7.5,
            peak_current: 4.0,
            multiplicity: 1,
        }]);
        let view = Snapshot {
            forecast_part: Some(Arc::new(forecast)),
            observation_part: Some(Arc::new(observation_snapshot())),
        };

        let read = |kind: SensorKind| kind.read(&view, "Home", now());
        assert_eq!(read(SensorKind::Temperature), Some(SensorValue::Number(22.0)));
        assert_eq!(read(SensorKind::Condition), Some(SensorValue::Text("partlycloudy".into())));
        assert_eq!(read(SensorKind::BestTimeScore), Some(SensorValue::Number(0.0)));
        assert_eq!(read(SensorKind::LightningDistance), Some(SensorValue::Number(7.5)));
        assert_eq!(read(SensorKind::LightningStrikes), Some(SensorValue::Number(1.0)));
        assert_eq!(read(SensorKind::SeaLevel), None);
        assert_eq!(read(SensorKind::ObservedPressure), Some(SensorValue::Number(1012.0)));
        assert_eq!(read(SensorKind::WindGust), None);
        assert!(matches!(read(SensorKind::BestTime), Some(SensorValue::Time(_))));
    }

    #[test]
    fn display_formats_values() {
        assert_eq!(SensorValue::Number(21.04).to_string(), "21.0");
        assert_eq!(SensorValue::Text("sunny".into()).to_string(), "sunny");
    }
}
