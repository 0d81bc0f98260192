//! Best time of day selection.
//!
//! Every forecast step inside the preferred time window is scored by how far
//! it falls outside the user's comfort envelope. Penalties are linear in the
//! distance outside each limit; the lowest total wins and ties go to the
//! earliest step. Selection is a pure function of its inputs.

use crate::model::ForecastPoint;
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Local time-of-day range, inclusive on both ends.
///
/// A window whose `start` is after its `end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

const DEFAULT_WINDOW_START: NaiveTime = time_of_day(8, 0, 0);
const DEFAULT_WINDOW_END: NaiveTime = time_of_day(20, 0, 0);
const LAST_SECOND: NaiveTime = time_of_day(23, 59, 59);

/// Evaluated in const context, so an invalid time fails the build.
const fn time_of_day(hour: u32, min: u32, sec: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, min, sec) {
        Some(time) => time,
        None => panic!("invalid time of day"),
    }
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whole day.
    pub fn all_day() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: LAST_SECOND,
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time <= self.end
        } else {
            time >= self.start || time <= self.end
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            start: DEFAULT_WINDOW_START,
            end: DEFAULT_WINDOW_END,
        }
    }
}

/// Multipliers applied to each penalty before summing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    /// Per °C outside the temperature range.
    pub temperature: f64,
    /// Per m/s above `max_wind`.
    pub wind: f64,
    /// Per percentage point above `max_rain_probability`.
    pub rain: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            wind: 1.0,
            rain: 1.0,
        }
    }
}

/// User-declared comfort envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    /// Lower comfortable temperature in °C.
    #[serde(default = "default_temp_min")]
    pub temp_min: f64,
    /// Upper comfortable temperature in °C.
    #[serde(default = "default_temp_max")]
    pub temp_max: f64,
    /// Highest acceptable mean wind in m/s.
    #[serde(default = "default_max_wind")]
    pub max_wind: f64,
    /// Highest acceptable precipitation probability in %.
    #[serde(default = "default_max_rain_probability")]
    pub max_rain_probability: f64,
    #[serde(default, rename = "window")]
    pub preferred_time_window: TimeWindow,
    #[serde(default)]
    pub weights: PenaltyWeights,
}

fn default_temp_min() -> f64 {
    18.0
}

fn default_temp_max() -> f64 {
    24.0
}

fn default_max_wind() -> f64 {
    5.0
}

fn default_max_rain_probability() -> f64 {
    20.0
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            temp_min: default_temp_min(),
            temp_max: default_temp_max(),
            max_wind: default_max_wind(),
            max_rain_probability: default_max_rain_probability(),
            preferred_time_window: TimeWindow::default(),
            weights: PenaltyWeights::default(),
        }
    }
}

/// Weighted penalty per dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Penalties {
    pub temperature: f64,
    pub wind: f64,
    pub rain: f64,
}

impl Penalties {
    pub fn total(&self) -> f64 {
        self.temperature + self.wind + self.rain
    }
}

/// The chosen forecast step with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestTimeResult {
    pub point: ForecastPoint,
    /// Sum of weighted penalties, lower is better. Zero means every
    /// preference is met.
    pub score: f64,
    pub penalties: Penalties,
    pub reason: String,
}

/// Compute the weighted penalties of a single step.
pub fn penalties(point: &ForecastPoint, profile: &PreferenceProfile) -> Penalties {
    let temperature_distance = if point.temperature < profile.temp_min {
        profile.temp_min - point.temperature
    } else if point.temperature > profile.temp_max {
        point.temperature - profile.temp_max
    } else {
        0.0
    };
    let wind_excess = (point.wind_speed - profile.max_wind).max(0.0);
    let rain_excess = (point.precipitation_probability - profile.max_rain_probability).max(0.0);

    Penalties {
        temperature: temperature_distance * profile.weights.temperature,
        wind: wind_excess * profile.weights.wind,
        rain: rain_excess * profile.weights.rain,
    }
}

/// Pick the most comfortable step inside the preferred window.
///
/// Returns `None` when `points` is empty or no step falls inside the
/// window. An unreachable envelope still yields the least-bad step.
pub fn select(points: &[ForecastPoint], profile: &PreferenceProfile) -> Option<BestTimeResult> {
    let mut best: Option<(&ForecastPoint, Penalties, f64)> = None;

    for point in points
        .iter()
        .filter(|p| profile.preferred_time_window.contains(p.timestamp.time()))
    {
        let penalties = penalties(point, profile);
        let score = penalties.total();
        let better = match &best {
            None => true,
            Some((current, _, current_score)) => {
                score < *current_score
                    || (score == *current_score && point.timestamp < current.timestamp)
            }
        };
        if better {
            best = Some((point, penalties, score));
        }
    }

    best.map(|(point, penalties, score)| BestTimeResult {
        reason: explain(point, profile, &penalties),
        point: point.clone(),
        score,
        penalties,
    })
}

fn explain(point: &ForecastPoint, profile: &PreferenceProfile, penalties: &Penalties) -> String {
    let mut parts = Vec::new();
    if penalties.temperature > 0.0 {
        if point.temperature < profile.temp_min {
            parts.push(format!(
                "temperature {:.1}°C below {:.1}°C",
                point.temperature, profile.temp_min
            ));
        } else {
            parts.push(format!(
                "temperature {:.1}°C above {:.1}°C",
                point.temperature, profile.temp_max
            ));
        }
    }
    if penalties.wind > 0.0 {
        parts.push(format!(
            "wind {:.1} m/s above {:.1} m/s",
            point.wind_speed, profile.max_wind
        ));
    }
    if penalties.rain > 0.0 {
        parts.push(format!(
            "rain probability {:.0}% above {:.0}%",
            point.precipitation_probability, profile.max_rain_probability
        ));
    }

    let when = point.timestamp.format("%Y-%m-%d %H:%M");
    if parts.is_empty() {
        format!(
            "{}: {:.1}°C, wind {:.1} m/s, rain {:.0}% - all preferences met",
            when, point.temperature, point.wind_speed, point.precipitation_probability
        )
    } else {
        format!("{}: closest match, {}", when, parts.join(", "))
    }
}

/// `HH:MM` (or `HH:MM:SS`) serde format for `NaiveTime`.
mod hhmm {
    use super::*;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::point;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn scenario_points() -> Vec<ForecastPoint> {
        vec![
            point(8, 15.0, 2.0, 10.0),
            point(12, 22.0, 1.0, 0.0),
            point(16, 28.0, 5.0, 40.0),
        ]
    }

    fn scenario_profile() -> PreferenceProfile {
        PreferenceProfile {
            temp_min: 18.0,
            temp_max: 24.0,
            max_wind: 3.0,
            max_rain_probability: 20.0,
            preferred_time_window: TimeWindow::all_day(),
            weights: PenaltyWeights::default(),
        }
    }

    #[test]
    fn picks_point_inside_envelope() {
        let result = select(&scenario_points(), &scenario_profile()).unwrap();
        assert_eq!(result.point.timestamp.time(), hm(12, 0));
        assert_eq!(result.score, 0.0);
        assert!(result.reason.contains("all preferences met"));
    }

    #[test]
    fn unreachable_range_still_returns_least_bad_point() {
        let mut profile = scenario_profile();
        profile.temp_min = 30.0;
        profile.temp_max = 35.0;

        let result = select(&scenario_points(), &profile).unwrap();
        // 08:00 -> 15, 12:00 -> 8, 16:00 -> 2 + 2 + 20
        assert_eq!(result.point.timestamp.time(), hm(12, 0));
        assert!((result.score - 8.0).abs() < 1e-9);
        assert!(result.penalties.temperature > 0.0);
        assert!(result.reason.contains("below"));
    }

    #[test]
    fn inverted_range_does_not_panic() {
        let mut profile = scenario_profile();
        profile.temp_min = 30.0;
        let result = select(&scenario_points(), &profile);
        assert!(result.is_some());
    }

    #[test]
    fn empty_forecast_is_absent() {
        assert!(select(&[], &scenario_profile()).is_none());
    }

    #[test]
    fn no_point_in_window_is_absent() {
        let mut profile = scenario_profile();
        profile.preferred_time_window = TimeWindow::new(hm(20, 0), hm(22, 0));
        assert!(select(&scenario_points(), &profile).is_none());
    }

    #[test]
    fn window_restricts_candidates() {
        let mut profile = scenario_profile();
        profile.preferred_time_window = TimeWindow::new(hm(14, 0), hm(18, 0));
        let result = select(&scenario_points(), &profile).unwrap();
        assert_eq!(result.point.timestamp.time(), hm(16, 0));
        assert!((result.score - 26.0).abs() < 1e-9);
    }

    #[test]
    fn ties_go_to_earliest_timestamp() {
        let points = vec![
            point(9, 20.0, 1.0, 0.0),
            point(10, 21.0, 2.0, 5.0),
            point(11, 19.0, 0.0, 0.0),
        ];
        let result = select(&points, &scenario_profile()).unwrap();
        assert_eq!(result.point.timestamp.time(), hm(9, 0));

        // Order of the input must not matter
        let reversed: Vec<_> = points.into_iter().rev().collect();
        let result = select(&reversed, &scenario_profile()).unwrap();
        assert_eq!(result.point.timestamp.time(), hm(9, 0));
    }

    #[test]
    fn returns_minimum_penalty_point() {
        let points = vec![
            point(8, 10.0, 0.0, 0.0),  // 8
            point(9, 17.0, 4.0, 0.0),  // 1 + 1
            point(10, 25.0, 3.0, 21.0), // 1 + 0 + 1
            point(11, 26.0, 6.0, 50.0), // 2 + 3 + 30
        ];
        let result = select(&points, &scenario_profile()).unwrap();
        assert_eq!(result.point.timestamp.time(), hm(9, 0));
        assert!((result.score - 2.0).abs() < 1e-9);
    }

    #[test]
    fn weights_scale_penalties() {
        let mut profile = scenario_profile();
        profile.weights = PenaltyWeights {
            temperature: 0.5,
            wind: 2.0,
            rain: 0.1,
        };
        let p = penalties(&point(16, 28.0, 5.0, 40.0), &profile);
        assert!((p.temperature - 2.0).abs() < 1e-9);
        assert!((p.wind - 4.0).abs() < 1e-9);
        assert!((p.rain - 2.0).abs() < 1e-9);
        assert!((p.total() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn default_and_all_day_windows() {
        let default = TimeWindow::default();
        assert!(default.contains(hm(8, 0)));
        assert!(default.contains(hm(20, 0)));
        assert!(!default.contains(hm(7, 59)));
        assert!(!default.contains(hm(20, 1)));

        let all_day = TimeWindow::all_day();
        assert!(all_day.contains(NaiveTime::MIN));
        assert!(all_day.contains(hm(23, 59)));
    }

    #[test]
    fn window_wraps_past_midnight() {
        let window = TimeWindow::new(hm(22, 0), hm(2, 0));
        assert!(window.contains(hm(23, 30)));
        assert!(window.contains(hm(1, 0)));
        assert!(!window.contains(hm(12, 0)));
    }

    #[test]
    fn profile_from_yaml() {
        let yaml = r#"
temp_min: 16
temp_max: 22.5
max_wind: 4
max_rain_probability: 30
window:
  start: "07:30"
  end: "21:00"
weights:
  rain: 0.5
"#;
        let profile: PreferenceProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.temp_max, 22.5);
        assert_eq!(profile.preferred_time_window.start, hm(7, 30));
        assert_eq!(profile.weights.rain, 0.5);
        assert_eq!(profile.weights.temperature, 1.0);
    }

    #[test]
    fn profile_rejects_bad_window() {
        let yaml = "window:\n  start: \"25:00\"\n  end: \"08:00\"\n";
        let result: Result<PreferenceProfile, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
