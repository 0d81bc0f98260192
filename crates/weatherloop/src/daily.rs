//! Daily summaries built from the hourly forecast.

use crate::model::{Condition, ForecastPoint};
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// First and last hour counted as daytime when no tier wins.
const DAYTIME_START_HOUR: u32 = 7;
const DAYTIME_END_HOUR: u32 = 20;

/// Severity tier floors and the hours a condition needs to win its tier.
const SEVERE_SEVERITY: u8 = 90;
const PRECIPITATION_SEVERITY: u8 = 55;
const VISIBILITY_SEVERITY: u8 = 37;
const SEVERE_MIN_HOURS: usize = 1;
const PRECIPITATION_MIN_HOURS: usize = 3;
const VISIBILITY_MIN_HOURS: usize = 4;

/// Aggregate of one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub condition: Condition,
    pub temperature_high: f64,
    pub temperature_low: f64,
    /// Summed precipitation in mm, `None` when no step reported it.
    pub precipitation: Option<f64>,
    pub precipitation_probability_max: f64,
    pub wind_speed_max: f64,
    pub wind_gust_max: Option<f64>,
    pub humidity_mean: f64,
    pub cloud_cover_mean: f64,
    pub pressure_mean: Option<f64>,
    pub uv_index_max: Option<f64>,
    /// Number of hourly steps that went into the aggregate.
    pub hours: usize,
}

/// Group hourly points by local date and summarise each day.
///
/// Days come out in chronological order. Optional fields missing from a
/// step are skipped rather than counted as zero.
pub fn aggregate(points: &[ForecastPoint]) -> Vec<DailyForecast> {
    let mut days: BTreeMap<NaiveDate, Vec<&ForecastPoint>> = BTreeMap::new();
    for point in points {
        days.entry(point.timestamp.date_naive())
            .or_default()
            .push(point);
    }

    days.into_iter()
        .map(|(date, steps)| summarise(date, &steps))
        .collect()
}

fn summarise(date: NaiveDate, steps: &[&ForecastPoint]) -> DailyForecast {
    let hours = steps.len();
    let count = hours as f64;

    let conditions: Vec<(DateTime<FixedOffset>, Condition)> =
        steps.iter().map(|p| (p.timestamp, p.condition())).collect();

    DailyForecast {
        date,
        condition: select_daily_condition(&conditions),
        temperature_high: steps
            .iter()
            .map(|p| p.temperature)
            .fold(f64::NEG_INFINITY, f64::max),
        temperature_low: steps
            .iter()
            .map(|p| p.temperature)
            .fold(f64::INFINITY, f64::min),
        precipitation: sum_present(steps.iter().map(|p| p.precipitation)),
        precipitation_probability_max: steps
            .iter()
            .map(|p| p.precipitation_probability)
            .fold(0.0, f64::max),
        wind_speed_max: steps.iter().map(|p| p.wind_speed).fold(0.0, f64::max),
        wind_gust_max: max_present(steps.iter().map(|p| p.wind_gust)),
        humidity_mean: steps.iter().map(|p| p.humidity).sum::<f64>() / count,
        cloud_cover_mean: steps.iter().map(|p| p.cloud_cover).sum::<f64>() / count,
        pressure_mean: mean_present(steps.iter().map(|p| p.pressure)),
        uv_index_max: max_present(steps.iter().map(|p| p.uv_index)),
        hours,
    }
}

fn present(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    values.flatten().filter(|v| v.is_finite()).collect()
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let values = present(values);
    (!values.is_empty()).then(|| values.iter().sum::<f64>())
}

fn mean_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let values = present(values);
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn max_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    present(values).into_iter().reduce(f64::max)
}

/// Pick one condition to represent a day of hourly conditions.
///
/// Severe weather wins with a single hour, precipitation needs three hours
/// and fog four. Otherwise the most common daytime condition is used.
/// Clear night is always reported as sunny.
pub fn select_daily_condition(hourly: &[(DateTime<FixedOffset>, Condition)]) -> Condition {
    if hourly.is_empty() {
        return Condition::Sunny;
    }

    let normalized: Vec<(u32, Condition)> = hourly
        .iter()
        .map(|(time, condition)| {
            let condition = match condition {
                Condition::ClearNight => Condition::Sunny,
                other => *other,
            };
            (time.hour(), condition)
        })
        .collect();

    let mut severe: BTreeMap<Condition, Vec<u32>> = BTreeMap::new();
    let mut precipitation: BTreeMap<Condition, Vec<u32>> = BTreeMap::new();
    let mut visibility: BTreeMap<Condition, Vec<u32>> = BTreeMap::new();
    for (hour, condition) in &normalized {
        let severity = condition.severity();
        let tier = if severity >= SEVERE_SEVERITY {
            &mut severe
        } else if severity >= PRECIPITATION_SEVERITY {
            &mut precipitation
        } else if severity >= VISIBILITY_SEVERITY {
            &mut visibility
        } else {
            continue;
        };
        tier.entry(*condition).or_default().push(*hour);
    }

    for (tier, min_hours) in [
        (&severe, SEVERE_MIN_HOURS),
        (&precipitation, PRECIPITATION_MIN_HOURS),
        (&visibility, VISIBILITY_MIN_HOURS),
    ] {
        if let Some(condition) = select_from_tier(tier, min_hours) {
            return condition;
        }
    }

    let daytime: Vec<(u32, Condition)> = normalized
        .iter()
        .copied()
        .filter(|(hour, _)| (DAYTIME_START_HOUR..=DAYTIME_END_HOUR).contains(hour))
        .collect();
    if let Some(condition) = most_common(&daytime) {
        return condition;
    }

    most_common(&normalized).unwrap_or(Condition::Sunny)
}

/// Highest-severity condition of a tier that meets `min_hours`, ties broken
/// towards midday.
fn select_from_tier(tier: &BTreeMap<Condition, Vec<u32>>, min_hours: usize) -> Option<Condition> {
    let qualifying: Vec<(&Condition, &Vec<u32>)> = tier
        .iter()
        .filter(|(_, hours)| hours.len() >= min_hours)
        .collect();
    let max_severity = qualifying.iter().map(|(c, _)| c.severity()).max()?;

    qualifying
        .into_iter()
        .filter(|(c, _)| c.severity() == max_severity)
        .min_by(|(_, a), (_, b)| noon_distance(a).total_cmp(&noon_distance(b)))
        .map(|(c, _)| *c)
}

/// Most frequent condition, ties broken towards midday.
fn most_common(hourly: &[(u32, Condition)]) -> Option<Condition> {
    let mut by_condition: HashMap<Condition, Vec<u32>> = HashMap::new();
    for (hour, condition) in hourly {
        by_condition.entry(*condition).or_default().push(*hour);
    }
    let top = by_condition.values().map(Vec::len).max()?;

    let mut candidates: Vec<(Condition, Vec<u32>)> = by_condition
        .into_iter()
        .filter(|(_, hours)| hours.len() == top)
        .collect();
    // Deterministic order before the midday tie-break
    candidates.sort_by_key(|(c, _)| *c);
    candidates
        .into_iter()
        .min_by(|(_, a), (_, b)| noon_distance(a).total_cmp(&noon_distance(b)))
        .map(|(c, _)| c)
}

/// Mean distance of the hours from 12:00.
fn noon_distance(hours: &[u32]) -> f64 {
    if hours.is_empty() {
        return f64::INFINITY;
    }
    hours.iter().map(|h| (*h as f64 - 12.0).abs()).sum::<f64>() / hours.len() as f64
}
