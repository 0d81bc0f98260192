//! Test helpers for coordinator and source integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use weatherloop::model::{ForecastPoint, LightningStrike, ObservationReading, SeaLevelPoint};
use weatherloop::source::{Result, SourceClient, SourceError, SourceKind};

/// In-process source replaying a script of `(delay, response)` steps.
///
/// The last step repeats once the script is exhausted.
pub struct Scripted<T> {
    kind: SourceKind,
    steps: Mutex<VecDeque<(Duration, Result<T>)>>,
    last: Mutex<Option<(Duration, Result<T>)>>,
    calls: AtomicUsize,
}

impl<T: Clone + Send + Sync + 'static> Scripted<T> {
    pub fn new(kind: SourceKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            steps: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, response: Result<T>) -> &Self {
        self.push_after(Duration::ZERO, response)
    }

    pub fn push_after(&self, delay: Duration, response: Result<T>) -> &Self {
        self.steps.lock().unwrap().push_back((delay, response));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> SourceClient for Scripted<T> {
    type Output = T;

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, response) = {
            let mut steps = self.steps.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(step) = steps.pop_front() {
                *last = Some(step);
            }
            last.clone().expect("scripted source has no steps")
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

pub fn unavailable() -> SourceError {
    SourceError::RemoteUnavailable("HTTP 503 Service Unavailable".to_string())
}

/// Hourly point on 2024-06-15 at UTC+3.
pub fn point(hour: u32, temperature: f64, wind_speed: f64, rain: f64) -> ForecastPoint {
    let offset = FixedOffset::east_opt(3 * 3600).unwrap();
    ForecastPoint {
        timestamp: offset.with_ymd_and_hms(2024, 6, 15, hour, 0, 0).unwrap(),
        temperature,
        humidity: 55.0,
        wind_speed,
        cloud_cover: 30.0,
        precipitation_probability: rain,
        symbol_code: 2,
        wind_direction: Some(180.0),
        wind_gust: None,
        precipitation: Some(0.0),
        pressure: Some(1013.0),
        uv_index: None,
        is_day: Some(true),
    }
}

/// 08:00 / 12:00 / 16:00 points where 12:00 fits the default profile.
pub fn day_points() -> Vec<ForecastPoint> {
    vec![
        point(8, 15.0, 2.0, 10.0),
        point(12, 22.0, 1.0, 0.0),
        point(16, 28.0, 5.0, 40.0),
    ]
}

pub fn strike(distance_km: f64) -> LightningStrike {
    LightningStrike {
        timestamp: "2024-06-15T09:00:00Z".parse().unwrap(),
        latitude: 60.2,
        longitude: 24.9,
        distance_km,
        peak_current: -15.0,
        multiplicity: 2,
    }
}

pub fn sea_level(level_cm: f64) -> Vec<SeaLevelPoint> {
    vec![SeaLevelPoint {
        timestamp: "2024-06-15T09:00:00Z".parse().unwrap(),
        predicted_level_cm: level_cm,
    }]
}

pub fn reading(temperature: f64) -> ObservationReading {
    ObservationReading {
        station_id: "100971".to_string(),
        station_name: Some("Kaisaniemi".to_string()),
        timestamp: "2024-06-15T09:50:00Z".parse().unwrap(),
        temperature,
        humidity: 70.0,
        wind_speed: 3.0,
        wind_direction: None,
        wind_gust: None,
        pressure: None,
        dew_point: None,
        precipitation: None,
        cloud_cover: None,
    }
}

/// Forecast source that never answers and records when its pending fetch
/// is dropped.
pub struct Stalled {
    dropped: Arc<AtomicBool>,
}

impl Stalled {
    pub fn new() -> (Arc<Self>, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let source = Arc::new(Self {
            dropped: dropped.clone(),
        });
        (source, dropped)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceClient for Stalled {
    type Output = Vec<ForecastPoint>;

    fn kind(&self) -> SourceKind {
        SourceKind::Forecast
    }

    async fn fetch(&self) -> Result<Vec<ForecastPoint>> {
        let _flag = DropFlag(self.dropped.clone());
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}
