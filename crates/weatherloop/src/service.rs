//! Host wiring: one store, both coordinators, and a reporter that logs
//! every completed cycle.

use crate::config::{Config, ConfigError};
use crate::coordinator::{
    CoordinatorError, CycleOutcome, ForecastCoordinator, ObservationCoordinator,
};
use crate::sensor::{self, SensorKind, SensorValue};
use crate::snapshot::{ForecastSnapshot, ObservationSnapshot};
use crate::source::{self, SourceError};
use crate::store::SnapshotStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Source setup failed: {0}")]
    Source(#[from] SourceError),
}

pub struct Service {
    place: String,
    store: Arc<SnapshotStore>,
    forecast: Arc<ForecastCoordinator>,
    observation: Arc<ObservationCoordinator>,
}

impl Service {
    /// Validate `config` and build both coordinators over HTTP sources.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        config.validate()?;
        let client = source::http_client()?;
        let store = SnapshotStore::new();

        let forecast = ForecastCoordinator::new(
            config.forecast_sources(&client),
            config.forecast_settings(),
            store.clone(),
        );
        let observation = ObservationCoordinator::new(
            config.observation_source(&client),
            config.observation_settings(),
            store.clone(),
        );

        Ok(Self::new(
            config.location.display_name(),
            store,
            forecast,
            observation,
        ))
    }

    pub fn new(
        place: impl Into<String>,
        store: Arc<SnapshotStore>,
        forecast: Arc<ForecastCoordinator>,
        observation: Arc<ObservationCoordinator>,
    ) -> Self {
        Self {
            place: place.into(),
            store,
            forecast,
            observation,
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn forecast(&self) -> &Arc<ForecastCoordinator> {
        &self.forecast
    }

    pub fn observation(&self) -> &Arc<ObservationCoordinator> {
        &self.observation
    }

    /// Run both coordinators until `shutdown` fires, then tear the store down.
    pub async fn run(&self, shutdown: watch::Receiver<()>) {
        log::info!("[Service] starting coordinators for {}", self.place);

        let reporter = tokio::spawn(report(
            self.forecast.subscribe(),
            self.observation.subscribe(),
            shutdown.clone(),
        ));
        let forecast = tokio::spawn(self.forecast.clone().run(shutdown.clone()));
        let observation = tokio::spawn(self.observation.clone().run(shutdown));

        let (forecast, observation, reporter) = tokio::join!(forecast, observation, reporter);
        for (name, result) in [
            ("forecast", forecast),
            ("observation", observation),
            ("reporter", reporter),
        ] {
            if let Err(e) = result {
                log::error!("[Service] {} task failed: {}", name, e);
            }
        }

        self.store.teardown();
        log::info!("[Service] stopped");
    }

    /// One cycle of each coordinator, run side by side.
    pub async fn refresh_once(
        &self,
    ) -> (
        CycleOutcome<ForecastSnapshot>,
        CycleOutcome<ObservationSnapshot>,
    ) {
        tokio::join!(self.forecast.refresh(), self.observation.refresh())
    }

    /// Current sensor table.
    pub fn sensors(&self, now: DateTime<Utc>) -> Vec<(SensorKind, SensorValue)> {
        sensor::read_all(&self.store.current(), &self.place, now)
    }
}

async fn report(
    mut forecast: broadcast::Receiver<CycleOutcome<ForecastSnapshot>>,
    mut observation: broadcast::Receiver<CycleOutcome<ObservationSnapshot>>,
    mut shutdown: watch::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = forecast.recv() => match event {
                Ok(outcome) => log_forecast(&outcome),
                Err(RecvError::Lagged(n)) => log::warn!("[Service] missed {} forecast events", n),
                Err(RecvError::Closed) => break,
            },
            event = observation.recv() => match event {
                Ok(outcome) => log_observation(&outcome),
                Err(RecvError::Lagged(n)) => log::warn!("[Service] missed {} observation events", n),
                Err(RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

fn log_forecast(outcome: &Result<Arc<ForecastSnapshot>, CoordinatorError>) {
    match outcome {
        Ok(snapshot) => {
            let best = snapshot
                .best_time
                .as_ref()
                .map(|b| format!("{} ({})", b.point.timestamp.format("%a %H:%M"), b.reason))
                .unwrap_or_else(|| "none in window".to_string());
            log::info!(
                "[Service] forecast: {} points, {} days, best time {}",
                snapshot.forecast.len(),
                snapshot.daily.len(),
                best
            );
            for (kind, failure) in &snapshot.source_errors {
                log::warn!(
                    "[Service] {} degraded for {} cycles: {}",
                    kind,
                    failure.consecutive_failures,
                    failure.error
                );
            }
        }
        Err(e) => log::warn!("[Service] forecast not updated: {}", e),
    }
}

fn log_observation(outcome: &Result<Arc<ObservationSnapshot>, CoordinatorError>) {
    match outcome {
        Ok(snapshot) => log::info!(
            "[Service] observation {}: {:.1} C, {:.0} %, {:.1} m/s",
            snapshot.reading.station_id,
            snapshot.reading.temperature,
            snapshot.reading.humidity,
            snapshot.reading.wind_speed
        ),
        Err(e) => log::warn!("[Service] observation not updated: {}", e),
    }
}
