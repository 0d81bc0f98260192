//! Process-wide holder of the latest published snapshots.
//!
//! One `watch` channel per coordinator: publishing is a single reference
//! swap, readers clone the current `Arc` and never block the writer.

use crate::snapshot::{ForecastSnapshot, ObservationSnapshot, Snapshot};
use std::sync::Arc;
use tokio::sync::watch;

pub struct SnapshotStore {
    forecast: watch::Sender<Option<Arc<ForecastSnapshot>>>,
    observation: watch::Sender<Option<Arc<ObservationSnapshot>>>,
}

impl SnapshotStore {
    /// Empty store; nothing is published until the first successful cycle.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            forecast: watch::Sender::new(None),
            observation: watch::Sender::new(None),
        })
    }

    pub fn publish_forecast(&self, snapshot: Arc<ForecastSnapshot>) {
        self.forecast.send_replace(Some(snapshot));
    }

    pub fn publish_observation(&self, snapshot: Arc<ObservationSnapshot>) {
        self.observation.send_replace(Some(snapshot));
    }

    pub fn forecast(&self) -> Option<Arc<ForecastSnapshot>> {
        self.forecast.borrow().clone()
    }

    pub fn observation(&self) -> Option<Arc<ObservationSnapshot>> {
        self.observation.borrow().clone()
    }

    /// View over the latest part of each coordinator.
    pub fn current(&self) -> Snapshot {
        Snapshot {
            forecast_part: self.forecast(),
            observation_part: self.observation(),
        }
    }

    /// Notified whenever the forecast part is replaced or cleared.
    pub fn subscribe_forecast(&self) -> watch::Receiver<Option<Arc<ForecastSnapshot>>> {
        self.forecast.subscribe()
    }

    /// Notified whenever the observation part is replaced or cleared.
    pub fn subscribe_observation(&self) -> watch::Receiver<Option<Arc<ObservationSnapshot>>> {
        self.observation.subscribe()
    }

    /// Drop all published data at shutdown.
    pub fn teardown(&self) {
        self.forecast.send_replace(None);
        self.observation.send_replace(None);
        log::info!("[Store] torn down");
    }
}
