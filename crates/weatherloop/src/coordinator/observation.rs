//! Observation coordinator: one mandatory station reading on its own cadence.

use super::{CoordinatorError, CycleDriver, CycleOutcome, Phase};
use crate::snapshot::ObservationSnapshot;
use crate::source::{fetch_bounded, ObservationSource, SourceKind};
use crate::store::SnapshotStore;
use chrono::Utc;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

#[derive(Debug, Clone)]
pub struct ObservationSettings {
    pub update_interval: Duration,
    pub timeout: Duration,
}

impl Default for ObservationSettings {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(10 * 60),
            timeout: Duration::from_secs(40),
        }
    }
}

pub struct ObservationCoordinator {
    source: ObservationSource,
    settings: ObservationSettings,
    store: Arc<SnapshotStore>,
    driver: CycleDriver<ObservationSnapshot>,
}

impl ObservationCoordinator {
    pub fn new(
        source: ObservationSource,
        settings: ObservationSettings,
        store: Arc<SnapshotStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            settings,
            store,
            driver: CycleDriver::new("Observation"),
        })
    }

    pub fn phase(&self) -> Phase {
        self.driver.phase()
    }

    pub fn last_update_success(&self) -> bool {
        self.driver.last_update_success()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CycleOutcome<ObservationSnapshot>> {
        self.driver.subscribe()
    }

    pub fn current(&self) -> Option<Arc<ObservationSnapshot>> {
        self.store.observation()
    }

    /// Run a cycle now, or join the one already running.
    pub async fn refresh(self: &Arc<Self>) -> CycleOutcome<ObservationSnapshot> {
        let this = Arc::clone(self);
        self.driver
            .coalesce(move || async move { this.cycle().await }.boxed())
            .await
    }

    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<()>) {
        let this = Arc::clone(&self);
        self.driver
            .run_loop(self.settings.update_interval, shutdown, move || {
                let this = Arc::clone(&this);
                async move { this.refresh().await }.boxed()
            })
            .await;
    }

    async fn cycle(&self) -> CycleOutcome<ObservationSnapshot> {
        if self.driver.is_cancelled() {
            return self.driver.finish(Err(CoordinatorError::Cancelled));
        }
        self.driver.set_phase(Phase::Fetching);

        let fetched = tokio::select! {
            fetched = fetch_bounded(self.source.as_ref(), self.settings.timeout) => fetched,
            _ = self.driver.cancelled() => return self.driver.finish(Err(CoordinatorError::Cancelled)),
        };

        let reading = match fetched {
            Ok(reading) => reading,
            Err(error) => {
                return self.driver.finish(Err(CoordinatorError::MandatorySourceFailed {
                    kind: SourceKind::Observation,
                    error,
                }))
            }
        };

        self.driver.set_phase(Phase::Merging);
        log::debug!(
            "[Observation] station {} at {}: {:.1} C",
            reading.station_id,
            reading.timestamp,
            reading.temperature
        );
        let snapshot = Arc::new(ObservationSnapshot {
            reading,
            fetched_at: Utc::now(),
        });

        if self.driver.is_cancelled() {
            return self.driver.finish(Err(CoordinatorError::Cancelled));
        }
        self.store.publish_observation(Arc::clone(&snapshot));
        self.driver.finish(Ok(snapshot))
    }
}
