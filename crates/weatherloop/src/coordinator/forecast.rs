//! Forecast coordinator: mandatory forecast plus optional lightning and
//! sea level, merged into one [`ForecastSnapshot`].

use super::{CoordinatorError, CycleDriver, CycleOutcome, Phase};
use crate::best_time::{self, PreferenceProfile};
use crate::daily;
use crate::snapshot::{ForecastSnapshot, SourceFailure};
use crate::source::{
    self, fetch_bounded, ForecastSource, LightningSource, SeaLevelSource, SourceClient, SourceKind,
};
use crate::store::SnapshotStore;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Sources of one forecast cycle. A `None` optional source is disabled.
#[derive(Clone)]
pub struct ForecastSources {
    pub forecast: ForecastSource,
    pub lightning: Option<LightningSource>,
    pub sea_level: Option<SeaLevelSource>,
}

#[derive(Debug, Clone)]
pub struct ForecastSettings {
    pub update_interval: Duration,
    pub forecast_timeout: Duration,
    pub lightning_timeout: Duration,
    pub sea_level_timeout: Duration,
    pub profile: PreferenceProfile,
    /// Clear an optional field after this many failed cycles in a row.
    /// `None` keeps the last good value indefinitely.
    pub stale_after_failures: Option<u32>,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(30 * 60),
            forecast_timeout: Duration::from_secs(40),
            lightning_timeout: Duration::from_secs(5),
            sea_level_timeout: Duration::from_secs(5),
            profile: PreferenceProfile::default(),
            stale_after_failures: None,
        }
    }
}

pub struct ForecastCoordinator {
    sources: ForecastSources,
    settings: ForecastSettings,
    store: Arc<SnapshotStore>,
    driver: CycleDriver<ForecastSnapshot>,
}

impl ForecastCoordinator {
    pub fn new(
        sources: ForecastSources,
        settings: ForecastSettings,
        store: Arc<SnapshotStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sources,
            settings,
            store,
            driver: CycleDriver::new("Forecast"),
        })
    }

    pub fn phase(&self) -> Phase {
        self.driver.phase()
    }

    /// Whether the most recent completed cycle published.
    pub fn last_update_success(&self) -> bool {
        self.driver.last_update_success()
    }

    /// Fired once per completed cycle, success or failure.
    pub fn subscribe(&self) -> broadcast::Receiver<CycleOutcome<ForecastSnapshot>> {
        self.driver.subscribe()
    }

    pub fn current(&self) -> Option<Arc<ForecastSnapshot>> {
        self.store.forecast()
    }

    /// Run a cycle now, or join the one already running.
    pub async fn refresh(self: &Arc<Self>) -> CycleOutcome<ForecastSnapshot> {
        let this = Arc::clone(self);
        self.driver
            .coalesce(move || async move { this.cycle().await }.boxed())
            .await
    }

    /// Periodic loop until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<()>) {
        let this = Arc::clone(&self);
        self.driver
            .run_loop(self.settings.update_interval, shutdown, move || {
                let this = Arc::clone(&this);
                async move { this.refresh().await }.boxed()
            })
            .await;
    }

    async fn cycle(&self) -> CycleOutcome<ForecastSnapshot> {
        if self.driver.is_cancelled() {
            return self.driver.finish(Err(CoordinatorError::Cancelled));
        }
        self.driver.set_phase(Phase::Fetching);

        let fetches = async {
            tokio::join!(
                fetch_bounded(self.sources.forecast.as_ref(), self.settings.forecast_timeout),
                fetch_optional(self.sources.lightning.as_deref(), self.settings.lightning_timeout),
                fetch_optional(self.sources.sea_level.as_deref(), self.settings.sea_level_timeout),
            )
        };
        let (forecast, lightning, sea_level) = tokio::select! {
            fetched = fetches => fetched,
            _ = self.driver.cancelled() => return self.driver.finish(Err(CoordinatorError::Cancelled)),
        };

        let forecast = match forecast {
            Ok(points) => points,
            Err(error) => {
                return self.driver.finish(Err(CoordinatorError::MandatorySourceFailed {
                    kind: SourceKind::Forecast,
                    error,
                }))
            }
        };

        self.driver.set_phase(Phase::Merging);
        let previous = self.store.forecast();
        let previous = previous.as_deref();
        let now = Utc::now();
        let mut source_errors = BTreeMap::new();

        let lightning = self.merge_optional(
            SourceKind::Lightning,
            lightning,
            previous.and_then(|p| p.lightning.clone()),
            previous,
            &mut source_errors,
            now,
        );
        let sea_level = self.merge_optional(
            SourceKind::Mareograph,
            sea_level,
            previous.and_then(|p| p.sea_level.clone()),
            previous,
            &mut source_errors,
            now,
        );

        let best_time = best_time::select(&forecast, &self.settings.profile);
        match &best_time {
            Some(best) => log::debug!(
                "[Forecast] best time {} (score {:.1})",
                best.point.timestamp,
                best.score
            ),
            None => log::debug!("[Forecast] no forecast point inside the preferred window"),
        }
        let daily = daily::aggregate(&forecast);

        let snapshot = Arc::new(ForecastSnapshot {
            forecast,
            best_time,
            daily,
            lightning,
            sea_level,
            fetched_at: now,
            source_errors,
        });

        if self.driver.is_cancelled() {
            return self.driver.finish(Err(CoordinatorError::Cancelled));
        }
        self.store.publish_forecast(Arc::clone(&snapshot));
        self.driver.finish(Ok(snapshot))
    }

    /// Fold one optional fetch into the new snapshot.
    ///
    /// Success replaces the field. Failure keeps `prior` (absent on the very
    /// first cycle) and records the error with its run length, unless the
    /// run has reached `stale_after_failures`.
    fn merge_optional<T>(
        &self,
        kind: SourceKind,
        fetched: Option<source::Result<T>>,
        prior: Option<T>,
        previous: Option<&ForecastSnapshot>,
        source_errors: &mut BTreeMap<SourceKind, SourceFailure>,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let error = match fetched? {
            Ok(value) => return Some(value),
            Err(error) => error,
        };

        let earlier = previous.and_then(|p| p.source_errors.get(&kind));
        let failure = SourceFailure {
            consecutive_failures: earlier.map_or(0, |f| f.consecutive_failures) + 1,
            since: earlier.map_or(now, |f| f.since),
            error: error.clone(),
        };
        log::warn!(
            "[Forecast] {} ({} in a row)",
            CoordinatorError::OptionalSourceFailed { kind, error },
            failure.consecutive_failures
        );

        let stale = self
            .settings
            .stale_after_failures
            .is_some_and(|limit| failure.consecutive_failures >= limit);
        source_errors.insert(kind, failure);
        if stale {
            log::warn!("[Forecast] dropping stale {} data", kind);
            return None;
        }
        prior
    }
}

async fn fetch_optional<S>(source: Option<&S>, timeout: Duration) -> Option<source::Result<S::Output>>
where
    S: SourceClient + ?Sized,
{
    match source {
        Some(source) => Some(fetch_bounded(source, timeout).await),
        None => None,
    }
}
