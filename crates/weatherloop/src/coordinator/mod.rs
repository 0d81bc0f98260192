//! Refresh coordinators.
//!
//! A coordinator owns one refresh cycle: fan out to its sources, merge,
//! publish to the [`SnapshotStore`](crate::store::SnapshotStore), and notify
//! subscribers exactly once per completed cycle. [`CycleDriver`] holds the
//! machinery both coordinators share: phase tracking, the event channel,
//! force-refresh coalescing, and the timer loop with shutdown.

pub mod forecast;
pub mod observation;

pub use forecast::{ForecastCoordinator, ForecastSettings, ForecastSources};
pub use observation::{ObservationCoordinator, ObservationSettings};

use crate::source::{SourceError, SourceKind};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;

/// Cycle-level failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinatorError {
    /// The cycle was aborted; the store was left untouched.
    #[error("Mandatory source {kind} failed: {error}")]
    MandatorySourceFailed { kind: SourceKind, error: SourceError },
    /// Recovered within the cycle; the field kept its previous value.
    #[error("Optional source {kind} failed: {error}")]
    OptionalSourceFailed { kind: SourceKind, error: SourceError },
    /// Abandoned by shutdown; nothing was published.
    #[error("Cycle cancelled by shutdown")]
    Cancelled,
}

/// Result of one completed cycle, as seen by subscribers.
pub type CycleOutcome<T> = std::result::Result<Arc<T>, CoordinatorError>;

/// Where a coordinator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching,
    Merging,
    Published,
    Failed,
}

const EVENT_CAPACITY: usize = 16;

type InFlight<T> = Option<(u64, Shared<BoxFuture<'static, CycleOutcome<T>>>)>;

pub(crate) struct CycleDriver<T> {
    name: &'static str,
    phase: watch::Sender<Phase>,
    last_success: AtomicBool,
    events: broadcast::Sender<CycleOutcome<T>>,
    in_flight: Mutex<InFlight<T>>,
    generation: AtomicU64,
    cancel: watch::Sender<bool>,
}

impl<T: Send + Sync + 'static> CycleDriver<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            name,
            phase: watch::Sender::new(Phase::Idle),
            last_success: AtomicBool::new(false),
            events,
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
            cancel: watch::Sender::new(false),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }

    pub(crate) fn last_update_success(&self) -> bool {
        self.last_success.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<CycleOutcome<T>> {
        self.events.subscribe()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Abandon the running cycle and refuse new ones.
    ///
    /// The in-flight cycle is released from the slot, so its fetches are
    /// dropped once no caller is still awaiting them.
    pub(crate) fn cancel(&self) {
        self.cancel.send_replace(true);
        let abandoned = self.slot().take();
        if abandoned.is_some() {
            log::debug!("[{}] releasing in-flight cycle", self.name);
        }
        drop(abandoned);
        self.set_phase(Phase::Idle);
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.cancel.subscribe();
        // the sender lives as long as `self`
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Record a finished cycle and notify subscribers.
    ///
    /// Cancelled cycles are not reported.
    pub(crate) fn finish(&self, outcome: CycleOutcome<T>) -> CycleOutcome<T> {
        match &outcome {
            Ok(_) => {
                self.last_success.store(true, Ordering::SeqCst);
                self.set_phase(Phase::Published);
                log::info!("[{}] snapshot published", self.name);
            }
            Err(CoordinatorError::Cancelled) => {
                self.set_phase(Phase::Idle);
                log::info!("[{}] cycle cancelled, discarding results", self.name);
                return outcome;
            }
            Err(e) => {
                self.last_success.store(false, Ordering::SeqCst);
                self.set_phase(Phase::Failed);
                log::error!("[{}] update failed: {}", self.name, e);
            }
        }
        // no subscribers is not an error
        let _ = self.events.send(outcome.clone());
        self.set_phase(Phase::Idle);
        outcome
    }

    fn slot(&self) -> MutexGuard<'_, InFlight<T>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Join the running cycle, or start one with `start` if none is running.
    pub(crate) async fn coalesce<F>(&self, start: F) -> CycleOutcome<T>
    where
        F: FnOnce() -> BoxFuture<'static, CycleOutcome<T>>,
    {
        let (generation, cycle) = {
            let mut slot = self.slot();
            let running = slot
                .as_ref()
                .map(|(generation, cycle)| (*generation, cycle.clone()));
            match running {
                Some(joined) => {
                    log::debug!("[{}] joining in-flight cycle", self.name);
                    joined
                }
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst);
                    let cycle = start().shared();
                    *slot = Some((generation, cycle.clone()));
                    (generation, cycle)
                }
            }
        };

        let outcome = cycle.await;

        let mut slot = self.slot();
        if matches!(slot.as_ref(), Some((current, _)) if *current == generation) {
            *slot = None;
        }
        outcome
    }

    /// Tick every `period` until `shutdown` fires, running one cycle per tick.
    ///
    /// The first tick fires immediately. A cycle runs to completion before
    /// the next tick is scheduled; shutdown abandons it.
    pub(crate) async fn run_loop<F>(
        &self,
        period: Duration,
        mut shutdown: watch::Receiver<()>,
        mut refresh: F,
    ) where
        F: FnMut() -> BoxFuture<'static, CycleOutcome<T>>,
    {
        log::info!(
            "[{}] starting update loop ({}s interval)",
            self.name,
            period.as_secs()
        );
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            tokio::select! {
                _ = refresh() => {}
                _ = shutdown.changed() => break,
            }
        }

        self.cancel();
        log::info!("[{}] shutdown signal received, exiting", self.name);
    }
}
