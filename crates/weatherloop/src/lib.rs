//! Weatherloop
//!
//! Multi-source weather coordinator. Pulls an hourly forecast, a station
//! observation and optional lightning and sea level feeds on independent
//! cadences, merges them into immutable snapshots and derives the best time
//! of day from a user comfort profile.

pub mod best_time;
pub mod config;
pub mod coordinator;
pub mod daily;
pub mod geo;
pub mod model;
pub mod sensor;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod validation;

pub use best_time::{BestTimeResult, PreferenceProfile, TimeWindow};
pub use config::{Config, ConfigError};
pub use coordinator::{
    CoordinatorError, CycleOutcome, ForecastCoordinator, ObservationCoordinator, Phase,
};
pub use sensor::{SensorKind, SensorValue};
pub use service::{Service, ServiceError};
pub use snapshot::{ForecastSnapshot, ObservationSnapshot, Snapshot};
pub use source::{SourceClient, SourceError, SourceKind};
pub use store::SnapshotStore;
