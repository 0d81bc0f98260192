//! Upstream data sources.
//!
//! Every source implements [`SourceClient`]: one logical request per call,
//! normalized into the shared data model, failing fast with a
//! [`SourceError`]. Request parameters are bound when the client is built;
//! the per-call time budget is applied by [`fetch_bounded`]. Clients never
//! retry; the next scheduled cycle is the retry.

pub mod forecast;
pub mod lightning;
pub mod mareograph;
pub mod observation;

pub use forecast::OpenMeteoForecast;
pub use lightning::LightningFeed;
pub use mareograph::MareographFeed;
pub use observation::StationObservation;

use crate::model::{ForecastPoint, LightningStrike, ObservationReading, SeaLevelPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// User agent sent to every upstream.
const USER_AGENT: &str = concat!("weatherloop/", env!("CARGO_PKG_VERSION"));

/// Errors from a single fetch.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SourceError {
    #[error("Timed out after {0} ms")]
    Timeout(u64),
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// The four upstream feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Forecast,
    Observation,
    Lightning,
    Mareograph,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Forecast => "forecast",
            SourceKind::Observation => "observation",
            SourceKind::Lightning => "lightning",
            SourceKind::Mareograph => "mareograph",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upstream dataset.
///
/// Implementations must not touch shared state; the only side effect of
/// `fetch` is the network request itself.
#[async_trait]
pub trait SourceClient: Send + Sync {
    type Output: Send;

    fn kind(&self) -> SourceKind;

    async fn fetch(&self) -> Result<Self::Output>;
}

pub type ForecastSource = Arc<dyn SourceClient<Output = Vec<ForecastPoint>>>;
pub type ObservationSource = Arc<dyn SourceClient<Output = ObservationReading>>;
pub type LightningSource = Arc<dyn SourceClient<Output = Vec<LightningStrike>>>;
pub type SeaLevelSource = Arc<dyn SourceClient<Output = Vec<SeaLevelPoint>>>;

/// Fetch with an independent time budget.
///
/// The fetch future is dropped when the budget runs out, abandoning the
/// request.
pub async fn fetch_bounded<S>(source: &S, timeout: Duration) -> Result<S::Output>
where
    S: SourceClient + ?Sized,
{
    match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(result) => result,
        Err(_) => {
            let budget_ms = millis(timeout);
            log::warn!(
                "[Source] {} fetch timed out after {} ms",
                source.kind(),
                budget_ms
            );
            Err(SourceError::Timeout(budget_ms))
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Build the HTTP client shared by all upstream clients.
///
/// No request timeout is configured here: every call is bounded by
/// [`fetch_bounded`] instead.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SourceError::RemoteUnavailable(format!("HTTP client setup failed: {}", e)))
}

/// Send a request and decode a JSON body.
///
/// Transport failures and non-2xx statuses are `RemoteUnavailable`; a body
/// that does not decode is `MalformedResponse`.
pub(crate) async fn get_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::RemoteUnavailable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::RemoteUnavailable(format!(
            "HTTP {} from {}",
            status.as_u16(),
            response.url()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SourceError::RemoteUnavailable(format!("failed to read body: {}", e)))?;

    serde_json::from_str(&body).map_err(|e| SourceError::MalformedResponse(e.to_string()))
}

/// Parse an RFC 3339 timestamp field.
pub(crate) fn parse_utc(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SourceError::MalformedResponse(format!("{}: invalid time '{}': {}", field, raw, e)))
}

/// Reject a missing or non-finite required number.
pub(crate) fn required(field: &str, value: Option<f64>) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(SourceError::MalformedResponse(format!(
            "{} is not a finite number: {}",
            field, v
        ))),
        None => Err(SourceError::MalformedResponse(format!("missing {}", field))),
    }
}

/// Drop non-finite optional numbers.
pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Source that replays scripted responses, optionally after a delay.
    ///
    /// Once the script runs out the last response is repeated.
    pub struct ScriptedSource<T> {
        kind: SourceKind,
        script: Mutex<VecDeque<(Duration, Result<T>)>>,
        last: Mutex<Option<(Duration, Result<T>)>>,
        calls: AtomicUsize,
    }

    impl<T: Clone + Send + 'static> ScriptedSource<T> {
        pub fn new(kind: SourceKind) -> Self {
            Self {
                kind,
                script: Mutex::new(VecDeque::new()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn then(self, response: Result<T>) -> Self {
            self.then_after(Duration::ZERO, response)
        }

        pub fn then_after(self, delay: Duration, response: Result<T>) -> Self {
            self.script.lock().unwrap().push_back((delay, response));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<T: Clone + Send + Sync + 'static> SourceClient for ScriptedSource<T> {
        type Output = T;

        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut script = self.script.lock().unwrap();
                let mut last = self.last.lock().unwrap();
                if let Some(step) = script.pop_front() {
                    *last = Some(step.clone());
                }
                last.clone()
            };
            let (delay, response) = next.expect("scripted source has no responses");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::ScriptedSource;
    use super::*;

    #[test]
    fn timeout_budget_saturates() {
        assert_eq!(millis(Duration::from_millis(40_000)), 40_000);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn fetch_bounded_passes_result_through() {
        let source = ScriptedSource::new(SourceKind::Lightning).then(Ok(3_u32));
        let value = fetch_bounded(&source, Duration::from_millis(100)).await;
        assert_eq!(value, Ok(3));
    }

    #[tokio::test]
    async fn fetch_bounded_times_out() {
        let source = ScriptedSource::new(SourceKind::Mareograph)
            .then_after(Duration::from_secs(5), Ok(1_u32));
        let started = std::time::Instant::now();
        let value = fetch_bounded(&source, Duration::from_millis(50)).await;
        assert_eq!(value, Err(SourceError::Timeout(50)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn required_rejects_missing_and_nan() {
        assert_eq!(required("temperature", Some(1.5)), Ok(1.5));
        assert!(matches!(
            required("temperature", None),
            Err(SourceError::MalformedResponse(_))
        ));
        assert!(matches!(
            required("temperature", Some(f64::NAN)),
            Err(SourceError::MalformedResponse(_))
        ));
        assert_eq!(finite(Some(f64::INFINITY)), None);
    }

    #[test]
    fn parse_utc_accepts_offsets() {
        let t = parse_utc("time", "2024-06-15T12:00:00+03:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-06-15T09:00:00+00:00");
        assert!(parse_utc("time", "yesterday").is_err());
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://x/", "/a/b"), "http://x/a/b");
        assert_eq!(join_url("http://x", "a"), "http://x/a");
    }

    #[test]
    fn source_error_serializes_with_kind() {
        let json = serde_json::to_value(SourceError::Timeout(5000)).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["detail"], 5000);
    }
}
