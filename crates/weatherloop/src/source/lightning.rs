//! Lightning strikes around the configured location.
//!
//! The feed is queried with a bounding box; strikes are then measured from
//! the origin, anything beyond the radius is dropped and only the closest
//! `max_strikes` are kept.

use super::{get_json, join_url, parse_utc, required, Result, SourceClient, SourceError, SourceKind};
use crate::geo::{haversine_km, BoundingBox};
use crate::model::LightningStrike;
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use serde::Deserialize;

/// Lightning client bound to an origin and search radius.
#[derive(Debug, Clone)]
pub struct LightningFeed {
    client: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    max_strikes: usize,
    lookback: Duration,
}

impl LightningFeed {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        max_strikes: usize,
        lookback_minutes: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            latitude,
            longitude,
            radius_km,
            max_strikes,
            lookback: Duration::minutes(i64::from(lookback_minutes)),
        }
    }
}

#[async_trait]
impl SourceClient for LightningFeed {
    type Output = Vec<LightningStrike>;

    fn kind(&self) -> SourceKind {
        SourceKind::Lightning
    }

    async fn fetch(&self) -> Result<Vec<LightningStrike>> {
        let bbox = BoundingBox::around(self.latitude, self.longitude, self.radius_km)
            .ok_or_else(|| {
                SourceError::MalformedResponse(format!(
                    "cannot build bounding box for ({}, {}) r={} km",
                    self.latitude, self.longitude, self.radius_km
                ))
            })?;
        let start = (Utc::now() - self.lookback).to_rfc3339_opts(SecondsFormat::Secs, true);

        let request = self
            .client
            .get(join_url(&self.base_url, "strikes"))
            .query(&[("bbox", bbox.to_query_value()), ("start", start)]);

        let response: StrikesResponse = get_json(request).await?;
        let strikes = normalize(
            response,
            (self.latitude, self.longitude),
            self.radius_km,
            self.max_strikes,
        )?;
        log::debug!("[Source] lightning: {} strikes within {} km", strikes.len(), self.radius_km);
        Ok(strikes)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StrikesResponse {
    strikes: Vec<WireStrike>,
}

#[derive(Debug, Deserialize)]
struct WireStrike {
    time: String,
    lat: Option<f64>,
    lon: Option<f64>,
    peak_current: Option<f64>,
    multiplicity: Option<u32>,
}

/// Measure, filter and rank strikes by distance from `origin`.
pub(crate) fn normalize(
    response: StrikesResponse,
    origin: (f64, f64),
    radius_km: f64,
    max_strikes: usize,
) -> Result<Vec<LightningStrike>> {
    let mut strikes = Vec::with_capacity(response.strikes.len());
    for (i, wire) in response.strikes.into_iter().enumerate() {
        let latitude = required(&format!("strikes[{}].lat", i), wire.lat)?;
        let longitude = required(&format!("strikes[{}].lon", i), wire.lon)?;
        let distance_km = haversine_km(origin.0, origin.1, latitude, longitude);
        if distance_km > radius_km {
            continue;
        }
        strikes.push(LightningStrike {
            timestamp: parse_utc(&format!("strikes[{}].time", i), &wire.time)?,
            latitude,
            longitude,
            distance_km,
            peak_current: required(&format!("strikes[{}].peak_current", i), wire.peak_current)?,
            multiplicity: wire.multiplicity.ok_or_else(|| {
                SourceError::MalformedResponse(format!("missing strikes[{}].multiplicity", i))
            })?,
        });
    }

    // Closest first; among equal distances the most recent first
    strikes.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    strikes.truncate(max_strikes);
    Ok(strikes)
}
