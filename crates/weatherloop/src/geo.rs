//! Spherical geometry helpers for the lightning feed.

use serde::Serialize;

/// Mean Earth radius in km.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude/longitude rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Square box of `half_side_km` around a point.
    ///
    /// Returns `None` for a non-positive side or out-of-range coordinates.
    pub fn around(latitude: f64, longitude: f64, half_side_km: f64) -> Option<Self> {
        if half_side_km.is_nan()
            || half_side_km <= 0.0
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return None;
        }

        let lat = latitude.to_radians();
        let lon = longitude.to_radians();
        // Radius of the parallel at this latitude
        let parallel_radius = EARTH_RADIUS_KM * lat.cos();

        Some(Self {
            lat_min: (lat - half_side_km / EARTH_RADIUS_KM).to_degrees(),
            lat_max: (lat + half_side_km / EARTH_RADIUS_KM).to_degrees(),
            lon_min: (lon - half_side_km / parallel_radius).to_degrees(),
            lon_max: (lon + half_side_km / parallel_radius).to_degrees(),
        })
    }

    /// `lon_min,lat_min,lon_max,lat_max`, the usual WFS bbox ordering.
    pub fn to_query_value(&self) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4}",
            self.lon_min, self.lat_min, self.lon_max, self.lat_max
        )
    }
}

/// Great-circle distance between two points in km.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
