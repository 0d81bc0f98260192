//! Shared input validation for configuration and CLI boundaries.

/// Validate a latitude in degrees: finite, within [-90, 90].
pub fn validate_latitude(latitude: f64) -> Result<(), String> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(format!(
            "Latitude must be within [-90, 90] degrees, got {}",
            latitude
        ));
    }
    Ok(())
}

/// Validate a longitude in degrees: finite, within [-180, 180].
pub fn validate_longitude(longitude: f64) -> Result<(), String> {
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!(
            "Longitude must be within [-180, 180] degrees, got {}",
            longitude
        ));
    }
    Ok(())
}

/// Validate a station id: 1-64 chars, `[a-zA-Z0-9_-]` only.
///
/// Station ids end up in request paths, so anything that could escape the
/// path segment is rejected.
pub fn validate_station_id(id: &str) -> Result<(), String> {
    if id.is_empty() || id.len() > 64 {
        return Err(format!(
            "Station id must be 1-64 characters, got {}",
            id.len()
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "Station id may only contain alphanumeric characters, hyphens, and underscores"
                .to_string(),
        );
    }
    Ok(())
}

/// Validate an upstream base URL: must be http(s), max 512 chars.
pub fn validate_base_url(url: &str) -> Result<(), String> {
    if url.is_empty() || url.len() > 512 {
        return Err(format!(
            "Base URL must be 1-512 characters, got {}",
            url.len()
        ));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(format!("Base URL must start with http:// or https://, got '{}'", url));
    }
    Ok(())
}

/// Validate a non-negative, finite threshold value.
pub fn validate_threshold(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be a non-negative number, got {}", name, value));
    }
    Ok(())
}

/// Validate a percentage in [0, 100].
pub fn validate_percentage(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(format!("{} must be within [0, 100], got {}", name, value));
    }
    Ok(())
}

/// Validate a temperature comfort range: finite bounds, `min <= max`.
pub fn validate_temperature_range(min: f64, max: f64) -> Result<(), String> {
    if !min.is_finite() || !max.is_finite() {
        return Err("Temperature range bounds must be finite".to_string());
    }
    if min > max {
        return Err(format!(
            "temp_min ({}) must not be greater than temp_max ({})",
            min, max
        ));
    }
    Ok(())
}

/// Validate a strictly positive integer setting (intervals, timeouts, counts).
pub fn validate_positive(name: &str, value: u64) -> Result<(), String> {
    if value == 0 {
        return Err(format!("{} must be greater than zero", name));
    }
    Ok(())
}
