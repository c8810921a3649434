//! Coordinate validation and spherical geometry
//!
//! Every other module goes through [`Coordinate::new`] before touching a
//! latitude/longitude pair, so malformed upstream data is rejected at the
//! boundary and positions compare stably after rounding.

use serde::Serialize;

/// Mean Earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Rounding factor for 6-decimal-place canonical coordinates
const PRECISION: f64 = 1_000_000.0;

/// A validated geographic coordinate
///
/// Both axes are finite, in range and rounded to 6 decimal places.
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Validate and canonicalize a latitude/longitude pair
    ///
    /// Returns `None` when either axis is non-finite or out of its valid
    /// range. Never panics. Validating an already-validated coordinate is a
    /// no-op (rounding is idempotent).
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        Some(Self {
            latitude: round6(latitude),
            longitude: round6(longitude),
        })
    }

    /// Parse a coordinate from numeric strings (provider payloads often
    /// encode axes as strings)
    #[must_use]
    pub fn parse(latitude: &str, longitude: &str) -> Option<Self> {
        let lat = latitude.trim().parse::<f64>().ok()?;
        let lon = longitude.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }

    /// Latitude in degrees, range [-90, 90]
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees, range [-180, 180]
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Stable string key for deduplication
    #[must_use]
    pub fn key(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Round to 6 decimal places (about 0.1 m of precision)
fn round6(v: f64) -> f64 {
    (v * PRECISION).round() / PRECISION
}

/// Remove consecutive duplicate points while preserving order
///
/// Runs of two or more identical (rounded-key) points collapse to one.
/// A sequence of already-distinct points passes through unchanged.
#[must_use]
pub fn dedupe_sequential(coords: &[Coordinate]) -> Vec<Coordinate> {
    let mut out: Vec<Coordinate> = Vec::with_capacity(coords.len());
    for c in coords {
        if out.last().is_none_or(|prev| prev.key() != c.key()) {
            out.push(*c);
        }
    }
    out
}

/// Great-circle distance between two coordinates in meters
#[must_use]
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Compass bearing from `a` to `b` in degrees, 0..360
#[must_use]
pub fn bearing_deg(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Signed turn angle at `cur` when traveling `prev → cur → next`
///
/// Positive means a right turn, negative a left turn, in (-180, 180].
#[must_use]
pub fn turn_angle_deg(prev: Coordinate, cur: Coordinate, next: Coordinate) -> f64 {
    let inbound = bearing_deg(prev, cur);
    let outbound = bearing_deg(cur, next);

    let mut delta = outbound - inbound;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Squared distance in raw coordinate degrees
///
/// A lightweight approximation used only as a secondary sort key for nearby
/// POI candidates, not as a true distance.
#[must_use]
pub fn approx_sq_deg(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlon = a.longitude - b.longitude;
    dlat * dlat + dlon * dlon
}
