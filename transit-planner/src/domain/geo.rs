//! Geographic coordinates and distances.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    /// Create a position from latitude and longitude.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns true if both components are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle (haversine) distance to `other`, in metres.
    ///
    /// ```
    /// use transit_planner::domain::LatLon;
    ///
    /// let a = LatLon::new(45.0, 0.7);
    /// assert_eq!(a.distance_m(&a), 0.0);
    /// ```
    pub fn distance_m(&self, other: &LatLon) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lon - self.lon).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Cheap squared planar distance in degrees, with longitude scaled by
    /// the cosine of the mean latitude. Only meaningful for comparisons.
    pub fn approx_distance_sq(&self, other: &LatLon) -> f64 {
        let mean_lat = ((self.lat + other.lat) / 2.0).to_radians();
        let d_lat = other.lat - self.lat;
        let d_lon = (other.lon - self.lon) * mean_lat.cos();
        d_lat * d_lat + d_lon * d_lon
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lon)
    }
}

/// Seconds needed to cover `distance_m` at `speed_mps`, rounded to the
/// nearest second.
pub fn travel_seconds(distance_m: f64, speed_mps: f64) -> u32 {
    if speed_mps <= 0.0 || !distance_m.is_finite() {
        return 0;
    }
    (distance_m / speed_mps).round().max(0.0) as u32
}
