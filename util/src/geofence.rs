//! Great-circle geofencing.
//!
//! Distances use the haversine formula on a sphere with the mean Earth radius.
//! Everything here is pure so it can run on the server and inside the client
//! gate alike.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `true` when both components are finite and inside the usual lat/lng ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A circular area around an anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl Geofence {
    pub fn new(latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_meters,
        }
    }

    pub fn anchor(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Distance in metres from the anchor to `point`.
    pub fn distance_to(&self, point: &Coordinates) -> f64 {
        haversine_distance_m(&self.anchor(), point)
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        within_radius(
            point.latitude,
            point.longitude,
            self.latitude,
            self.longitude,
            self.radius_meters,
        )
    }
}

/// Great-circle distance between two points, in metres.
pub fn haversine_distance_m(a: &Coordinates, b: &Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `h` a hair above 1 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

/// Returns `true` iff the device lies within `radius_meters` of the anchor.
pub fn within_radius(
    device_lat: f64,
    device_lng: f64,
    anchor_lat: f64,
    anchor_lng: f64,
    radius_meters: f64,
) -> bool {
    let distance = haversine_distance_m(
        &Coordinates::new(device_lat, device_lng),
        &Coordinates::new(anchor_lat, anchor_lng),
    );
    distance <= radius_meters
}

/// Point reached by travelling `distance_m` from `origin` along the initial
/// `bearing_deg` (clockwise from north) on a great circle.
pub fn destination_point(origin: &Coordinates, bearing_deg: f64, distance_m: f64) -> Coordinates {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.latitude.to_radians();
    let lambda1 = origin.longitude.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    // normalise to [-180, 180)
    let lng = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
    Coordinates::new(phi2.to_degrees(), lng)
}
