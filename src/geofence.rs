// src/geofence.rs
//! Circular geofence checks

use crate::{
    error::{GpsError, Result},
    gps::{GeoPoint, Position},
};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points (haversine).
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let dphi = (b.latitude - a.latitude).to_radians();
    let dlambda = (b.longitude - a.longitude).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// A validated circular region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    center: GeoPoint,
    radius_m: f64,
}

impl Geofence {
    pub fn new(center: GeoPoint, radius_m: f64) -> Result<Self> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(GpsError::InvalidRegion(format!(
                "radius must be a positive number of meters, got {}",
                radius_m
            )));
        }
        if !center.is_valid() {
            return Err(GpsError::InvalidRegion(format!(
                "center ({}, {}) is not a valid coordinate",
                center.latitude, center.longitude
            )));
        }
        Ok(Self { center, radius_m })
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Points exactly on the boundary count as inside.
    pub fn contains(&self, point: GeoPoint) -> bool {
        distance_m(point, self.center) <= self.radius_m
    }
}

/// One-shot check of a position against a circle.
pub fn inside_circle(point: &Position, center: GeoPoint, radius_m: f64) -> Result<bool> {
    Ok(Geofence::new(center, radius_m)?.contains(point.point()))
}
