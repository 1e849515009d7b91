// src/gps/data.rs
//! GPS data structures and utilities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Check that a latitude/longitude pair lies on the globe.
pub fn coordinates_valid(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// A validated position fix.
///
/// Fields are private so that a `Position` with out-of-range coordinates can
/// never exist; build one with [`Position::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    latitude: f64,
    longitude: f64,
    altitude: Option<f64>,
    timestamp: i64, // UTC epoch seconds
}

impl Position {
    /// Returns `None` when the coordinates are outside [-90, 90] / [-180, 180].
    pub fn new(latitude: f64, longitude: f64, altitude: Option<f64>, timestamp: i64) -> Option<Self> {
        if !coordinates_valid(latitude, longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
            altitude,
            timestamp,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Altitude above mean sea level in meters, if the sentence carried one
    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// The horizontal part of the fix
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position(lat={:.6}, lon={:.6}, alt=", self.latitude, self.longitude)?;
        match self.altitude {
            Some(alt) => write!(f, "{:.1}", alt)?,
            None => write!(f, "unknown")?,
        }
        write!(f, ", time={})", self.timestamp)
    }
}

/// A bare latitude/longitude pair, used as a geofence center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        coordinates_valid(self.latitude, self.longitude)
    }
}

impl From<&Position> for GeoPoint {
    fn from(position: &Position) -> Self {
        position.point()
    }
}
