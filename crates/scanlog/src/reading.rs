//! Core scan data types.
//!
//! A [`Measurement`] is what the line parser extracts from the device. A
//! [`Reading`] is a measurement after the store has given it an id and a
//! timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One parsed `(angle, distance)` pair, not yet stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Device orientation in degrees. May be negative.
    pub angle: i64,
    /// Measured distance in meters. Negative means the sensor failed.
    pub distance_m: f64,
}

impl Measurement {
    /// Create a new measurement.
    #[must_use]
    pub fn new(angle: i64, distance_m: f64) -> Self {
        Self { angle, distance_m }
    }

    /// Whether the device reported a usable distance.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.distance_m >= 0.0
    }
}

/// A stored measurement.
///
/// `id` and `timestamp` are always assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Row identifier, strictly increasing in insertion order.
    pub id: i64,

    /// Insertion time, second resolution.
    pub timestamp: DateTime<Utc>,

    /// Device orientation in degrees.
    pub angle: i64,

    /// Measured distance in meters; negative for a failed reading.
    pub distance_m: f64,
}

impl Reading {
    /// The angle and distance without store metadata.
    #[must_use]
    pub fn measurement(&self) -> Measurement {
        Measurement::new(self.angle, self.distance_m)
    }

    /// Whether the device reported a usable distance.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.measurement().is_valid()
    }
}
