// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed decode-and-validate step for position payloads.
//!
//! A payload either yields a fully populated, in-range [`Position`] or a
//! [`TelemetryError::Validation`]; partial positions are never produced.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::TelemetryError;

/// A validated geographic fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    latitude: f64,
    longitude: f64,
    observed_at: DateTime<Utc>,
}

impl Position {
    /// Build a position, rejecting non-finite or out-of-range coordinates.
    pub fn new(
        latitude: f64,
        longitude: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, TelemetryError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(TelemetryError::Validation(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(TelemetryError::Validation(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }

        Ok(Self {
            latitude,
            longitude,
            observed_at,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lat: {:.2}, Lon: {:.2}", self.latitude, self.longitude)
    }
}

/// Coordinates arrive either as JSON numbers or as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Coordinate {
    fn resolve(coordinate: Option<Self>, name: &str) -> Result<f64, TelemetryError> {
        let value = match coordinate {
            None => {
                return Err(TelemetryError::Validation(format!("{name} is missing")));
            }
            Some(Self::Number(n)) => n,
            Some(Self::Text(text)) => text.trim().parse::<f64>().map_err(|e| {
                TelemetryError::Validation(format!("{name} {text:?} is not numeric: {e}"))
            })?,
            Some(Self::Other(other)) => {
                return Err(TelemetryError::Validation(format!(
                    "{name} has non-numeric value {other}"
                )));
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(TelemetryError::Validation(format!("{name} is not finite")))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    #[serde(default)]
    latitude: Option<Coordinate>,
    #[serde(default)]
    longitude: Option<Coordinate>,
}

/// Extract and validate the position stored under `field`.
///
/// `observed_at` comes from the payload's `timestamp` (Unix seconds) when
/// present, otherwise from the local clock.
pub fn decode_position(payload: &Value, field: &str) -> Result<Position, TelemetryError> {
    let object = payload
        .get(field)
        .filter(|v| v.is_object())
        .ok_or_else(|| TelemetryError::Validation(format!("payload has no \"{field}\" object")))?;

    let raw = RawPosition::deserialize(object)
        .map_err(|e| TelemetryError::Validation(format!("malformed \"{field}\": {e}")))?;

    let latitude = Coordinate::resolve(raw.latitude, "latitude")?;
    let longitude = Coordinate::resolve(raw.longitude, "longitude")?;

    let observed_at = payload
        .get("timestamp")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    Position::new(latitude, longitude, observed_at)
}
