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

//! Error taxonomy shared by every stage of the telemetry pipeline.

use std::time::Duration;

use thiserror::Error;

/// Uniform result shape returned by the fetcher and consumed by every caller.
pub type FetchOutcome<T> = Result<T, TelemetryError>;

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

impl NetworkError {
    /// Classify a reqwest failure.
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Errors produced while fetching, decoding, validating, or rendering telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("cancelled")]
    Cancelled,
}

impl TelemetryError {
    #[cfg(test)]
    pub(crate) fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    #[cfg(test)]
    pub(crate) fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display() {
        let err = TelemetryError::from(NetworkError::Status(503));
        assert_eq!(err.to_string(), "network error: HTTP status 503");
        assert!(err.is_network());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_timeout_display() {
        let err = NetworkError::Timeout(Duration::from_secs(6));
        assert_eq!(err.to_string(), "timed out after 6s");
    }
}
