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

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use telemetry_client::{PollerStats, StatusChange, StatusLevel};

/// Diagnostic message with timestamp
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

impl From<StatusLevel> for DiagnosticLevel {
    fn from(level: StatusLevel) -> Self {
        match level {
            StatusLevel::Info => Self::Info,
            StatusLevel::Warning => Self::Warning,
            StatusLevel::Error => Self::Error,
        }
    }
}

/// Tracker status shown on the Status tab
#[derive(Debug)]
pub struct SystemStatus {
    pub started_at: DateTime<Utc>,

    // Position fetch statistics
    pub fetches_started: u64,
    pub fetches_succeeded: u64,
    pub fetches_failed: u64,
    pub ticks_dropped: u64,
    pub last_position_at: Option<DateTime<Utc>>,

    // Diagnostic messages (keep last 50)
    pub diagnostics: VecDeque<DiagnosticMessage>,
    max_diagnostics: usize,

    // Compositing metrics
    pub frames_composited: u64,
    pub last_composite_ms: f64,
    pub average_composite_ms: f64,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStatus {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),

            fetches_started: 0,
            fetches_succeeded: 0,
            fetches_failed: 0,
            ticks_dropped: 0,
            last_position_at: None,

            diagnostics: VecDeque::with_capacity(50),
            max_diagnostics: 50,

            frames_composited: 0,
            last_composite_ms: 0.0,
            average_composite_ms: 0.0,
        }
    }

    /// Record a status line reported by the tracker
    pub fn record(&mut self, change: StatusChange) {
        self.add_diagnostic(change.level.into(), change.message);
    }

    /// Mirror the poller's counters and the time of its last good position
    pub fn update_poller(&mut self, stats: PollerStats, last_position_at: Option<DateTime<Utc>>) {
        self.last_position_at = last_position_at;
        self.fetches_started = stats.fetches_started;
        self.fetches_succeeded = stats.fetches_succeeded;
        self.fetches_failed = stats.fetches_failed;
        self.ticks_dropped = stats.ticks_dropped;
    }

    /// Add a diagnostic message
    pub fn add_diagnostic(&mut self, level: DiagnosticLevel, message: String) {
        let diagnostic = DiagnosticMessage {
            timestamp: Utc::now(),
            level,
            message,
        };

        self.diagnostics.push_back(diagnostic);

        // Keep only the last N messages
        while self.diagnostics.len() > self.max_diagnostics {
            self.diagnostics.pop_front();
        }
    }

    /// Seconds since the tracker started
    pub fn uptime_seconds(&self) -> u64 {
        u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or(0)
    }

    /// Seconds since the last good position, if any
    pub fn position_age_seconds(&self) -> Option<u64> {
        self.last_position_at
            .map(|at| u64::try_from((Utc::now() - at).num_seconds()).unwrap_or(0))
    }

    /// Record one compositing pass
    pub fn update_performance(&mut self, duration_ms: f64) {
        self.frames_composited += 1;
        self.last_composite_ms = duration_ms;

        // Simple moving average
        const ALPHA: f64 = 0.1; // Smoothing factor
        if self.frames_composited == 1 {
            self.average_composite_ms = duration_ms;
        } else {
            self.average_composite_ms =
                ALPHA * duration_ms + (1.0 - ALPHA) * self.average_composite_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(level: StatusLevel, message: &str) -> StatusChange {
        StatusChange {
            level,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_diagnostics_are_bounded() {
        let mut status = SystemStatus::new();
        for i in 0..60 {
            status.add_diagnostic(DiagnosticLevel::Info, format!("message {i}"));
        }

        assert_eq!(status.diagnostics.len(), 50);
        assert_eq!(status.diagnostics.front().unwrap().message, "message 10");
        assert_eq!(status.diagnostics.back().unwrap().message, "message 59");
    }

    #[test]
    fn test_record_maps_level() {
        let mut status = SystemStatus::new();
        status.record(change(StatusLevel::Warning, "Position unavailable (temporary): timed out"));
        status.record(change(StatusLevel::Error, "Position payload invalid: latitude missing"));

        assert_eq!(status.diagnostics[0].level, DiagnosticLevel::Warning);
        assert_eq!(status.diagnostics[1].level, DiagnosticLevel::Error);
    }

    #[test]
    fn test_poller_stats_are_mirrored() {
        let mut status = SystemStatus::new();
        assert_eq!(status.position_age_seconds(), None);

        let observed = Utc::now() - chrono::Duration::seconds(30);
        status.update_poller(
            PollerStats {
                fetches_started: 5,
                fetches_succeeded: 3,
                fetches_failed: 2,
                ticks_dropped: 1,
            },
            Some(observed),
        );

        assert_eq!(status.fetches_started, 5);
        assert_eq!(status.fetches_succeeded, 3);
        assert_eq!(status.fetches_failed, 2);
        assert_eq!(status.ticks_dropped, 1);
        assert!(status.position_age_seconds().unwrap() >= 30);
    }

    #[test]
    fn test_composite_average() {
        let mut status = SystemStatus::new();
        status.update_performance(10.0);
        assert!((status.average_composite_ms - 10.0).abs() < f64::EPSILON);

        status.update_performance(20.0);
        assert!((status.average_composite_ms - 11.0).abs() < 1e-9);
        assert_eq!(status.frames_composited, 2);
    }
}
