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

//! Application configuration management.
//!
//! Settings persist as TOML through `confy`. Every field has a serde default,
//! so a missing or partial file still loads.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use telemetry_client::backdrop::{DEFAULT_BACKDROP_URL, MAX_BACKDROP_HEIGHT, MAX_BACKDROP_WIDTH};
use telemetry_client::crew::DEFAULT_CREW_URL;
use telemetry_client::poller::{DEFAULT_POSITION_FIELD, DEFAULT_POSITION_URL};
use telemetry_client::{
    BackdropSettings, CrewSettings, MarkerStyle, PollerSettings, RetryPolicy, TrackerSettings,
};

const APP_NAME: &str = "orbital-atlas";
const CONFIG_NAME: &str = "config";

/// Upper bound for intervals and timeouts, in seconds (one day).
const MAX_SECS: u64 = 24 * 60 * 60;

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Name drawn next to the marker
    #[serde(default = "default_object_name")]
    pub object_name: String,

    #[serde(default = "default_position_url")]
    pub position_url: String,

    /// Top-level JSON key holding the latitude/longitude object
    #[serde(default = "default_position_field")]
    pub position_field: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_position_timeout_secs")]
    pub position_timeout_secs: u64,

    #[serde(default = "default_attempts")]
    pub position_attempts: u32,

    /// Pause between attempts, shared by every fetch
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_backdrop_url")]
    pub backdrop_url: String,

    #[serde(default = "default_backdrop_timeout_secs")]
    pub backdrop_timeout_secs: u64,

    #[serde(default = "default_attempts")]
    pub backdrop_attempts: u32,

    /// Larger backdrops are downscaled to fit
    #[serde(default = "default_backdrop_max_width")]
    pub backdrop_max_width: u32,

    #[serde(default = "default_backdrop_max_height")]
    pub backdrop_max_height: u32,

    #[serde(default = "default_marker_radius")]
    pub marker_radius: u32,

    /// Crew roster endpoint; an empty string disables the roster
    #[serde(default = "default_crew_url")]
    pub crew_url: String,

    #[serde(default = "default_crew_craft")]
    pub crew_craft: String,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_object_name() -> String {
    "ISS".to_string()
}

fn default_position_url() -> String {
    DEFAULT_POSITION_URL.to_string()
}

fn default_position_field() -> String {
    DEFAULT_POSITION_FIELD.to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_position_timeout_secs() -> u64 {
    6
}

fn default_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_backdrop_url() -> String {
    DEFAULT_BACKDROP_URL.to_string()
}

fn default_backdrop_timeout_secs() -> u64 {
    10
}

fn default_backdrop_max_width() -> u32 {
    800
}

fn default_backdrop_max_height() -> u32 {
    400
}

fn default_marker_radius() -> u32 {
    10
}

fn default_crew_url() -> String {
    DEFAULT_CREW_URL.to_string()
}

fn default_crew_craft() -> String {
    "ISS".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            object_name: default_object_name(),
            position_url: default_position_url(),
            position_field: default_position_field(),
            poll_interval_secs: default_poll_interval_secs(),
            position_timeout_secs: default_position_timeout_secs(),
            position_attempts: default_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            backdrop_url: default_backdrop_url(),
            backdrop_timeout_secs: default_backdrop_timeout_secs(),
            backdrop_attempts: default_attempts(),
            backdrop_max_width: default_backdrop_max_width(),
            backdrop_max_height: default_backdrop_max_height(),
            marker_radius: default_marker_radius(),
            crew_url: default_crew_url(),
            crew_craft: default_crew_craft(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, writing defaults if no file exists yet
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Build the library settings for one tracker view.
    ///
    /// Intervals, timeouts, and sizes are clamped to a usable range.
    pub fn tracker_settings(&self) -> TrackerSettings {
        let retry_delay = Duration::from_millis(self.retry_delay_ms.min(MAX_SECS * 1000));

        let poller = PollerSettings {
            url: self.position_url.clone(),
            position_field: self.position_field.clone(),
            retry: RetryPolicy::new(
                bounded_secs(self.position_timeout_secs),
                self.position_attempts,
                retry_delay,
            ),
            interval: bounded_secs(self.poll_interval_secs),
        };

        let backdrop = BackdropSettings {
            url: self.backdrop_url.clone(),
            retry: RetryPolicy::new(
                bounded_secs(self.backdrop_timeout_secs),
                self.backdrop_attempts,
                retry_delay,
            ),
            max_width: self.backdrop_max_width.clamp(1, MAX_BACKDROP_WIDTH),
            max_height: self.backdrop_max_height.clamp(1, MAX_BACKDROP_HEIGHT),
        };

        let crew = (!self.crew_url.trim().is_empty()).then(|| CrewSettings {
            url: self.crew_url.clone(),
            craft: self.crew_craft.clone(),
            ..CrewSettings::default()
        });

        let marker = MarkerStyle {
            radius: self.marker_radius,
            object_name: self.object_name.clone(),
            ..MarkerStyle::default()
        };

        TrackerSettings {
            poller,
            backdrop,
            crew,
            marker,
        }
    }
}

fn bounded_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(1, MAX_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();

        let config: AppConfig = confy::load_path(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.object_name, "ISS");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval_secs = 30\nobject_name = \"Tiangong\"\n").unwrap();

        let config: AppConfig = confy::load_path(&path).unwrap();
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.object_name, "Tiangong");
        assert_eq!(config.position_attempts, 2);
        assert_eq!(config.backdrop_max_width, 800);
    }

    #[test]
    fn test_store_then_load_preserves_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = AppConfig {
            marker_radius: 6,
            crew_url: String::new(),
            ..AppConfig::default()
        };

        confy::store_path(&path, &config).unwrap();
        let loaded: AppConfig = confy::load_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_tracker_settings_mapping() {
        let config = AppConfig {
            poll_interval_secs: 15,
            position_attempts: 3,
            retry_delay_ms: 250,
            backdrop_max_width: 1024,
            backdrop_max_height: 512,
            ..AppConfig::default()
        };

        let settings = config.tracker_settings();
        assert_eq!(settings.poller.interval, Duration::from_secs(15));
        assert_eq!(settings.poller.retry.max_attempts, 3);
        assert_eq!(settings.poller.retry.retry_delay, Duration::from_millis(250));
        assert_eq!(settings.poller.position_field, "iss_position");
        assert_eq!(settings.backdrop.max_width, 1024);
        assert_eq!(settings.backdrop.max_height, 512);
        assert_eq!(settings.marker.object_name, "ISS");
        assert_eq!(settings.crew.as_ref().unwrap().craft, "ISS");
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let config = AppConfig {
            poll_interval_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.tracker_settings().poller.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_huge_values_are_capped() {
        let config = AppConfig {
            poll_interval_secs: u64::MAX,
            position_timeout_secs: u64::MAX,
            retry_delay_ms: u64::MAX,
            backdrop_max_width: u32::MAX,
            backdrop_max_height: u32::MAX,
            ..AppConfig::default()
        };

        let settings = config.tracker_settings();
        assert_eq!(settings.poller.interval, Duration::from_secs(MAX_SECS));
        assert_eq!(settings.poller.retry.timeout, Duration::from_secs(MAX_SECS));
        assert_eq!(settings.poller.retry.retry_delay, Duration::from_secs(MAX_SECS));
        assert_eq!(settings.backdrop.max_width, MAX_BACKDROP_WIDTH);
        assert_eq!(settings.backdrop.max_height, MAX_BACKDROP_HEIGHT);
    }

    #[test]
    fn test_blank_crew_url_disables_roster() {
        let config = AppConfig {
            crew_url: "  ".to_string(),
            ..AppConfig::default()
        };
        assert!(config.tracker_settings().crew.is_none());
    }
}
