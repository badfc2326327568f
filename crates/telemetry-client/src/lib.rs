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

//! Telemetry client library for tracking an orbiting object on a world map.
//!
//! The library is split into small layers that the desktop app composes:
//!
//! - **Fetch layer**: bounded-retry HTTP GET with per-attempt timeouts and
//!   cooperative cancellation ([`Fetcher`], [`RetryPolicy`])
//! - **Data layer**: position decoding and validation ([`Position`]) and the
//!   crew roster ([`CrewRoster`])
//! - **Render layer**: the one-shot backdrop cache ([`BackdropCache`]) and the
//!   marker compositor ([`compose`])
//! - **Lifecycle layer**: the single-flight poller ([`PositionPoller`]) and the
//!   per-view [`TabController`] that owns everything and applies background
//!   results on the presentation thread
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::{Duration, Instant};
//! use telemetry_client::{Fetcher, TabController, TrackerSettings};
//!
//! # fn main() -> Result<(), telemetry_client::TelemetryError> {
//! let mut controller = TabController::new(Fetcher::http()?, TrackerSettings::default());
//! controller.start(Instant::now());
//!
//! loop {
//!     let report = controller.pump(Instant::now());
//!     for change in &report.status_changes {
//!         println!("{}", change.message);
//!     }
//!     if report.frame_dirty {
//!         let frame = controller.frame()?;
//!         println!("frame {}x{}", frame.width(), frame.height());
//!     }
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! # }
//! ```

pub mod backdrop;
pub mod compositor;
pub mod controller;
pub mod crew;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod poller;
pub mod position;

#[cfg(test)]
mod testing;

pub use backdrop::{Backdrop, BackdropCache, BackdropSettings};
pub use compositor::{compose, MarkerStyle, RenderedFrame};
pub use controller::{PumpReport, StatusChange, StatusLevel, TabController, TrackerSettings};
pub use crew::{CrewRoster, CrewSettings};
pub use error::{FetchOutcome, NetworkError, TelemetryError};
pub use fetch::{Fetcher, HttpTransport, RetryPolicy, Transport};
pub use poller::{IntervalTimer, PollerSettings, PollerState, PollerStats, PositionPoller, TickOutcome};
pub use position::Position;
