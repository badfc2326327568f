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

//! Lifecycle owner for one tracking view.
//!
//! [`TabController`] wires the backdrop cache, position poller, crew roster,
//! and dispatch bridge together. All of its methods run on the presentation
//! thread; background work only reaches it through [`TabController::pump`].

use std::time::{Duration, Instant};

use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use crate::backdrop::{BackdropCache, BackdropSettings};
use crate::compositor::{compose, MarkerStyle, RenderedFrame};
use crate::crew::{CrewRoster, CrewSettings};
use crate::dispatch::{channel, channel_with_waker, DispatchReceiver, DispatchSender, Update};
use crate::error::TelemetryError;
use crate::fetch::Fetcher;
use crate::poller::{PollerSettings, PollerState, PollerStats, PositionPoller, TickOutcome};

/// Everything a tracking view needs to know.
#[derive(Debug, Clone, Default)]
pub struct TrackerSettings {
    pub poller: PollerSettings,
    pub backdrop: BackdropSettings,
    /// `None` disables the crew roster.
    pub crew: Option<CrewSettings>,
    pub marker: MarkerStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// A human-readable status line produced while applying updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub level: StatusLevel,
    pub message: String,
}

impl StatusChange {
    fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// What one call to [`TabController::pump`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpReport {
    pub status_changes: Vec<StatusChange>,
    /// The next [`TabController::frame`] will be freshly composited.
    pub frame_dirty: bool,
    pub tick: TickOutcome,
}

/// Owns the components of one tracking view and their lifetimes.
#[derive(Debug)]
pub struct TabController {
    fetcher: Fetcher,
    cancel: CancellationToken,
    sender: DispatchSender,
    receiver: DispatchReceiver,
    backdrop: BackdropCache,
    poller: PositionPoller,
    crew: Option<CrewRoster>,
    marker: MarkerStyle,
    frame: Option<RenderedFrame>,
    frame_dirty: bool,
    frame_generation: u64,
    started: bool,
}

impl TabController {
    #[must_use]
    pub fn new(fetcher: Fetcher, settings: TrackerSettings) -> Self {
        let (sender, receiver) = channel();
        Self::with_channel(fetcher, settings, sender, receiver)
    }

    /// Like [`TabController::new`], calling `waker` whenever background work
    /// posts a result.
    #[must_use]
    pub fn with_waker(
        fetcher: Fetcher,
        settings: TrackerSettings,
        waker: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let (sender, receiver) = channel_with_waker(waker);
        Self::with_channel(fetcher, settings, sender, receiver)
    }

    fn with_channel(
        fetcher: Fetcher,
        settings: TrackerSettings,
        sender: DispatchSender,
        receiver: DispatchReceiver,
    ) -> Self {
        let cancel = CancellationToken::new();
        let poller = PositionPoller::new(
            fetcher.clone(),
            settings.poller,
            sender.clone(),
            cancel.clone(),
        );

        Self {
            fetcher,
            cancel,
            sender,
            receiver,
            backdrop: BackdropCache::new(settings.backdrop),
            poller,
            crew: settings.crew.map(CrewRoster::new),
            marker: settings.marker,
            frame: None,
            frame_dirty: true,
            frame_generation: 0,
            started: false,
        }
    }

    /// Issue the one-shot loads and start the poll timer.
    ///
    /// Returns `false` if already started or torn down.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started || self.cancel.is_cancelled() {
            return false;
        }
        self.started = true;

        info!("Starting tracker for {}", self.marker.object_name);
        self.backdrop.load_async(&self.fetcher, &self.cancel, &self.sender);
        if let Some(crew) = &mut self.crew {
            crew.load_async(&self.fetcher, &self.cancel, &self.sender);
        }
        self.poller.start(now);
        true
    }

    /// Apply every pending background result, then let the timer fire.
    pub fn pump(&mut self, now: Instant) -> PumpReport {
        let mut report = PumpReport {
            status_changes: Vec::new(),
            frame_dirty: false,
            tick: TickOutcome::NotDue,
        };

        let updates = self.receiver.drain();
        if self.cancel.is_cancelled() {
            if !updates.is_empty() {
                debug!("Discarding {} update(s) after shutdown", updates.len());
            }
            report.frame_dirty = self.frame_dirty;
            return report;
        }
        for update in updates {
            self.apply(update, &mut report);
        }

        if self.started {
            report.tick = self.poller.on_timer(now);
        }

        report.frame_dirty = self.frame_dirty;
        report
    }

    fn apply(&mut self, update: Update, report: &mut PumpReport) {
        match update {
            Update::BackdropLoaded(outcome) => {
                let level = if outcome.is_ok() {
                    StatusLevel::Info
                } else {
                    StatusLevel::Warning
                };
                if self.backdrop.install(outcome) {
                    self.frame_dirty = true;
                    report
                        .status_changes
                        .push(StatusChange::new(level, self.backdrop.status()));
                }
            }
            Update::PositionFetched(outcome) => {
                // Every failure is reported; a success only when the status text changes.
                let previous = self.poller.state().status_text.clone();
                let failed = matches!(&outcome, Err(e) if *e != TelemetryError::Cancelled);
                let level = match &outcome {
                    Ok(_) | Err(TelemetryError::Cancelled) => StatusLevel::Info,
                    Err(TelemetryError::Network(_)) => StatusLevel::Warning,
                    Err(_) => StatusLevel::Error,
                };
                if self.poller.complete(outcome) {
                    self.frame_dirty = true;
                }
                let current = &self.poller.state().status_text;
                if failed || *current != previous {
                    report
                        .status_changes
                        .push(StatusChange::new(level, current.clone()));
                }
            }
            Update::CrewLoaded(outcome) => {
                if let Some(crew) = &mut self.crew {
                    let level = if outcome.is_ok() {
                        StatusLevel::Info
                    } else {
                        StatusLevel::Warning
                    };
                    let message = crew.install(outcome);
                    report.status_changes.push(StatusChange::new(level, message));
                }
            }
        }
    }

    /// The latest frame, composited again only if something changed.
    pub fn frame(&mut self) -> Result<&RenderedFrame, TelemetryError> {
        if self.frame_dirty || self.frame.is_none() {
            let backdrop = self.backdrop.current();
            let rendered = compose(&backdrop, self.poller.last_position(), &self.marker)
                .inspect_err(|e| error!("Compositing failed: {}", e))?;
            self.frame = Some(rendered);
            self.frame_dirty = false;
            self.frame_generation += 1;
        }

        self.frame
            .as_ref()
            .ok_or_else(|| TelemetryError::Render("no frame composited".to_string()))
    }

    /// Increments every time [`TabController::frame`] composites a new frame.
    #[must_use]
    pub fn frame_generation(&self) -> u64 {
        self.frame_generation
    }

    #[must_use]
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.poller.time_until_next_tick(now)
    }

    #[must_use]
    pub fn poller_state(&self) -> &PollerState {
        self.poller.state()
    }

    #[must_use]
    pub fn poller_stats(&self) -> PollerStats {
        self.poller.stats()
    }

    #[must_use]
    pub fn backdrop(&self) -> &BackdropCache {
        &self.backdrop
    }

    #[must_use]
    pub fn crew(&self) -> Option<&CrewRoster> {
        self.crew.as_ref()
    }

    #[must_use]
    pub fn object_name(&self) -> &str {
        &self.marker.object_name
    }

    /// Stop the timer and cancel outstanding work. Late results are dropped.
    pub fn shutdown(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!("Shutting down tracker for {}", self.marker.object_name);
        self.poller.stop();
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for TabController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
