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

//! Timer-driven, single-flight position polling.
//!
//! The poller lives on the presentation thread. Each timer tick either starts
//! one background fetch or, if a fetch is still in flight, is dropped. The
//! completion comes back through the dispatch bridge and is applied with
//! [`PositionPoller::complete`], which is also what clears the in-flight flag.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::dispatch::{spawn_worker, DispatchSender, Update};
use crate::error::{FetchOutcome, TelemetryError};
use crate::fetch::{Fetcher, RetryPolicy};
use crate::position::{decode_position, Position};

/// open-notify's current ISS position.
pub const DEFAULT_POSITION_URL: &str = "http://api.open-notify.org/iss-now.json";

/// Key of the position object in the open-notify payload.
pub const DEFAULT_POSITION_FIELD: &str = "iss_position";

/// Where and how often to poll.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub url: String,
    /// Key of the object holding `latitude` and `longitude`.
    pub position_field: String,
    pub retry: RetryPolicy,
    pub interval: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_POSITION_URL.to_string(),
            position_field: DEFAULT_POSITION_FIELD.to_string(),
            retry: RetryPolicy::new(Duration::from_secs(6), 2, Duration::from_secs(1)),
            interval: Duration::from_secs(10),
        }
    }
}

/// Fixed-rate timer driven by the caller's clock.
///
/// The first tick is due as soon as the timer starts. Ticks missed while the
/// caller was not polling are skipped rather than delivered in a burst.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl IntervalTimer {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns `true` once per elapsed period.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                // An interval past the end of the clock's range means no further tick.
                self.next_due = match due.checked_add(self.interval) {
                    Some(next) if next > now => Some(next),
                    _ => now.checked_add(self.interval),
                };
                true
            }
            _ => false,
        }
    }

    /// Time left until the next tick, or `None` when stopped.
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

/// State owned by the poller on the presentation thread.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerState {
    pub last_position: Option<Position>,
    /// Single-flight guard.
    pub is_fetching: bool,
    pub status_text: String,
}

impl Default for PollerState {
    fn default() -> Self {
        Self {
            last_position: None,
            is_fetching: false,
            status_text: "Waiting for first position".to_string(),
        }
    }
}

/// Running totals for the status pane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub fetches_started: u64,
    pub fetches_succeeded: u64,
    pub fetches_failed: u64,
    pub ticks_dropped: u64,
}

/// What a timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer has not elapsed.
    NotDue,
    /// A background fetch was started.
    Started,
    /// A fetch was already in flight (or the poller is torn down); nothing was queued.
    Dropped,
}

/// Fetch the position payload and validate it. Runs on a worker thread.
pub async fn fetch_position(
    fetcher: &Fetcher,
    settings: &PollerSettings,
    cancel: &CancellationToken,
) -> FetchOutcome<Position> {
    let payload = fetcher.fetch_json(&settings.url, &settings.retry, cancel).await?;
    decode_position(&payload, &settings.position_field)
}

/// Periodic, single-flight position fetcher.
#[derive(Debug)]
pub struct PositionPoller {
    settings: PollerSettings,
    fetcher: Fetcher,
    timer: IntervalTimer,
    state: PollerState,
    stats: PollerStats,
    dispatch: DispatchSender,
    cancel: CancellationToken,
}

impl PositionPoller {
    #[must_use]
    pub fn new(
        fetcher: Fetcher,
        settings: PollerSettings,
        dispatch: DispatchSender,
        cancel: CancellationToken,
    ) -> Self {
        let timer = IntervalTimer::new(settings.interval);
        Self {
            settings,
            fetcher,
            timer,
            state: PollerState::default(),
            stats: PollerStats::default(),
            dispatch,
            cancel,
        }
    }

    /// Start the timer; the first tick is due immediately.
    pub fn start(&mut self, now: Instant) {
        info!(
            "Polling {} every {}s",
            self.settings.url,
            self.settings.interval.as_secs()
        );
        self.timer.start(now);
    }

    pub fn stop(&mut self) {
        self.timer.stop();
    }

    /// Drive the timer. Starts a fetch when a tick is due.
    pub fn on_timer(&mut self, now: Instant) -> TickOutcome {
        if self.timer.poll(now) {
            self.tick()
        } else {
            TickOutcome::NotDue
        }
    }

    /// Handle one tick: start a fetch unless one is already in flight.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state.is_fetching {
            debug!("Position fetch still in flight, dropping tick");
            self.stats.ticks_dropped += 1;
            return TickOutcome::Dropped;
        }
        if self.cancel.is_cancelled() {
            return TickOutcome::Dropped;
        }

        self.state.is_fetching = true;

        let fetcher = self.fetcher.clone();
        let settings = self.settings.clone();
        let token = self.cancel.clone();
        let spawned = spawn_worker(
            "position-poller",
            self.cancel.clone(),
            self.dispatch.clone(),
            async move { fetch_position(&fetcher, &settings, &token).await },
            Update::PositionFetched,
        );

        if !spawned {
            self.state.is_fetching = false;
            self.state.status_text = "Position fetch could not be started".to_string();
            return TickOutcome::Dropped;
        }

        self.stats.fetches_started += 1;
        TickOutcome::Started
    }

    /// Apply a finished fetch. Returns `true` if the position changed.
    ///
    /// Failures only touch the status text; the last good position is kept.
    pub fn complete(&mut self, outcome: FetchOutcome<Position>) -> bool {
        self.state.is_fetching = false;

        match outcome {
            Ok(position) => {
                debug!("Position updated: {}", position);
                self.stats.fetches_succeeded += 1;
                self.state.last_position = Some(position);
                self.state.status_text = "Position updated".to_string();
                true
            }
            Err(TelemetryError::Cancelled) => {
                self.state.status_text = "Position fetch cancelled".to_string();
                false
            }
            Err(TelemetryError::Validation(detail)) => {
                warn!("Position payload rejected: {}", detail);
                self.stats.fetches_failed += 1;
                self.state.status_text = format!("Position payload invalid: {detail}");
                false
            }
            Err(e) => {
                warn!("Position fetch failed: {}", e);
                self.stats.fetches_failed += 1;
                self.state.status_text = format!("Position unavailable (temporary): {e}");
                false
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> &PollerState {
        &self.state
    }

    #[must_use]
    pub fn last_position(&self) -> Option<&Position> {
        self.state.last_position.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> PollerStats {
        self.stats
    }

    #[must_use]
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.timer.time_until_due(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{channel, DispatchReceiver};
    use crate::testing::{quick_policy, ScriptedTransport};
    use chrono::Utc;
    use std::sync::Arc;

    const WAIT: Duration = Duration::from_secs(5);

    fn poller(transport: Arc<ScriptedTransport>, field: &str) -> (PositionPoller, DispatchReceiver) {
        let (sender, receiver) = channel();
        let settings = PollerSettings {
            url: "http://test/position".to_string(),
            position_field: field.to_string(),
            retry: quick_policy(2),
            interval: Duration::from_secs(10),
        };
        let poller = PositionPoller::new(
            Fetcher::new(transport),
            settings,
            sender,
            CancellationToken::new(),
        );
        (poller, receiver)
    }

    fn next_outcome(receiver: &DispatchReceiver) -> FetchOutcome<Position> {
        match receiver.recv_timeout(WAIT) {
            Some(Update::PositionFetched(outcome)) => outcome,
            other => panic!("expected a position update, got {other:?}"),
        }
    }

    #[test]
    fn test_ticks_while_fetching_are_dropped() {
        let transport = Arc::new(ScriptedTransport::json(
            r#"{"iss_position": {"latitude": "1.0", "longitude": "2.0"}}"#,
        ));
        let (mut poller, receiver) = poller(transport.clone(), "iss_position");

        assert_eq!(poller.tick(), TickOutcome::Started);
        assert!(poller.state().is_fetching);
        assert_eq!(poller.tick(), TickOutcome::Dropped);
        assert_eq!(poller.tick(), TickOutcome::Dropped);

        let outcome = next_outcome(&receiver);
        assert!(receiver.recv_timeout(Duration::from_millis(200)).is_none());
        assert_eq!(transport.calls(), 1);
        assert_eq!(poller.stats().ticks_dropped, 2);

        assert!(poller.complete(outcome));
        assert!(!poller.state().is_fetching);
        assert_eq!(poller.tick(), TickOutcome::Started);
        let _ = next_outcome(&receiver);
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn test_successful_fetch_updates_position_and_status() {
        let transport = Arc::new(ScriptedTransport::json(
            r#"{"iss_position": {"latitude": "-33.9", "longitude": "18.4"}, "timestamp": 1700000000}"#,
        ));
        let (mut poller, receiver) = poller(transport, "iss_position");

        poller.tick();
        assert!(poller.complete(next_outcome(&receiver)));

        let position = poller.last_position().unwrap();
        assert!((position.latitude() - -33.9).abs() < 1e-9);
        assert!((position.longitude() - 18.4).abs() < 1e-9);
        assert_eq!(poller.state().status_text, "Position updated");
        assert_eq!(poller.stats().fetches_succeeded, 1);
    }

    #[test]
    fn test_validation_failure_keeps_last_position() {
        let transport = Arc::new(ScriptedTransport::json(r#"{"position": {"latitude": "10.5"}}"#));
        let (mut poller, receiver) = poller(transport, "position");

        let known = Position::new(12.0, 34.0, Utc::now()).unwrap();
        poller.complete(Ok(known));

        poller.tick();
        let outcome = next_outcome(&receiver);
        assert!(matches!(outcome, Err(TelemetryError::Validation(_))));
        assert!(!poller.complete(outcome));

        assert_eq!(poller.last_position(), Some(&known));
        assert!(!poller.state().is_fetching);
        assert!(poller.state().status_text.starts_with("Position payload invalid"));
        assert!(poller.state().status_text.contains("longitude"));
    }

    #[test]
    fn test_network_failure_only_updates_status() {
        let transport = Arc::new(ScriptedTransport::failing());
        let (mut poller, receiver) = poller(transport.clone(), "iss_position");

        poller.tick();
        let outcome = next_outcome(&receiver);
        assert!(matches!(outcome, Err(TelemetryError::Network(_))));
        assert!(!poller.complete(outcome));

        assert!(poller.last_position().is_none());
        assert!(poller.state().status_text.starts_with("Position unavailable"));
        assert_eq!(poller.stats().fetches_failed, 1);
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn test_timer_drives_ticks() {
        let transport = Arc::new(ScriptedTransport::failing());
        let (mut poller, _receiver) = poller(transport, "iss_position");
        let t0 = Instant::now();

        assert_eq!(poller.on_timer(t0), TickOutcome::NotDue);
        poller.start(t0);
        assert_eq!(poller.on_timer(t0), TickOutcome::Started);
        assert_eq!(poller.on_timer(t0 + Duration::from_secs(1)), TickOutcome::NotDue);
        assert_eq!(poller.on_timer(t0 + Duration::from_secs(10)), TickOutcome::Dropped);
        assert_eq!(
            poller.time_until_next_tick(t0 + Duration::from_secs(12)),
            Some(Duration::from_secs(8))
        );
    }

    #[test]
    fn test_interval_timer_skips_missed_ticks() {
        let mut timer = IntervalTimer::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(!timer.poll(t0));

        timer.start(t0);
        assert!(timer.is_running());
        assert!(timer.poll(t0));
        assert!(!timer.poll(t0 + Duration::from_secs(9)));
        assert!(timer.poll(t0 + Duration::from_secs(35)));
        assert!(!timer.poll(t0 + Duration::from_secs(40)));
        assert!(timer.poll(t0 + Duration::from_secs(45)));

        timer.stop();
        assert!(!timer.poll(t0 + Duration::from_secs(100)));
        assert_eq!(timer.time_until_due(t0), None);
    }

    #[test]
    fn test_unrepresentable_interval_fires_once_then_stops() {
        let mut timer = IntervalTimer::new(Duration::from_secs(u64::MAX));
        let t0 = Instant::now();
        timer.start(t0);

        assert!(timer.poll(t0));
        assert!(!timer.poll(t0 + Duration::from_secs(3600)));
        assert!(!timer.is_running());
        assert_eq!(timer.time_until_due(t0), None);
    }
}
