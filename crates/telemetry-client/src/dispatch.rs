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

//! Cross-thread handoff from workers to the presentation thread.
//!
//! Workers never touch presentation state. They post immutable [`Update`]
//! values into a channel, and the single presentation-thread consumer drains
//! and applies them. Each asynchronous operation gets its own short-lived,
//! unpooled thread running a single-threaded runtime.

use std::future::Future;
use std::sync::mpsc;
use std::sync::Arc;

use log::{debug, error};
use tokio_util::sync::CancellationToken;

use crate::backdrop::Backdrop;
use crate::error::{FetchOutcome, NetworkError, TelemetryError};
use crate::position::Position;

/// Result values produced by background work.
#[derive(Debug)]
pub enum Update {
    /// The one-shot backdrop load finished.
    BackdropLoaded(FetchOutcome<Backdrop>),
    /// A position fetch finished, successfully or not.
    PositionFetched(FetchOutcome<Position>),
    /// The one-shot crew roster load finished.
    CrewLoaded(FetchOutcome<Vec<String>>),
}

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Producer half, cloned into every worker.
#[derive(Clone)]
pub struct DispatchSender {
    tx: mpsc::Sender<Update>,
    waker: Option<Waker>,
}

impl std::fmt::Debug for DispatchSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchSender")
            .field("has_waker", &self.waker.is_some())
            .finish_non_exhaustive()
    }
}

impl DispatchSender {
    /// Post an update and wake the presentation thread.
    ///
    /// Returns `false` if the consumer is gone; the update is dropped.
    pub fn post(&self, update: Update) -> bool {
        if self.tx.send(update).is_err() {
            debug!("Presentation side closed, dropping update");
            return false;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
        true
    }
}

/// Consumer half, owned by the presentation thread.
#[derive(Debug)]
pub struct DispatchReceiver {
    rx: mpsc::Receiver<Update>,
}

impl DispatchReceiver {
    /// Take every update that has arrived so far without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<Update> {
        self.rx.try_iter().collect()
    }

    /// Block for the next update.
    #[cfg(test)]
    pub(crate) fn recv_timeout(&self, timeout: std::time::Duration) -> Option<Update> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Create a bridge with no wake callback.
#[must_use]
pub fn channel() -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::channel();
    (DispatchSender { tx, waker: None }, DispatchReceiver { rx })
}

/// Create a bridge that calls `waker` after every post, typically to
/// request a repaint from the UI toolkit.
#[must_use]
pub fn channel_with_waker(
    waker: impl Fn() + Send + Sync + 'static,
) -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::channel();
    (
        DispatchSender {
            tx,
            waker: Some(Arc::new(waker)),
        },
        DispatchReceiver { rx },
    )
}

/// Run `task` on a dedicated worker thread and post `wrap(outcome)`.
///
/// The result is dropped if `cancel` fired while the task ran. Returns
/// `false` if the thread could not be started, in which case nothing will
/// ever be posted for this task.
pub fn spawn_worker<T, Fut, W>(
    name: &str,
    cancel: CancellationToken,
    sender: DispatchSender,
    task: Fut,
    wrap: W,
) -> bool
where
    T: Send + 'static,
    Fut: Future<Output = FetchOutcome<T>> + Send + 'static,
    W: FnOnce(FetchOutcome<T>) -> Update + Send + 'static,
{
    let thread_name = name.to_string();
    let spawned = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let outcome = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(task),
                Err(e) => {
                    error!("Worker '{}' could not start a runtime: {}", thread_name, e);
                    Err(TelemetryError::Network(NetworkError::Other(e.to_string())))
                }
            };

            if cancel.is_cancelled() {
                debug!("Worker '{}' finished after teardown, dropping result", thread_name);
                return;
            }

            sender.post(wrap(outcome));
        });

    match spawned {
        Ok(_) => true,
        Err(e) => {
            error!("Failed to spawn worker '{}': {}", name, e);
            false
        }
    }
}
