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

//! Bounded-retry GET for JSON and binary payloads.
//!
//! The [`Fetcher`] holds an explicit [`Transport`] so tests can substitute
//! the network without touching global state. Every attempt is bounded by a
//! hard timeout, attempts are separated by a fixed delay, and a
//! [`CancellationToken`] is consulted before each attempt and while waiting
//! between attempts.

mod http;

pub use http::{HttpTransport, USER_AGENT};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::error::{FetchOutcome, NetworkError, TelemetryError};

/// Future returned by [`Transport::get`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<u8>, NetworkError>> + Send + 'a>>;

/// A single GET round trip.
///
/// Implementations perform exactly one request and never retry on their own.
pub trait Transport: Send + Sync {
    /// Fetch the body at `url`, giving up after `timeout`.
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> TransportFuture<'a>;
}

/// Attempt budget for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Hard limit for a single attempt.
    pub timeout: Duration,
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(timeout: Duration, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            timeout,
            max_attempts,
            retry_delay,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(8), 2, Duration::from_secs(1))
    }
}

/// GET with bounded retries over a pluggable transport.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}

impl Fetcher {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetcher backed by the production HTTP client.
    pub fn http() -> Result<Self, TelemetryError> {
        Ok(Self::new(Arc::new(HttpTransport::new()?)))
    }

    /// Fetch raw bytes.
    pub async fn fetch_bytes(
        &self,
        url: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> FetchOutcome<Vec<u8>> {
        self.fetch_with(url, policy, cancel, Ok).await
    }

    /// Fetch and parse a JSON document.
    ///
    /// A body that fails to parse counts as a failed attempt.
    pub async fn fetch_json(
        &self,
        url: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> FetchOutcome<serde_json::Value> {
        self.fetch_with(url, policy, cancel, |body| {
            serde_json::from_slice(&body).map_err(|e| TelemetryError::Decode(e.to_string()))
        })
        .await
    }

    async fn fetch_with<T, F>(
        &self,
        url: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
        decode: F,
    ) -> FetchOutcome<T>
    where
        F: Fn(Vec<u8>) -> FetchOutcome<T>,
    {
        let attempts = policy.attempts();
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                debug!("GET {} cancelled before attempt {}", url, attempt);
                return Err(TelemetryError::Cancelled);
            }

            let result = match timeout(policy.timeout, self.transport.get(url, policy.timeout)).await {
                Ok(Ok(body)) => decode(body),
                Ok(Err(e)) => Err(e.into()),
                Err(_elapsed) => Err(NetworkError::Timeout(policy.timeout).into()),
            };

            match result {
                Ok(value) => {
                    debug!("GET {} succeeded on attempt {}/{}", url, attempt, attempts);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("GET {} failed (attempt {}/{}): {}", url, attempt, attempts, e);
                    if attempt >= attempts {
                        return Err(e);
                    }
                }
            }

            attempt += 1;

            tokio::select! {
                () = sleep(policy.retry_delay) => {}
                () = cancel.cancelled() => {
                    debug!("GET {} cancelled during retry delay", url);
                    return Err(TelemetryError::Cancelled);
                }
            }
        }
    }
}
