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

//! Scripted transports and fixtures for unit tests.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use tokio_util::sync::CancellationToken;

use crate::error::NetworkError;
use crate::fetch::{RetryPolicy, Transport, TransportFuture};

type Response = Result<Vec<u8>, NetworkError>;

/// Policy with a short timeout and no delay between attempts.
pub(crate) fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(500), max_attempts, Duration::ZERO)
}

/// Replays queued responses, then repeats a fallback forever.
pub(crate) struct ScriptedTransport {
    queue: Mutex<VecDeque<Response>>,
    fallback: Response,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn sequence(responses: Vec<Response>, fallback: Response) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn always(response: Response) -> Self {
        Self::sequence(Vec::new(), response)
    }

    pub(crate) fn failing() -> Self {
        Self::always(Err(NetworkError::Connect("connection refused".to_string())))
    }

    pub(crate) fn json(body: &str) -> Self {
        Self::always(Ok(body.as_bytes().to_vec()))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn get<'a>(&'a self, _url: &'a str, _timeout: Duration) -> TransportFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { next })
    }
}

/// Fails every attempt and cancels the token on the first call.
pub(crate) struct CancellingTransport {
    token: CancellationToken,
    calls: AtomicUsize,
}

impl CancellingTransport {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self {
            token,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for CancellingTransport {
    fn get<'a>(&'a self, _url: &'a str, _timeout: Duration) -> TransportFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
        Box::pin(async { Err(NetworkError::Status(503)) })
    }
}

/// Never answers within any reasonable timeout.
pub(crate) struct StallingTransport;

impl Transport for StallingTransport {
    fn get<'a>(&'a self, _url: &'a str, _timeout: Duration) -> TransportFuture<'a> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        })
    }
}

/// Answers by URL and counts calls per URL. Unknown URLs get a 404.
pub(crate) struct RoutedTransport {
    routes: HashMap<String, Response>,
    calls: Mutex<HashMap<String, usize>>,
}

impl RoutedTransport {
    pub(crate) fn new(routes: Vec<(&str, Response)>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(url, response)| (url.to_string(), response))
                .collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

impl Transport for RoutedTransport {
    fn get<'a>(&'a self, url: &'a str, _timeout: Duration) -> TransportFuture<'a> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        let response = self
            .routes
            .get(url)
            .cloned()
            .unwrap_or(Err(NetworkError::Status(404)));
        Box::pin(async move { response })
    }
}

/// Solid-colour PNG of the given size.
pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
