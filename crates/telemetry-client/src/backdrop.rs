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

//! One-shot backdrop image load and in-memory cache.
//!
//! The backdrop is fetched exactly once per cache. A failed load installs a
//! blank canvas of the configured size and is never retried; recovery means
//! building a new cache.

use std::sync::Arc;

use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::dispatch::{spawn_worker, DispatchSender, Update};
use crate::error::{FetchOutcome, TelemetryError};
use crate::fetch::{Fetcher, RetryPolicy};

/// NASA Blue Marble topography and bathymetry, December 2004.
pub const DEFAULT_BACKDROP_URL: &str = "https://eoimages.gsfc.nasa.gov/images/imagerecords/74000/74420/world.topo.bathy.200412.3x5400x2700.jpg";

/// Largest canvas a cache will allocate, the size of the default image.
pub const MAX_BACKDROP_WIDTH: u32 = 5400;
pub const MAX_BACKDROP_HEIGHT: u32 = 2700;

const BLANK_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// An RGB canvas that frames are composited onto.
#[derive(Debug, Clone, PartialEq)]
pub struct Backdrop {
    image: RgbImage,
    ready: bool,
}

impl Backdrop {
    /// Wrap an image that was successfully loaded.
    #[must_use]
    pub fn from_image(image: RgbImage) -> Self {
        Self { image, ready: true }
    }

    /// A black canvas used before loading completes or after it fails.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, BLANK_COLOR),
            ready: false,
        }
    }

    /// Decode image bytes and shrink them to fit within `max_width` x
    /// `max_height`, keeping the aspect ratio. Smaller images are kept as is.
    pub fn decode(bytes: &[u8], max_width: u32, max_height: u32) -> Result<Self, TelemetryError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| TelemetryError::Decode(format!("backdrop image: {e}")))?;

        let (max_width, max_height) = (max_width.max(1), max_height.max(1));
        let image = if image.width() > max_width || image.height() > max_height {
            image.resize(max_width, max_height, FilterType::Lanczos3)
        } else {
            image
        };

        Ok(Self::from_image(image.to_rgb8()))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether this canvas holds a downloaded image rather than the blank fallback.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// Where to fetch the backdrop and how large it may be displayed.
#[derive(Debug, Clone)]
pub struct BackdropSettings {
    pub url: String,
    pub retry: RetryPolicy,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for BackdropSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKDROP_URL.to_string(),
            retry: RetryPolicy::new(
                std::time::Duration::from_secs(10),
                2,
                std::time::Duration::from_secs(1),
            ),
            max_width: 800,
            max_height: 400,
        }
    }
}

/// Fetch and decode the backdrop. Runs on a worker thread.
pub async fn load_backdrop(
    fetcher: &Fetcher,
    settings: &BackdropSettings,
    cancel: &CancellationToken,
) -> FetchOutcome<Backdrop> {
    let bytes = fetcher.fetch_bytes(&settings.url, &settings.retry, cancel).await?;
    Backdrop::decode(&bytes, settings.max_width, settings.max_height)
}

/// Presentation-side owner of the backdrop.
#[derive(Debug)]
pub struct BackdropCache {
    settings: BackdropSettings,
    placeholder: Arc<Backdrop>,
    loaded: Option<Arc<Backdrop>>,
    load_started: bool,
    status: String,
}

impl BackdropCache {
    /// Dimensions outside `1..=MAX_BACKDROP_*` are clamped.
    #[must_use]
    pub fn new(mut settings: BackdropSettings) -> Self {
        settings.max_width = settings.max_width.clamp(1, MAX_BACKDROP_WIDTH);
        settings.max_height = settings.max_height.clamp(1, MAX_BACKDROP_HEIGHT);
        let placeholder = Arc::new(Backdrop::blank(settings.max_width, settings.max_height));
        Self {
            settings,
            placeholder,
            loaded: None,
            load_started: false,
            status: "Backdrop loading".to_string(),
        }
    }

    /// Start the single background load.
    ///
    /// Returns `false` if a load was already started for this cache; the
    /// backdrop is never fetched twice.
    pub fn load_async(
        &mut self,
        fetcher: &Fetcher,
        cancel: &CancellationToken,
        sender: &DispatchSender,
    ) -> bool {
        if self.load_started {
            debug!("Backdrop load already issued, ignoring request");
            return false;
        }
        self.load_started = true;

        info!("Loading backdrop from {}", self.settings.url);

        let fetcher = fetcher.clone();
        let settings = self.settings.clone();
        let token = cancel.clone();
        let spawned = spawn_worker(
            "backdrop-loader",
            cancel.clone(),
            sender.clone(),
            async move { load_backdrop(&fetcher, &settings, &token).await },
            Update::BackdropLoaded,
        );

        if !spawned {
            self.install(Err(TelemetryError::Render(
                "backdrop worker could not be started".to_string(),
            )));
        }

        true
    }

    /// Apply the result of the load. Only the first result is accepted.
    pub fn install(&mut self, outcome: FetchOutcome<Backdrop>) -> bool {
        if self.loaded.is_some() {
            warn!("Backdrop already settled, ignoring late result");
            return false;
        }

        match outcome {
            Ok(backdrop) => {
                info!("Backdrop loaded ({}x{})", backdrop.width(), backdrop.height());
                self.status = format!("Backdrop loaded ({}x{})", backdrop.width(), backdrop.height());
                self.loaded = Some(Arc::new(backdrop));
            }
            Err(e) => {
                warn!("Backdrop load failed: {}", e);
                self.status = format!("Backdrop unavailable ({e}), using blank canvas");
                self.loaded = Some(Arc::clone(&self.placeholder));
            }
        }

        true
    }

    /// The backdrop to composite onto right now.
    #[must_use]
    pub fn current(&self) -> Arc<Backdrop> {
        self.loaded
            .as_ref()
            .map_or_else(|| Arc::clone(&self.placeholder), Arc::clone)
    }

    /// Whether the one-shot load has completed, successfully or not.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.loaded.is_some()
    }

    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::channel;
    use crate::testing::{png_bytes, quick_policy, ScriptedTransport};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn settings() -> BackdropSettings {
        BackdropSettings {
            url: "http://test/world.png".to_string(),
            retry: quick_policy(2),
            max_width: 800,
            max_height: 400,
        }
    }

    #[test]
    fn test_decode_downsamples_to_fit() {
        let backdrop = Backdrop::decode(&png_bytes(1600, 800, [10, 20, 30]), 800, 400).unwrap();
        assert_eq!((backdrop.width(), backdrop.height()), (800, 400));
        assert!(backdrop.is_ready());

        let tall = Backdrop::decode(&png_bytes(400, 800, [10, 20, 30]), 800, 400).unwrap();
        assert_eq!((tall.width(), tall.height()), (200, 400));
    }

    #[test]
    fn test_decode_never_upscales() {
        let backdrop = Backdrop::decode(&png_bytes(320, 160, [1, 2, 3]), 800, 400).unwrap();
        assert_eq!((backdrop.width(), backdrop.height()), (320, 160));
        assert_eq!(backdrop.image().get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = Backdrop::decode(b"<html>not an image</html>", 800, 400).unwrap_err();
        assert!(matches!(err, TelemetryError::Decode(_)));
    }

    #[test]
    fn test_serves_blank_until_settled() {
        let cache = BackdropCache::new(settings());
        let current = cache.current();
        assert!(!cache.is_settled());
        assert!(!current.is_ready());
        assert_eq!((current.width(), current.height()), (800, 400));
    }

    #[test]
    fn test_oversized_canvas_is_clamped() {
        let cache = BackdropCache::new(BackdropSettings {
            max_width: u32::MAX,
            max_height: 0,
            ..settings()
        });
        let current = cache.current();
        assert_eq!((current.width(), current.height()), (MAX_BACKDROP_WIDTH, 1));
    }

    #[test]
    fn test_successful_load_is_cached() {
        let transport = std::sync::Arc::new(ScriptedTransport::always(Ok(png_bytes(1600, 800, [0, 90, 200]))));
        let fetcher = Fetcher::new(transport.clone());
        let (sender, receiver) = channel();
        let mut cache = BackdropCache::new(settings());

        assert!(cache.load_async(&fetcher, &CancellationToken::new(), &sender));
        let Some(Update::BackdropLoaded(outcome)) = receiver.recv_timeout(WAIT) else {
            panic!("backdrop load did not complete");
        };
        assert!(cache.install(outcome));

        let current = cache.current();
        assert!(current.is_ready());
        assert_eq!((current.width(), current.height()), (800, 400));
        assert_eq!(transport.calls(), 1);
        assert!(cache.status().starts_with("Backdrop loaded"));
    }

    #[test]
    fn test_failed_load_falls_back_and_never_retries() {
        let transport = std::sync::Arc::new(ScriptedTransport::failing());
        let fetcher = Fetcher::new(transport.clone());
        let (sender, receiver) = channel();
        let cancel = CancellationToken::new();
        let mut cache = BackdropCache::new(settings());

        assert!(cache.load_async(&fetcher, &cancel, &sender));
        let Some(Update::BackdropLoaded(outcome)) = receiver.recv_timeout(WAIT) else {
            panic!("backdrop load did not complete");
        };
        assert!(outcome.is_err());
        assert!(cache.install(outcome));

        let current = cache.current();
        assert!(cache.is_settled());
        assert!(!current.is_ready());
        assert_eq!((current.width(), current.height()), (800, 400));
        assert!(cache.status().contains("blank canvas"));

        // Further requests are refused and nothing else is fetched.
        assert!(!cache.load_async(&fetcher, &cancel, &sender));
        assert!(receiver.recv_timeout(Duration::from_millis(200)).is_none());
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn test_second_install_is_ignored() {
        let mut cache = BackdropCache::new(settings());
        assert!(cache.install(Err(TelemetryError::Cancelled)));
        assert!(!cache.install(Ok(Backdrop::from_image(RgbImage::new(4, 4)))));
        assert!(!cache.current().is_ready());
    }
}
