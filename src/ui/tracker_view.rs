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

//! The Tracker tab: the composited map plus a read-out beneath it.

use std::time::Instant;

use log::error;
use telemetry_client::compositor::NO_DATA_LABEL;
use telemetry_client::{RenderedFrame, TabController};

/// Keeps the GPU texture in step with the controller's latest frame.
#[derive(Default)]
pub struct TrackerView {
    texture: Option<egui::TextureHandle>,
    uploaded_generation: u64,
    render_error: Option<String>,
}

impl std::fmt::Debug for TrackerView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerView")
            .field("has_texture", &self.texture.is_some())
            .field("uploaded_generation", &self.uploaded_generation)
            .finish_non_exhaustive()
    }
}

impl TrackerView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload a new texture if the controller composited a fresh frame.
    ///
    /// Returns the compositing time in milliseconds when a new frame was built.
    pub fn sync(&mut self, ctx: &egui::Context, controller: &mut TabController) -> Option<f64> {
        let started = Instant::now();
        if let Err(e) = controller.frame() {
            error!("Tracker frame unavailable: {}", e);
            self.render_error = Some(e.to_string());
            return None;
        }
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.render_error = None;

        let generation = controller.frame_generation();
        if self.texture.is_some() && generation == self.uploaded_generation {
            return None;
        }

        // Already composited above, so this only borrows the cached frame.
        let image = to_color_image(controller.frame().ok()?);
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("tracker-frame", image, egui::TextureOptions::LINEAR));
            }
        }
        self.uploaded_generation = generation;
        Some(elapsed_ms)
    }

    pub fn render(&self, ui: &mut egui::Ui, controller: &TabController) {
        let state = controller.poller_state();

        ui.horizontal(|ui| {
            let position = state
                .last_position
                .as_ref()
                .map_or_else(|| NO_DATA_LABEL.to_string(), ToString::to_string);
            ui.label(
                egui::RichText::new(format!("{} | {}", controller.object_name(), position))
                    .monospace()
                    .strong(),
            );
            ui.separator();
            ui.label(egui::RichText::new(&state.status_text).color(egui::Color32::from_rgb(180, 180, 180)));
        });

        if let Some(crew) = controller.crew() {
            ui.label(
                egui::RichText::new(format!("Crew: {}", crew.summary()))
                    .color(egui::Color32::from_rgb(150, 200, 220)),
            );
        }

        ui.separator();

        if let Some(message) = &self.render_error {
            ui.colored_label(egui::Color32::from_rgb(255, 100, 100), message);
        }

        let Some(texture) = &self.texture else {
            ui.spinner();
            return;
        };

        let size = fit_within(texture.size_vec2(), ui.available_size());
        ui.centered_and_justified(|ui| {
            ui.image((texture.id(), size));
        });
    }
}

fn to_color_image(frame: &RenderedFrame) -> egui::ColorImage {
    let size = [frame.width() as usize, frame.height() as usize];
    egui::ColorImage::from_rgb(size, frame.as_rgb_bytes())
}

/// Largest size with the image's aspect ratio that fits `available`.
fn fit_within(image: egui::Vec2, available: egui::Vec2) -> egui::Vec2 {
    if image.x <= 0.0 || image.y <= 0.0 || available.x <= 0.0 || available.y <= 0.0 {
        return egui::Vec2::ZERO;
    }
    let scale = (available.x / image.x).min(available.y / image.y);
    image * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_keeps_aspect_ratio() {
        let fitted = fit_within(egui::vec2(800.0, 400.0), egui::vec2(1000.0, 1000.0));
        assert_eq!(fitted, egui::vec2(1000.0, 500.0));

        let fitted = fit_within(egui::vec2(800.0, 400.0), egui::vec2(400.0, 100.0));
        assert_eq!(fitted, egui::vec2(200.0, 100.0));
    }

    #[test]
    fn test_fit_within_degenerate() {
        assert_eq!(fit_within(egui::vec2(0.0, 400.0), egui::vec2(100.0, 100.0)), egui::Vec2::ZERO);
        assert_eq!(fit_within(egui::vec2(800.0, 400.0), egui::vec2(0.0, 100.0)), egui::Vec2::ZERO);
    }
}
