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

//! Frame composition: backdrop plus position marker and label.
//!
//! Uses an equirectangular projection, so the backdrop is expected to span
//! the whole globe (longitude -180..180 left to right, latitude 90..-90 top
//! to bottom).

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};

use crate::backdrop::Backdrop;
use crate::error::TelemetryError;
use crate::position::Position;

/// Label drawn when no position has been received yet.
pub const NO_DATA_LABEL: &str = "no data yet";

const GLYPH_SIZE: i32 = 8;
const LABEL_PADDING: i32 = 4;

/// Marker and label appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    /// On-screen marker radius in pixels.
    pub radius: u32,
    pub fill: Rgb<u8>,
    pub outline: Rgb<u8>,
    pub outline_width: u32,
    pub label_color: Rgb<u8>,
    /// Top-left corner of the label text.
    pub label_origin: (i32, i32),
    /// Integer glyph scale for the 8x8 bitmap font.
    pub label_scale: u32,
    /// Name of the tracked object, used as the label prefix.
    pub object_name: String,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 10,
            fill: Rgb([255, 0, 0]),
            outline: Rgb([0, 0, 0]),
            outline_width: 2,
            label_color: Rgb([255, 255, 255]),
            label_origin: (20, 20),
            label_scale: 2,
            object_name: "ISS".to_string(),
        }
    }
}

/// An independently owned, immutable composited frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    image: RgbImage,
}

impl RenderedFrame {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB bytes, row-major.
    #[must_use]
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Project geographic coordinates onto a `width` x `height` canvas.
#[must_use]
pub fn project(latitude: f64, longitude: f64, width: u32, height: u32) -> (f64, f64) {
    let x = (longitude + 180.0) * (f64::from(width) / 360.0);
    let y = (90.0 - latitude) * (f64::from(height) / 180.0);
    (x, y)
}

fn clamp_axis(value: f64, extent: u32, radius: u32) -> f64 {
    let low = f64::from(radius);
    let high = f64::from(extent) - f64::from(radius);
    if low > high {
        f64::from(extent) / 2.0
    } else {
        value.clamp(low, high)
    }
}

/// Projected marker center, clamped so the whole marker stays on the canvas.
#[must_use]
pub fn marker_center(position: &Position, width: u32, height: u32, radius: u32) -> (f64, f64) {
    let (x, y) = project(position.latitude(), position.longitude(), width, height);
    (clamp_axis(x, width, radius), clamp_axis(y, height, radius))
}

/// Render `position` onto a private copy of `backdrop`.
///
/// The backdrop itself is never modified. Without a position the copy gets
/// only the [`NO_DATA_LABEL`].
pub fn compose(
    backdrop: &Backdrop,
    position: Option<&Position>,
    style: &MarkerStyle,
) -> Result<RenderedFrame, TelemetryError> {
    let (width, height) = (backdrop.width(), backdrop.height());
    if width == 0 || height == 0 {
        return Err(TelemetryError::Render(format!(
            "cannot composite onto a {width}x{height} backdrop"
        )));
    }

    let mut canvas = backdrop.image().clone();

    match position {
        Some(position) => {
            let (cx, cy) = marker_center(position, width, height, style.radius);
            draw_marker(&mut canvas, cx, cy, style);
            let label = format!("{} | {}", style.object_name, position);
            draw_label(&mut canvas, &label, style);
        }
        None => draw_label(&mut canvas, NO_DATA_LABEL, style),
    }

    Ok(RenderedFrame { image: canvas })
}

fn draw_marker(canvas: &mut RgbImage, cx: f64, cy: f64, style: &MarkerStyle) {
    let radius = f64::from(style.radius);
    let inner = (radius - f64::from(style.outline_width)).max(0.0);
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);

    let min_x = ((cx - radius).floor() as i64).max(0);
    let max_x = ((cx + radius).ceil() as i64).min(w - 1);
    let min_y = ((cy - radius).floor() as i64).max(0);
    let max_y = ((cy + radius).ceil() as i64).min(h - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance > radius {
                continue;
            }
            let color = if distance > inner { style.outline } else { style.fill };
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Halve the brightness of a rectangle so the label stays readable on any backdrop.
fn shade_rect(canvas: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    for y in y0.max(0)..y1.min(h) {
        for x in x0.max(0)..x1.min(w) {
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            for channel in &mut pixel.0 {
                *channel /= 2;
            }
        }
    }
}

fn draw_label(canvas: &mut RgbImage, text: &str, style: &MarkerStyle) {
    let scale = style.label_scale.max(1) as i32;
    let (origin_x, origin_y) = style.label_origin;
    let glyph_px = GLYPH_SIZE * scale;
    let text_width = text.chars().count() as i32 * glyph_px;

    shade_rect(
        canvas,
        origin_x - LABEL_PADDING,
        origin_y - LABEL_PADDING,
        origin_x + text_width + LABEL_PADDING,
        origin_y + glyph_px + LABEL_PADDING,
    );

    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    let mut cursor_x = origin_x;
    for ch in text.chars() {
        if let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) {
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_SIZE {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    let px = cursor_x + col * scale;
                    let py = origin_y + row as i32 * scale;
                    for sy in 0..scale {
                        for sx in 0..scale {
                            let (tx, ty) = (px + sx, py + sy);
                            if tx >= 0 && ty >= 0 && tx < w && ty < h {
                                canvas.put_pixel(tx as u32, ty as u32, style.label_color);
                            }
                        }
                    }
                }
            }
        }
        cursor_x += glyph_px;
    }
}
