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

use crate::status::{DiagnosticLevel, SystemStatus};
use telemetry_client::TabController;

const SECTION_COLOR: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);
const KEY_COLOR: egui::Color32 = egui::Color32::from_rgb(130, 130, 130);
const VALUE_COLOR: egui::Color32 = egui::Color32::from_rgb(200, 200, 200);

/// The Status tab: counters, component state, and the diagnostics log.
#[derive(Debug)]
pub struct StatusPane {
    /// Show newest diagnostics first
    pub newest_first: bool,
}

impl Default for StatusPane {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPane {
    pub fn new() -> Self {
        Self { newest_first: true }
    }

    pub fn render(&mut self, ui: &mut egui::Ui, status: &SystemStatus, controller: &TabController) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                Self::render_tracker_section(ui, status, controller);

                ui.add_space(8.0);

                Self::render_metrics_section(ui, status);

                ui.add_space(8.0);

                Self::render_data_section(ui, controller);

                ui.add_space(8.0);

                Self::render_performance_section(ui, status);

                ui.add_space(8.0);

                self.render_diagnostics_section(ui, status);
            });
    }

    fn render_tracker_section(ui: &mut egui::Ui, status: &SystemStatus, controller: &TabController) {
        section_header(ui, "TRACKER");

        let state = controller.poller_state();
        let (color, text, icon) = if controller.is_shut_down() {
            (egui::Color32::from_rgb(150, 150, 150), "STOPPED", "○")
        } else if state.is_fetching {
            (egui::Color32::from_rgb(255, 200, 100), "FETCHING", "◐")
        } else if state.last_position.is_some() {
            (egui::Color32::from_rgb(100, 255, 100), "TRACKING", "●")
        } else {
            (egui::Color32::from_rgb(255, 100, 100), "NO FIX", "✕")
        };

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(icon).color(color));
            ui.label(egui::RichText::new(text).color(color).monospace().strong());
            ui.label(
                egui::RichText::new(controller.object_name())
                    .color(VALUE_COLOR)
                    .monospace(),
            );
        });

        key_value(ui, "Uptime:", format_duration(status.uptime_seconds()));
        let age = status
            .position_age_seconds()
            .map_or_else(|| "never".to_string(), |secs| format!("{} ago", format_duration(secs)));
        key_value(ui, "Last fix:", age);
        if let Some(wait) = controller.time_until_next_tick(std::time::Instant::now()) {
            key_value(ui, "Next poll:", format!("{:.1}s", wait.as_secs_f32()));
        }
    }

    fn render_metrics_section(ui: &mut egui::Ui, status: &SystemStatus) {
        section_header(ui, "POSITION FETCHES");

        egui::Grid::new("fetch_metrics")
            .num_columns(2)
            .spacing([12.0, 2.0])
            .show(ui, |ui| {
                grid_row(ui, "Started", status.fetches_started.to_string());
                grid_row(ui, "Succeeded", status.fetches_succeeded.to_string());
                grid_row(ui, "Failed", status.fetches_failed.to_string());
                grid_row(ui, "Ticks skipped", status.ticks_dropped.to_string());
            });
    }

    fn render_data_section(ui: &mut egui::Ui, controller: &TabController) {
        section_header(ui, "DATA");

        let backdrop = controller.backdrop();
        let backdrop_color = if !backdrop.is_settled() {
            egui::Color32::from_rgb(255, 200, 100)
        } else if backdrop.current().is_ready() {
            egui::Color32::from_rgb(100, 255, 100)
        } else {
            egui::Color32::from_rgb(255, 100, 100)
        };
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("●").color(backdrop_color));
            ui.label(egui::RichText::new(backdrop.status()).color(VALUE_COLOR));
        });

        if let Some(crew) = controller.crew() {
            let crew_color = if crew.names().is_some() {
                egui::Color32::from_rgb(100, 255, 100)
            } else {
                egui::Color32::from_rgb(150, 150, 150)
            };
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("●").color(crew_color));
                ui.label(
                    egui::RichText::new(format!("Crew: {}", crew.summary())).color(VALUE_COLOR),
                );
            });
        }
    }

    fn render_performance_section(ui: &mut egui::Ui, status: &SystemStatus) {
        section_header(ui, "COMPOSITING");

        key_value(ui, "Frames:", status.frames_composited.to_string());
        key_value(ui, "Last:", format!("{:.1} ms", status.last_composite_ms));
        key_value(ui, "Average:", format!("{:.1} ms", status.average_composite_ms));
    }

    fn render_diagnostics_section(&mut self, ui: &mut egui::Ui, status: &SystemStatus) {
        ui.horizontal(|ui| {
            section_header(ui, "DIAGNOSTICS");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.checkbox(&mut self.newest_first, "Newest first");
            });
        });

        if status.diagnostics.is_empty() {
            ui.label(
                egui::RichText::new("No messages")
                    .color(egui::Color32::from_rgb(100, 100, 100))
                    .italics(),
            );
            return;
        }

        let rows: Box<dyn Iterator<Item = _>> = if self.newest_first {
            Box::new(status.diagnostics.iter().rev())
        } else {
            Box::new(status.diagnostics.iter())
        };

        for diagnostic in rows {
            ui.horizontal(|ui| {
                let (icon, color) = level_style(diagnostic.level);
                ui.label(egui::RichText::new(icon).color(color));

                let time_str = diagnostic.timestamp.format("%H:%M:%S").to_string();
                ui.label(
                    egui::RichText::new(time_str)
                        .color(egui::Color32::from_rgb(100, 100, 100))
                        .monospace(),
                );

                ui.label(egui::RichText::new(&diagnostic.message).color(egui::Color32::from_rgb(180, 180, 180)));
            });
        }
    }
}

fn section_header(ui: &mut egui::Ui, title: &str) {
    ui.label(egui::RichText::new(title).color(SECTION_COLOR).size(11.0).strong());
}

fn key_value(ui: &mut egui::Ui, key: &str, value: String) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(key).color(KEY_COLOR));
        ui.label(egui::RichText::new(value).color(VALUE_COLOR).monospace());
    });
}

fn grid_row(ui: &mut egui::Ui, key: &str, value: String) {
    ui.label(egui::RichText::new(key).color(KEY_COLOR));
    ui.label(egui::RichText::new(value).color(VALUE_COLOR).monospace());
    ui.end_row();
}

fn level_style(level: DiagnosticLevel) -> (&'static str, egui::Color32) {
    match level {
        DiagnosticLevel::Info => ("ℹ", egui::Color32::from_rgb(100, 180, 255)),
        DiagnosticLevel::Warning => ("⚠", egui::Color32::from_rgb(255, 200, 100)),
        DiagnosticLevel::Error => ("✕", egui::Color32::from_rgb(255, 100, 100)),
    }
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
