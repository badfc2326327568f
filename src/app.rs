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

use std::time::Instant;

use eframe::egui;
use telemetry_client::{Fetcher, Position, TabController, TrackerSettings};

use crate::status::SystemStatus;
use crate::ui::{StatusPane, TrackerView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Tracker,
    Status,
}

/// Main window. Dropping it tears the tracker down.
#[derive(Debug)]
pub struct OrbitalAtlasApp {
    controller: TabController,
    status: SystemStatus,
    tracker_view: TrackerView,
    status_pane: StatusPane,
    active_tab: Tab,
}

impl OrbitalAtlasApp {
    pub fn new(cc: &eframe::CreationContext<'_>, fetcher: Fetcher, settings: TrackerSettings) -> Self {
        let repaint_ctx = cc.egui_ctx.clone();
        let mut controller =
            TabController::with_waker(fetcher, settings, move || repaint_ctx.request_repaint());
        controller.start(Instant::now());

        Self {
            controller,
            status: SystemStatus::new(),
            tracker_view: TrackerView::new(),
            status_pane: StatusPane::new(),
            active_tab: Tab::Tracker,
        }
    }

    fn pump(&mut self, ctx: &egui::Context) {
        let report = self.controller.pump(Instant::now());
        for change in report.status_changes {
            self.status.record(change);
        }

        let last_fix = self
            .controller
            .poller_state()
            .last_position
            .as_ref()
            .map(Position::observed_at);
        self.status.update_poller(self.controller.poller_stats(), last_fix);

        if let Some(composite_ms) = self.tracker_view.sync(ctx, &mut self.controller) {
            self.status.update_performance(composite_ms);
        }
    }
}

impl eframe::App for OrbitalAtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump(ctx);

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.active_tab, Tab::Tracker, "Tracker");
                ui.selectable_value(&mut self.active_tab, Tab::Status, "Status");
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.active_tab {
            Tab::Tracker => self.tracker_view.render(ui, &self.controller),
            Tab::Status => self.status_pane.render(ui, &self.status, &self.controller),
        });

        // Background results wake us through the repaint waker; the poll
        // timer needs an explicit wake-up.
        if let Some(wait) = self.controller.time_until_next_tick(Instant::now()) {
            ctx.request_repaint_after(wait);
        }
    }
}
