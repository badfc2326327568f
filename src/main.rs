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

mod app;
mod config;
mod status;
mod ui;

use clap::Parser;
use eframe::egui;
use env_logger::Env;
use log::{info, warn};
use telemetry_client::Fetcher;

use app::OrbitalAtlasApp;
use config::AppConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(version, about = "Live position of an orbiting object on a world map", long_about = None)]
struct Args {
    /// Position endpoint, overriding the configured one for this run
    #[arg(long, value_name = "URL")]
    position_url: Option<String>,

    /// Backdrop image URL, overriding the configured one for this run
    #[arg(long, value_name = "URL")]
    backdrop_url: Option<String>,

    /// Seconds between position polls
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// Ignore the configuration file and use defaults
    #[arg(long)]
    no_config: bool,

    /// Print the configuration file location and exit
    #[arg(long)]
    config_path: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.position_url {
            config.position_url.clone_from(url);
        }
        if let Some(url) = &self.backdrop_url {
            config.backdrop_url.clone_from(url);
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval_secs = secs;
        }
    }
}

fn load_config(args: &Args) -> AppConfig {
    let mut config = if args.no_config {
        AppConfig::default()
    } else {
        AppConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load configuration, using defaults: {}", e);
            AppConfig::default()
        })
    };
    args.apply(&mut config);
    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    if args.config_path {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let config = load_config(&args);
    let settings = config.tracker_settings();
    let fetcher = Fetcher::http()?;

    info!("Starting Orbital Atlas, tracking {}", config.object_name);

    let title = format!("Orbital Atlas: {}", config.object_name);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 600.0])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        "Orbital Atlas",
        options,
        Box::new(move |cc| Ok(Box::new(OrbitalAtlasApp::new(cc, fetcher, settings)))),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "orbital-atlas",
            "--no-config",
            "--position-url",
            "http://localhost:8080/now.json",
            "--poll-interval",
            "3",
        ]);
        let config = load_config(&args);

        assert_eq!(config.position_url, "http://localhost:8080/now.json");
        assert_eq!(config.poll_interval_secs, 3);
        assert_eq!(config.backdrop_url, AppConfig::default().backdrop_url);
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        let args = Args::parse_from(["orbital-atlas", "--no-config"]);
        assert_eq!(load_config(&args), AppConfig::default());
    }
}
