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

//! People currently aboard the tracked craft.

use std::time::Duration;

use log::info;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{spawn_worker, DispatchSender, Update};
use crate::error::{FetchOutcome, TelemetryError};
use crate::fetch::{Fetcher, RetryPolicy};

/// open-notify's list of people in space.
pub const DEFAULT_CREW_URL: &str = "http://api.open-notify.org/astros.json";

#[derive(Debug, Clone)]
pub struct CrewSettings {
    pub url: String,
    /// Only people aboard this craft are listed.
    pub craft: String,
    pub retry: RetryPolicy,
}

impl Default for CrewSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CREW_URL.to_string(),
            craft: "ISS".to_string(),
            retry: RetryPolicy::new(Duration::from_secs(5), 1, Duration::ZERO),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Person {
    name: String,
    craft: String,
}

#[derive(Debug, Deserialize)]
struct Roster {
    people: Vec<Person>,
}

/// Names of the people aboard `craft`, in payload order.
pub fn decode_crew(payload: &Value, craft: &str) -> Result<Vec<String>, TelemetryError> {
    let roster = Roster::deserialize(payload)
        .map_err(|e| TelemetryError::Validation(format!("malformed crew roster: {e}")))?;

    Ok(roster
        .people
        .into_iter()
        .filter(|person| person.craft == craft)
        .map(|person| person.name)
        .collect())
}

/// Fetch and decode the roster. Runs on a worker thread.
pub async fn fetch_crew(
    fetcher: &Fetcher,
    settings: &CrewSettings,
    cancel: &CancellationToken,
) -> FetchOutcome<Vec<String>> {
    let payload = fetcher.fetch_json(&settings.url, &settings.retry, cancel).await?;
    decode_crew(&payload, &settings.craft)
}

/// Presentation-side crew roster, loaded once.
#[derive(Debug)]
pub struct CrewRoster {
    settings: CrewSettings,
    names: Option<Vec<String>>,
    load_started: bool,
}

impl CrewRoster {
    #[must_use]
    pub fn new(settings: CrewSettings) -> Self {
        Self {
            settings,
            names: None,
            load_started: false,
        }
    }

    /// Start the single background load. Returns `false` if already started.
    pub fn load_async(
        &mut self,
        fetcher: &Fetcher,
        cancel: &CancellationToken,
        sender: &DispatchSender,
    ) -> bool {
        if self.load_started {
            return false;
        }
        self.load_started = true;

        let fetcher = fetcher.clone();
        let settings = self.settings.clone();
        let token = cancel.clone();
        spawn_worker(
            "crew-roster",
            cancel.clone(),
            sender.clone(),
            async move { fetch_crew(&fetcher, &settings, &token).await },
            Update::CrewLoaded,
        )
    }

    /// Apply the load result. Returns a status line describing it.
    pub fn install(&mut self, outcome: FetchOutcome<Vec<String>>) -> String {
        match outcome {
            Ok(names) => {
                info!("{} crew aboard {}", names.len(), self.settings.craft);
                let status = format!("Crew roster loaded ({} aboard {})", names.len(), self.settings.craft);
                self.names = Some(names);
                status
            }
            Err(e) => format!("Crew roster unavailable: {e}"),
        }
    }

    /// Known crew, or `None` while loading or after a failure.
    #[must_use]
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// One-line summary for display.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.names {
            Some(names) if !names.is_empty() => names.join(", "),
            Some(_) => "nobody aboard".to_string(),
            None => "unknown".to_string(),
        }
    }
}
