//! `herald publish`

use anyhow::{Context, Result, bail};
use clap::Args;
use herald_core::Event;
use herald_settings::HeraldSettings;
use serde_json::Value;
use tracing::debug;

/// Flags for `herald publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Event type, e.g. `lead.created`.
    #[arg(long = "type")]
    pub event_type: String,

    /// Human-readable summary.
    #[arg(long)]
    pub message: Option<String>,

    /// JSON payload.
    #[arg(long)]
    pub data: Option<String>,

    /// Server origin (defaults to the configured page origin).
    #[arg(long)]
    pub origin: Option<String>,
}

impl PublishArgs {
    fn event(&self) -> Result<Event> {
        let mut event = Event::new(self.event_type.clone());
        if let Some(data) = &self.data {
            let value: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
            event = event.with_data(value);
        }
        if let Some(message) = &self.message {
            event = event.with_message(message.clone());
        }
        Ok(event)
    }
}

/// Ingest URL for a server origin.
fn events_url(origin: &str) -> String {
    format!("{}/events", origin.trim_end_matches('/'))
}

/// POST `event` to the server at `origin` and return its delivery report.
pub async fn send(origin: &str, event: &Event) -> Result<Value> {
    let url = events_url(origin);
    debug!(%url, event_type = %event.event_type, "publishing event");
    let response = reqwest::Client::new()
        .post(&url)
        .json(event)
        .send()
        .await
        .with_context(|| format!("Failed to reach {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("server rejected event ({status}): {body}");
    }
    response
        .json()
        .await
        .context("Server returned an invalid report")
}

/// Publish one event and print the delivery report.
pub async fn run(args: PublishArgs, settings: &HeraldSettings) -> Result<()> {
    let event = args.event()?;
    let origin = args
        .origin
        .as_deref()
        .unwrap_or(&settings.client.page_origin);
    let report = send(origin, &event).await?;
    println!("{report}");
    Ok(())
}
