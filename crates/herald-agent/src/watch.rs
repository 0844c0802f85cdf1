//! `herald watch`

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use herald_client::alert::{Alert, AlertDispatcher};
use herald_client::{ManagerConfig, WsConnector, subscribe};
use herald_core::Event;
use herald_settings::HeraldSettings;
use tracing::info;

/// Flags for `herald watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Origin the admin page is served from, e.g. `https://admin.example.com`.
    #[arg(long)]
    pub origin: Option<String>,

    /// Show alerts without playing a tone.
    #[arg(long)]
    pub no_sound: bool,
}

impl WatchArgs {
    fn apply(&self, settings: &HeraldSettings) -> HeraldSettings {
        let mut settings = settings.clone();
        if let Some(origin) = &self.origin {
            settings.client.page_origin.clone_from(origin);
        }
        if self.no_sound {
            settings.alerts.sound_enabled = false;
        }
        settings
    }
}

fn render(alert: &Alert) -> String {
    format!("[{}] {}", alert.title, alert.body)
}

/// Watch the channel until ctrl-c.
pub async fn run(args: WatchArgs, settings: &HeraldSettings) -> Result<()> {
    let settings = args.apply(settings);
    let config = ManagerConfig::from_settings(&settings.client)
        .context("Invalid page origin")?;
    let dispatcher = Arc::new(AlertDispatcher::from_settings(&settings.alerts));
    info!(url = %config.url, alert_types = dispatcher.policy().len(), "watching channel");

    let handle = subscribe(config, WsConnector, move |event: &Event| {
        if let Some(alert) = dispatcher.dispatch(event) {
            println!("{}", render(&alert));
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let args = WatchArgs {
            origin: Some("https://admin.example.com".into()),
            no_sound: true,
        };
        let settings = args.apply(&HeraldSettings::default());
        assert_eq!(settings.client.page_origin, "https://admin.example.com");
        assert!(!settings.alerts.sound_enabled);
    }

    #[test]
    fn settings_kept_without_flags() {
        let args = WatchArgs {
            origin: None,
            no_sound: false,
        };
        let settings = args.apply(&HeraldSettings::default());
        assert_eq!(settings.client.page_origin, "http://127.0.0.1:8787");
        assert!(settings.alerts.sound_enabled);
    }

    #[test]
    fn alert_line() {
        let alert = Alert {
            title: "New lead".into(),
            body: "Jane Doe".into(),
            event_type: "lead.created".into(),
        };
        assert_eq!(render(&alert), "[New lead] Jane Doe");
    }
}
