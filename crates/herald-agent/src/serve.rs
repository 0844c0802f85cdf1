//! `herald serve`

use anyhow::{Context, Result};
use clap::Args;
use herald_server::config::ServerConfig;
use herald_server::server::HeraldServer;
use herald_settings::HeraldSettings;
use tracing::info;

/// Flags for `herald serve`. Each overrides the matching setting.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    pub port: Option<u16>,

    /// Maximum concurrent channel connections.
    #[arg(long)]
    pub max_connections: Option<usize>,
}

impl ServeArgs {
    fn server_config(&self, settings: &HeraldSettings) -> ServerConfig {
        let mut config = ServerConfig::from(&settings.server);
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
        config
    }
}

/// Run the server until ctrl-c.
pub async fn run(args: ServeArgs, settings: &HeraldSettings) -> Result<()> {
    let metrics = herald_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;
    let server = HeraldServer::new(args.server_config(settings), metrics);

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    info!(
        max_connections = server.config().max_connections,
        "herald listening on http://{addr} (channel at ws://{addr}/ws)"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!(connections = server.registry().len(), "shutting down");
    server.shutdown().shutdown();
    let _ = handle.await;
    info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let args = ServeArgs {
            host: Some("0.0.0.0".into()),
            port: Some(9000),
            max_connections: None,
        };
        let mut settings = HeraldSettings::default();
        settings.server.max_connections = 12;

        let config = args.server_config(&settings);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.max_connections, 12);
    }

    #[test]
    fn settings_used_without_flags() {
        let args = ServeArgs {
            host: None,
            port: None,
            max_connections: None,
        };
        let config = args.server_config(&HeraldSettings::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:8787");
        assert_eq!(config.heartbeat_interval_secs, 30);
    }
}
