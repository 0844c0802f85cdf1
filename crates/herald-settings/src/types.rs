//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every section is `#[serde(default)]`
//! so a partial file only needs the keys it overrides.

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeraldSettings {
    /// Notification server settings.
    pub server: ServerSettings,
    /// Dashboard client settings.
    pub client: ClientSettings,
    /// Alert (sound + visual cue) settings.
    pub alerts: AlertSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Notification server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Maximum concurrent channel connections.
    pub max_connections: usize,
    /// Seconds between server Ping frames.
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence before a connection is dropped.
    pub heartbeat_timeout_secs: u64,
    /// Per-connection outbound queue length.
    pub send_queue_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            max_connections: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            send_queue_capacity: 256,
        }
    }
}

/// Dashboard client settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Origin of the admin page; the channel URL is derived from it.
    pub page_origin: String,
    /// Delay before a reconnect attempt, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Silence after which the transport is considered closed, in milliseconds.
    pub idle_timeout_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            page_origin: "http://127.0.0.1:8787".to_string(),
            reconnect_delay_ms: 3_000,
            idle_timeout_ms: 90_000,
        }
    }
}

/// Alert settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertSettings {
    /// Whether the audible cue is produced at all.
    pub sound_enabled: bool,
    /// Event types that raise an alert.
    pub alert_types: Vec<String>,
    /// Tone frequency in hertz.
    pub tone_frequency_hz: f32,
    /// Tone length in milliseconds.
    pub tone_duration_ms: u64,
    /// Peak gain of the tone (0.0–1.0).
    pub tone_gain: f32,
    /// External player fed raw mono `f32` little-endian PCM on stdin.
    pub player_command: Vec<String>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            alert_types: vec![
                "lead.created".to_string(),
                "contact.created".to_string(),
                "verification.recorded".to_string(),
            ],
            tone_frequency_hz: 880.0,
            tone_duration_ms: 500,
            tone_gain: 0.3,
            player_command: [
                "aplay", "-q", "-t", "raw", "-f", "FLOAT_LE", "-r", "44100", "-c", "1",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
