//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)
//!
//! Numeric fields are clamped into their accepted ranges after the merge, so a
//! file value can never disable the reconnect delay or size an alert tone
//! beyond what playback accepts.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::HeraldSettings;

const MAX_CONNECTIONS: RangeInclusive<u64> = 1..=100_000;
const HEARTBEAT_INTERVAL_SECS: RangeInclusive<u64> = 1..=3_600;
const HEARTBEAT_TIMEOUT_SECS: RangeInclusive<u64> = 1..=86_400;
const SEND_QUEUE_CAPACITY: RangeInclusive<u64> = 1..=65_536;
const RECONNECT_DELAY_MS: RangeInclusive<u64> = 100..=600_000;
const IDLE_TIMEOUT_MS: RangeInclusive<u64> = 1_000..=86_400_000;
const TONE_DURATION_MS: RangeInclusive<u64> = 10..=10_000;
const TONE_FREQUENCY_HZ: RangeInclusive<f32> = 20.0..=20_000.0;
const TONE_GAIN: RangeInclusive<f32> = 0.0..=1.0;

/// Resolve the path to the settings file (`~/.herald/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".herald").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HeraldSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<HeraldSettings> {
    let defaults = serde_json::to_value(HeraldSettings::default())?;

    let merged = match read_user_file(path)? {
        Some(user) => deep_merge(defaults, user),
        None => defaults,
    };

    let mut settings: HeraldSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    clamp_ranges(&mut settings);
    Ok(settings)
}

/// Parse the user file. `Ok(None)` when it does not exist.
fn read_user_file(path: &Path) -> Result<Option<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "no settings file, using defaults");
            return Ok(None);
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_owned(),
                source,
            });
        }
    };
    debug!(?path, "loading settings file");
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `HERALD_*` environment variable overrides.
///
/// Invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut HeraldSettings) {
    if let Some(v) = read_env_string("HERALD_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u64("HERALD_PORT", &(1..=65_535)) {
        settings.server.port = v as u16;
    }
    if let Some(v) = read_env_u64("HERALD_MAX_CONNECTIONS", &MAX_CONNECTIONS) {
        settings.server.max_connections = v as usize;
    }
    if let Some(v) = read_env_u64("HERALD_HEARTBEAT_INTERVAL_SECS", &HEARTBEAT_INTERVAL_SECS) {
        settings.server.heartbeat_interval_secs = v;
    }
    if let Some(v) = read_env_u64("HERALD_HEARTBEAT_TIMEOUT_SECS", &HEARTBEAT_TIMEOUT_SECS) {
        settings.server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = read_env_string("HERALD_PAGE_ORIGIN") {
        settings.client.page_origin = v;
    }
    if let Some(v) = read_env_u64("HERALD_RECONNECT_DELAY_MS", &RECONNECT_DELAY_MS) {
        settings.client.reconnect_delay_ms = v;
    }
    if let Some(v) = read_env_string("HERALD_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("HERALD_SOUND_ENABLED") {
        settings.alerts.sound_enabled = v;
    }
}

/// Pull every numeric field into its accepted range, warning on each change.
pub fn clamp_ranges(settings: &mut HeraldSettings) {
    let server = &mut settings.server;
    let mut max_connections = server.max_connections as u64;
    clamp_u64("server.maxConnections", &mut max_connections, &MAX_CONNECTIONS);
    server.max_connections = max_connections as usize;
    clamp_u64(
        "server.heartbeatIntervalSecs",
        &mut server.heartbeat_interval_secs,
        &HEARTBEAT_INTERVAL_SECS,
    );
    clamp_u64(
        "server.heartbeatTimeoutSecs",
        &mut server.heartbeat_timeout_secs,
        &HEARTBEAT_TIMEOUT_SECS,
    );
    let mut queue = server.send_queue_capacity as u64;
    clamp_u64("server.sendQueueCapacity", &mut queue, &SEND_QUEUE_CAPACITY);
    server.send_queue_capacity = queue as usize;

    let client = &mut settings.client;
    clamp_u64(
        "client.reconnectDelayMs",
        &mut client.reconnect_delay_ms,
        &RECONNECT_DELAY_MS,
    );
    clamp_u64("client.idleTimeoutMs", &mut client.idle_timeout_ms, &IDLE_TIMEOUT_MS);

    let alerts = &mut settings.alerts;
    clamp_u64(
        "alerts.toneDurationMs",
        &mut alerts.tone_duration_ms,
        &TONE_DURATION_MS,
    );
    clamp_f32(
        "alerts.toneFrequencyHz",
        &mut alerts.tone_frequency_hz,
        &TONE_FREQUENCY_HZ,
    );
    clamp_f32("alerts.toneGain", &mut alerts.tone_gain, &TONE_GAIN);
}

fn clamp_u64(key: &str, value: &mut u64, range: &RangeInclusive<u64>) {
    let clamped = (*value).clamp(*range.start(), *range.end());
    if clamped != *value {
        warn!(key, value = *value, clamped, "setting out of range, clamping");
        *value = clamped;
    }
}

fn clamp_f32(key: &str, value: &mut f32, range: &RangeInclusive<f32>) {
    let clamped = if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        *range.start()
    };
    if clamped.to_bits() != value.to_bits() {
        warn!(
            key,
            value = f64::from(*value),
            clamped = f64::from(clamped),
            "setting out of range, clamping"
        );
        *value = clamped;
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, range: &RangeInclusive<u64>) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, *range.start(), *range.end());
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
    }
    result
}
