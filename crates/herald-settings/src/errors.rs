//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid JSON.
    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The merged settings do not fit the settings schema, e.g. a string
    /// where a number is expected.
    #[error("settings have the wrong shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/herald.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/herald.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn shape_error_from_serde() {
        let bad = serde_json::from_str::<u16>("\"x\"").unwrap_err();
        let err: SettingsError = bad.into();
        assert!(err.to_string().starts_with("settings have the wrong shape"));
    }
}
