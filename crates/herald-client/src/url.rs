//! Endpoint URL derivation.

use crate::errors::{ClientError, Result};

/// Channel endpoint path on the server.
pub const CHANNEL_PATH: &str = "/ws";

/// Derive the channel URL from the origin the admin page was served from.
///
/// `https` maps to `wss` and `http` to `ws`; any path on the origin is
/// replaced by [`CHANNEL_PATH`].
pub fn channel_url(page_origin: &str) -> Result<String> {
    let origin = page_origin.trim();
    let (scheme, rest) = if let Some(rest) = origin.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = origin.strip_prefix("http://") {
        ("ws", rest)
    } else {
        return Err(ClientError::InvalidOrigin {
            origin: page_origin.to_owned(),
        });
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(ClientError::InvalidOrigin {
            origin: page_origin.to_owned(),
        });
    }
    Ok(format!("{scheme}://{host}{CHANNEL_PATH}"))
}
