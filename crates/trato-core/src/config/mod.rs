//! Client configuration.
//!
//! Endpoints and timing knobs for the engine's remote collaborators. Values
//! are normalized and validated up front so adapters can trust them; the
//! timing defaults mirror the reference behavior (3s poll cadence, 10s send
//! deadline, 5s fetch deadline).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Engine configuration shared by all adapters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the remote data service (http/https, no trailing slash)
    pub api_base_url: String,
    /// WebSocket endpoint of the push transport; derived from the API base
    /// URL when omitted
    #[serde(default)]
    pub realtime_url: Option<String>,
    /// Catch-up poll cadence in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Deadline for optimistic sends in seconds
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    /// Deadline for polls and initial loads in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

const fn default_send_timeout_secs() -> u64 {
    DEFAULT_SEND_TIMEOUT_SECS
}

const fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl ClientConfig {
    /// Build a config for the given API base URL with default timings.
    ///
    /// The URL is trimmed, must carry an http/https scheme, and loses any
    /// trailing slash.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        let api_base_url = normalize_http_url(api_base_url.into(), "api_base_url")?;
        Ok(Self {
            api_base_url,
            realtime_url: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            send_timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        })
    }

    /// Validate a config that was deserialized rather than constructed
    pub fn validate(&self) -> Result<()> {
        normalize_http_url(self.api_base_url.clone(), "api_base_url")?;
        if let Some(url) = normalize_text_option(self.realtime_url.clone()) {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err(Error::Validation(
                    "realtime_url must include ws:// or wss://".to_string(),
                ));
            }
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Validation(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.send_timeout_secs == 0 || self.fetch_timeout_secs == 0 {
            return Err(Error::Validation(
                "timeouts must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Catch-up poll cadence
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Deadline for optimistic sends
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Deadline for polls and initial loads
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// The push transport endpoint: the explicit `realtime_url`, or the API
    /// base URL with its scheme swapped to WebSocket and `/v1/realtime`
    /// appended.
    #[must_use]
    pub fn resolved_realtime_url(&self) -> String {
        if let Some(url) = normalize_text_option(self.realtime_url.clone()) {
            return url;
        }
        let swapped = if let Some(rest) = self.api_base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.api_base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.api_base_url.clone()
        };
        format!("{swapped}/v1/realtime")
    }
}

fn normalize_http_url(raw: String, field: &str) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Validation(format!("{field} must not be empty")))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Validation(format!(
            "{field} must include http:// or https://"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_normalizes_base_url() {
        let config = ClientConfig::new(" https://api.trato.example/ ").unwrap();
        assert_eq!(config.api_base_url, "https://api.trato.example");
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.send_timeout(), Duration::from_secs(10));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn new_rejects_non_http_urls() {
        assert!(ClientConfig::new("api.trato.example").is_err());
        assert!(ClientConfig::new("   ").is_err());
    }

    #[test]
    fn realtime_url_is_derived_from_api_base() {
        let config = ClientConfig::new("https://api.trato.example").unwrap();
        assert_eq!(
            config.resolved_realtime_url(),
            "wss://api.trato.example/v1/realtime"
        );

        let config = ClientConfig::new("http://localhost:8080").unwrap();
        assert_eq!(
            config.resolved_realtime_url(),
            "ws://localhost:8080/v1/realtime"
        );
    }

    #[test]
    fn explicit_realtime_url_wins() {
        let mut config = ClientConfig::new("https://api.trato.example").unwrap();
        config.realtime_url = Some("wss://push.trato.example/feed".to_string());
        assert_eq!(
            config.resolved_realtime_url(),
            "wss://push.trato.example/feed"
        );
    }

    #[test]
    fn validate_rejects_zero_timings() {
        let mut config = ClientConfig::new("https://api.trato.example").unwrap();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::new("https://api.trato.example").unwrap();
        config.realtime_url = Some("https://not-a-socket".to_string());
        assert!(config.validate().is_err());
    }
}
