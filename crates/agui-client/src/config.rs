// Connection settings for the run client

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9000/agui/v1/run";

/// Configuration for a [`RunClient`](crate::RunClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Run endpoint, receives the `POST` with the run input
    pub endpoint: String,
    /// Whole-request timeout. Long-running agent streams usually want none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
    /// Bounded queue between the network reader and the consumer
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ClientError::InvalidConfig("endpoint must not be empty".into()));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ClientError::InvalidConfig(format!(
                "endpoint must be an http(s) URL: {}",
                endpoint
            )));
        }
        if self.channel_capacity == 0 {
            return Err(ClientError::InvalidConfig(
                "channel_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.channel_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("ftp://example.com").validate().is_err());
        assert!(ClientConfig::new("http://x")
            .with_channel_capacity(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"endpoint":"https://agent.example.com/run"}"#).unwrap();
        assert_eq!(config.channel_capacity, 1000);
        assert!(config.request_timeout.is_none());
    }
}
