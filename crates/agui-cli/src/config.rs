use agui_client::{ClientConfig, DEFAULT_ENDPOINT};
use config::{Config as ConfigLoader, ConfigError, Environment, File};
use rand::Rng;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Whole-run timeout; unset lets long agent runs stream indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSection {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl CliConfig {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables, e.g. AGUI_CLIENT__ENDPOINT, AGUI_LOGGING__LEVEL
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("AGUI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        config.try_deserialize()
    }

    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.client.endpoint.clone());
        match self.client.timeout_secs {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    /// Configured user id, or a freshly generated one.
    pub fn user_id(&self) -> String {
        self.session
            .user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_user_id)
    }
}

/// `user-<base36 millis>-<7 random base36 chars>`
pub fn generate_user_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::rng();
    let suffix: String = (0..7)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();

    format!("user-{}-{}", to_base36(millis), suffix)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [client]
            endpoint = "https://agent.example.com/agui"
            timeout_secs = 30

            [session]
            user_id = "user-abc"

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: CliConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.client.endpoint, "https://agent.example.com/agui");
        assert_eq!(config.user_id(), "user-abc");
        assert_eq!(config.logging.format, "json");

        let client = config.client_config();
        assert_eq!(client.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.client.endpoint, DEFAULT_ENDPOINT);
        assert!(config.client.timeout_secs.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_user_id_shape() {
        let id = generate_user_id();
        let parts: Vec<&str> = id.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert!(!parts[1].is_empty());
        assert_eq!(parts[2].len(), 7);
        assert!(parts[1..]
            .iter()
            .all(|part| part.bytes().all(|b| BASE36.contains(&b))));
    }

    #[test]
    fn test_blank_user_id_is_regenerated() {
        let config: CliConfig = toml::from_str("[session]\nuser_id = \"  \"").unwrap();
        assert!(config.user_id().starts_with("user-"));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
