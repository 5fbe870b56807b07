use crate::shared::logging;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";
pub const API_URL_ENV: &str = "DISCORD_API_URL";

/// Provider-level settings shared by every resource.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Bot token, with or without the `Bot ` prefix.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!(
        "DiscordBot (https://github.com/tfdiscord/tfdiscord, {})",
        env!("CARGO_PKG_VERSION")
    )
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ProviderConfig {
    /// Applies overrides, ignoring empty values.
    pub fn with_overrides(mut self, token: Option<String>, api_url: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.token = token;
        }
        if let Some(url) = api_url.filter(|u| !u.is_empty()) {
            self.api_url = url;
        }
        self
    }

    fn with_env_overrides(self) -> Self {
        let token = std::env::var(TOKEN_ENV).ok();
        let api_url = std::env::var(API_URL_ENV).ok();
        if token.is_some() {
            logging::debug(&format!("Using token from {}", TOKEN_ENV));
        }
        self.with_overrides(token, api_url)
    }
}

/// Default location of the provider config file, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tfdiscord").join("config.json"))
}

pub fn init_from_path(path: &Path) -> anyhow::Result<ProviderConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!("Failed to read provider config {}: {}", path.display(), e)
    })?;
    let config: ProviderConfig = serde_json::from_str(&content).map_err(|e| {
        anyhow::anyhow!("Invalid provider config {}: {}", path.display(), e)
    })?;
    logging::info(&format!("Loaded provider config from {}", path.display()));
    Ok(config.with_env_overrides())
}

pub fn init_default() -> anyhow::Result<ProviderConfig> {
    match default_config_path() {
        Some(path) if path.exists() => init_from_path(&path),
        _ => {
            logging::debug("No provider config file found, using defaults");
            Ok(ProviderConfig::default().with_env_overrides())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: ProviderConfig = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent.starts_with("DiscordBot"));
    }

    #[test]
    fn test_overrides_skip_empty_values() {
        let config = ProviderConfig {
            token: "from-file".to_string(),
            ..Default::default()
        }
        .with_overrides(Some(String::new()), Some("http://localhost:9999".to_string()));

        assert_eq!(config.token, "from-file");
        assert_eq!(config.api_url, "http://localhost:9999");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig {
            token: "super-secret".to_string(),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_init_from_path_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = init_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid provider config"));
    }
}
