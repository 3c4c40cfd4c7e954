use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dirs;
use crate::error::{ChatError, Credential, Result};
use crate::window::ConversationWindowConfig;

/// Process-wide settings for the Chat server and CLI.
///
/// Loaded once at start-up and shared behind an `Arc`; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Host address for the HTTP server (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP server (default: 11436)
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub window: ConversationWindowConfig,

    /// Configured model providers
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderSettings>,
}

/// Bounds applied to every streaming session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Absolute deadline for a session, fixed at open (default: 5 minutes)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Chunks buffered before `send` applies backpressure to the worker
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Credentials and model selection for one provider entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider family, e.g. "openai", "ollama", "echo"
    pub provider: String,

    /// Model served by this entry
    pub model_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

impl ProviderSettings {
    /// Credentials the provider family cannot work without.
    pub fn required_credentials(&self) -> &'static [Credential] {
        match self.provider.to_ascii_lowercase().as_str() {
            "echo" => &[],
            "ollama" => &[Credential::BaseUrl],
            "qianfan" | "zhipu" => &[Credential::ApiKey, Credential::SecretKey],
            "azure-openai" => &[Credential::ApiKey, Credential::BaseUrl],
            _ => &[Credential::ApiKey],
        }
    }

    /// Fail with the first required credential that is missing or blank.
    pub fn validate(&self) -> Result<()> {
        for kind in self.required_credentials() {
            let value = match kind {
                Credential::ApiKey => &self.api_key,
                Credential::BaseUrl => &self.base_url,
                Credential::SecretKey => &self.secret_key,
            };
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(ChatError::MissingCredential {
                    kind: *kind,
                    provider: self.provider.clone(),
                    model: self.model_name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    11436
}

fn default_timeout_ms() -> u64 {
    5 * 60 * 1000
}

fn default_channel_capacity() -> usize {
    64
}

fn default_providers() -> Vec<ProviderSettings> {
    vec![ProviderSettings {
        provider: "echo".to_string(),
        model_name: "echo".to_string(),
        ..Default::default()
    }]
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session: SessionConfig::default(),
            window: ConversationWindowConfig::default(),
            providers: default_providers(),
        }
    }
}

impl ChatConfig {
    /// Load configuration from the default config file path.
    /// Returns default config if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&dirs::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: ChatConfig = toml::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Save the current configuration to the default config file path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&dirs::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the server bind address string (e.g., "127.0.0.1:11436").
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn check(&self) -> Result<()> {
        if self.session.timeout_ms == 0 {
            return Err(ChatError::Config(
                "session.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.session.channel_capacity == 0 {
            return Err(ChatError::Config(
                "session.channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
