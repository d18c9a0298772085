use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use crate::llm_providers::LLMProviderType;

// Import logging macros
use crate::{log_system_event, log_validation};

pub const DEFAULT_LOG_FILTER: &str = "info,literature_quiz=debug";
pub const DEFAULT_GOOGLE_CLIENT_ID: &str = "your-google-client-id.apps.googleusercontent.com";

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub auth: AuthConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Credential and defaults the relay uses towards Gemini
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Account endpoints of the relay
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub google_client_id: String,
    pub users_file: String,
    pub public_base_url: Option<String>,
}

/// How the quiz front end reaches a model
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub provider: LLMProviderType,
    pub proxy_base_url: Option<String>,
    pub proxy_model: Option<String>,
    pub state_file: Option<String>,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            server: ServerConfig::from_env()?,
            gemini: GeminiConfig::from_env(),
            auth: AuthConfig::from_env(),
            client: ClientConfig::from_env(),
            logging: LoggingConfig::from_env(),
        };

        log_system_event!(config, "Configuration loaded successfully");
        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    pub fn log_configuration_summary(&self) {
        info!(
            server_address = %self.server.address(),
            gemini_api_key_masked = %self.gemini.api_key.as_deref().map(mask_sensitive_data).unwrap_or_else(|| "<unset>".to_string()),
            gemini_model = ?self.gemini.model,
            client_provider = ?self.client.provider,
            proxy_base_url = ?self.client.proxy_base_url,
            users_file = %self.auth.users_file,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if !self.gemini.has_key() {
            warn!("GEMINI_API_KEY is not set - /generate-test will answer 500");
        }

        if self.auth.google_client_id == DEFAULT_GOOGLE_CLIENT_ID {
            warn!("GOOGLE_CLIENT_ID is a placeholder - Google sign-in will not work");
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "3000".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl GeminiConfig {
    fn from_env() -> Self {
        GeminiConfig {
            api_key: non_empty_var("GEMINI_API_KEY"),
            base_url: non_empty_var("GEMINI_BASE_URL"),
            model: non_empty_var("GEMINI_MODEL"),
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl AuthConfig {
    fn from_env() -> Self {
        AuthConfig {
            google_client_id: non_empty_var("GOOGLE_CLIENT_ID")
                .unwrap_or_else(|| DEFAULT_GOOGLE_CLIENT_ID.to_string()),
            users_file: non_empty_var("USERS_FILE").unwrap_or_else(|| "users.json".to_string()),
            public_base_url: non_empty_var("PUBLIC_BASE_URL"),
        }
    }
}

impl ClientConfig {
    fn from_env() -> Self {
        let provider_str = env::var("QUIZ_PROVIDER").unwrap_or_else(|_| "proxy".to_string());
        let provider = LLMProviderType::parse(&provider_str).unwrap_or_else(|| {
            info!("Unknown quiz provider '{}', defaulting to the proxy relay", provider_str);
            LLMProviderType::Proxy
        });

        ClientConfig {
            provider,
            proxy_base_url: non_empty_var("PROXY_BASE_URL"),
            proxy_model: non_empty_var("PROXY_MODEL"),
            state_file: non_empty_var("QUIZ_STATE_FILE"),
        }
    }
}

impl LoggingConfig {
    fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
