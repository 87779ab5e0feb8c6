//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::campaign::SenderDirectory;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Provider settings for the campaign builder.
    pub llm: LlmConfig,
    /// Port for the REST API.
    pub http_port: u16,
    /// Sender accounts offered to the builder.
    pub senders: SenderDirectory,
    /// Whether the stdin REPL should run alongside the server.
    pub cli_enabled: bool,
}

impl AppConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("CAMPAIGN_LLM_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("CAMPAIGN_LLM_API_KEY".to_string()))?;

        let backend = match lookup("CAMPAIGN_LLM_BACKEND") {
            None => LlmBackend::OpenAi,
            Some(name) => LlmBackend::from_name(&name).ok_or_else(|| ConfigError::InvalidValue {
                key: "CAMPAIGN_LLM_BACKEND".to_string(),
                message: format!("'{name}' is not one of openai, anthropic"),
            })?,
        };
        let model = lookup("CAMPAIGN_LLM_MODEL").unwrap_or_else(|| backend.default_model().to_string());

        let timeout_secs: u64 = parse_or(&lookup, "CAMPAIGN_LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CAMPAIGN_LLM_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let http_port: u16 = parse_or(&lookup, "CAMPAIGN_HTTP_PORT", DEFAULT_HTTP_PORT)?;

        let senders = if let Some(path) = lookup("CAMPAIGN_SENDER_ACCOUNTS_FILE") {
            SenderDirectory::load_json(&PathBuf::from(path))?
        } else if let Some(list) = lookup("CAMPAIGN_SENDER_ACCOUNTS") {
            SenderDirectory::parse_list(&list)?
        } else {
            SenderDirectory::demo()
        };

        let cli_enabled = lookup("CAMPAIGN_CLI")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "off"))
            .unwrap_or(true);

        Ok(Self {
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
                timeout: Duration::from_secs(timeout_secs),
            },
            http_port,
            senders,
            cli_enabled,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}' is not a valid number"),
        }),
    }
}
