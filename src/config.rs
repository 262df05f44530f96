//! Environment configuration.

use std::env;

use action_protocol::ParserOptions;
use thiserror::Error;

pub const ACTION_TAG_ENV: &str = "SITE_FORGE_ACTION_TAG";
pub const ARTIFACT_TAG_ENV: &str = "SITE_FORGE_ARTIFACT_TAG";
pub const LOG_ENV: &str = "SITE_FORGE_LOG";
pub const LOG_JSON_ENV: &str = "SITE_FORGE_LOG_JSON";

pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be an alphanumeric tag name, got '{value}'")]
    InvalidTagName { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForgeConfig {
    pub action_tag: Option<String>,
    pub artifact_tag: Option<String>,
    pub log_filter: Option<String>,
    pub log_json: bool,
}

impl ForgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            action_tag: env_tag_opt(ACTION_TAG_ENV)?,
            artifact_tag: env_tag_opt(ARTIFACT_TAG_ENV)?,
            log_filter: env_string_opt(LOG_ENV),
            log_json: env_flag(LOG_JSON_ENV),
        })
    }

    #[must_use]
    pub fn parser_options(&self) -> ParserOptions {
        let mut options = ParserOptions::default();
        if let Some(tag) = &self.action_tag {
            options.action_tag = tag.clone();
        }
        if let Some(tag) = &self.artifact_tag {
            options.artifact_tag = tag.clone();
        }
        options
    }

    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// Checks a delimiter tag name given on the command line or in the environment.
pub fn validate_tag(key: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    if valid {
        Ok(value.to_string())
    } else {
        Err(ConfigError::InvalidTagName {
            key,
            value: value.to_string(),
        })
    }
}

fn env_tag_opt(key: &'static str) -> Result<Option<String>, ConfigError> {
    env_string_opt(key)
        .map(|value| validate_tag(key, &value))
        .transpose()
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
