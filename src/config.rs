use crate::error::AppError;
use axum::http::StatusCode;
use serde::Deserialize;

/// Location of the upstream Flowise prediction flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowiseConfig {
    pub api_base_url: String,
    pub chatflow_id: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl FlowiseConfig {
    pub fn new(api_base_url: impl Into<String>, chatflow_id: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            chatflow_id: chatflow_id.into(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let api_base_url = required_env("FLOWISE_API_BASE_URL")?;
        let chatflow_id = required_env("FLOWISE_CHATFLOW_ID")?;
        let timeout_ms = match optional_env("FLOWISE_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|err| {
                AppError::new(
                    StatusCode::BAD_REQUEST,
                    "config_invalid",
                    format!("FLOWISE_TIMEOUT_MS: {err}"),
                )
            })?,
            None => default_timeout_ms(),
        };
        Ok(Self {
            api_base_url,
            chatflow_id,
            timeout_ms,
        })
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn prediction_url(&self) -> String {
        format!(
            "{}/prediction/{}",
            self.api_base_url.trim_end_matches('/'),
            self.chatflow_id.trim()
        )
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

pub(crate) fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required_env(key: &str) -> Result<String, AppError> {
    optional_env(key).ok_or_else(|| {
        AppError::new(
            StatusCode::BAD_REQUEST,
            "config_missing",
            format!("{key} must be set"),
        )
    })
}
