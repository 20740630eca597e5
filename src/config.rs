//! Environment-driven configuration
//!
//! Values are read once at process start (after `dotenv`) and passed down
//! explicitly.

use crate::error::AgentError;
use crate::models::AgentConfig;
use crate::Result;
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
const DEFAULT_DOCUMENT_PREFIX: &str = "numerology_trader";
const DEFAULT_AWS_REGION: &str = "us-east-1";
const DEFAULT_TRADING_DATA_DIR: &str = "data/trading";
const DEFAULT_AGENT_CONFIG: &str = "config/agent_node/numerology.json";
const DEFAULT_PORT: u16 = 8080;

/// Generation-call settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model_name: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self> {
        let model_name = env::var("MODEL_NAME")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AgentError::ConfigError("MODEL_NAME not set".to_string()))?;

        let config = Self {
            model_name,
            base_url: env::var("BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: env::var("API_KEY").unwrap_or_default(),
            temperature: parse_optional("TEMPERATURE")?,
            max_tokens: parse_optional("MAX_TOKENS")?,
            timeout_secs: parse_optional("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
        };

        debug!(model = %config.model_name, base_url = %config.base_url, "LLM config loaded");
        Ok(config)
    }

    /// Model id sent on the wire. Provider-routed names such as
    /// `openai/gpt-4o-mini` lose their routing prefix.
    pub fn request_model(&self) -> &str {
        self.model_name
            .strip_prefix("openai/")
            .unwrap_or(&self.model_name)
    }
}

/// Static credentials for signing S3 requests
#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Where narrative documents live
#[derive(Debug, Clone)]
pub struct DocumentStoreConfig {
    /// `None` when no store is configured
    pub base_url: Option<String>,
    pub prefix: String,
    /// Present when requests must be signed
    pub credentials: Option<S3Credentials>,
}

impl DocumentStoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from a variable source; blank values count as unset.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let region = var("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());

        let base_url = match var("DOCUMENT_BASE_URL") {
            Some(url) => Some(url.trim_end_matches('/').to_string()),
            None => match var("BUCKET_NAME") {
                Some(bucket) => {
                    let endpoint = var("AWS_ENDPOINT_URL")
                        .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", region));
                    Some(virtual_host_url(&endpoint, &bucket)?)
                }
                None => None,
            },
        };

        let credentials = match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(S3Credentials {
                access_key_id,
                secret_access_key,
                session_token: var("AWS_SESSION_TOKEN"),
                region,
            }),
            _ => None,
        };

        Ok(Self {
            base_url,
            prefix: var("DOCUMENT_PREFIX").unwrap_or_else(|| DEFAULT_DOCUMENT_PREFIX.to_string()),
            credentials,
        })
    }
}

/// `https://s3.example.com` + `bucket` → `https://bucket.s3.example.com`
fn virtual_host_url(endpoint: &str, bucket: &str) -> Result<String> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| AgentError::ConfigError(format!("invalid AWS_ENDPOINT_URL: {}", e)))?;

    let host = url
        .host_str()
        .ok_or_else(|| AgentError::ConfigError("AWS_ENDPOINT_URL has no host".to_string()))?;

    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();

    Ok(format!("{}://{}.{}{}", url.scheme(), bucket, host, port))
}

/// Settings for the binaries
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub agent_config_path: PathBuf,
    pub max_iterations: u32,
    /// Trading files named in API requests must live under this directory
    pub trading_data_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT").or_else(|_| env::var("API_PORT")) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AgentError::ConfigError(format!("invalid PORT '{}': {}", raw, e)))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            agent_config_path: env::var("AGENT_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_AGENT_CONFIG)),
            max_iterations: parse_optional("MAX_ITERATIONS")?
                .unwrap_or(crate::agent::DEFAULT_MAX_ITERATIONS),
            trading_data_dir: env::var("TRADING_DATA_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TRADING_DATA_DIR)),
        })
    }
}

fn parse_optional<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AgentError::ConfigError(format!("invalid {} '{}': {}", key, raw, e))),
        _ => Ok(None),
    }
}

/// Load the agent array from a JSON file
pub fn load_agent_configs(path: impl AsRef<Path>) -> Result<Vec<AgentConfig>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;

    let descriptors = value.as_array().ok_or_else(|| {
        AgentError::ConfigError(format!(
            "{} must contain an array of agent descriptors",
            path.display()
        ))
    })?;

    let configs = descriptors
        .iter()
        .map(AgentConfig::from_value)
        .collect::<Result<Vec<_>>>()?;

    debug!(path = %path.display(), agents = configs.len(), "Agent configs loaded");
    Ok(configs)
}
