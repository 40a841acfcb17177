//! # Application Configuration
//!
//! This module defines the configuration structure for `stockmeta-server` and
//! loads it from a YAML file layered with environment variables.
//!
//! `${VAR}` placeholders in the YAML text are substituted from the environment
//! before parsing, so secrets such as API keys never need to live in the file.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::time::Duration;
use stockmeta::{export::validate_sheet_name, pipeline, types::DEFAULT_SHEET_NAME};
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
    /// The configuration parsed but its values are unusable.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The vision-language inference service.
    pub provider: ProviderConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
}

fn default_port() -> u16 {
    3000
}

/// Connection settings for the inference service.
#[derive(Deserialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider: "openai" (any OpenAI-compatible API) or "gemini".
    pub provider: String,
    /// The API URL. Optional for Gemini, where it is derived from the model name.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model_name: String,
    /// Ask the service for a JSON-only response where it supports one.
    #[serde(default)]
    pub json_mode: bool,
}

// The API key is redacted so the config can be logged.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("json_mode", &self.json_mode)
            .finish()
    }
}

/// How images are handed to the inference service.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncodingKind {
    /// Base64 data URIs inside the request.
    #[default]
    Inline,
    /// URLs into the served upload directory.
    Reference,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_images: usize,
    pub concurrency: usize,
    pub call_timeout_secs: u64,
    pub batch_timeout_secs: u64,
    pub image_encoding: ImageEncodingKind,
    /// Replaces the built-in instruction prompt.
    pub prompt: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_images: pipeline::DEFAULT_MAX_IMAGES,
            concurrency: pipeline::DEFAULT_CONCURRENCY,
            call_timeout_secs: pipeline::DEFAULT_CALL_TIMEOUT.as_secs(),
            batch_timeout_secs: pipeline::DEFAULT_BATCH_TIMEOUT.as_secs(),
            image_encoding: ImageEncodingKind::default(),
            prompt: None,
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub sheet_name: String,
    /// The download filename without extension.
    pub file_stem: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            file_stem: "adobe_stock_metadata".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadsConfig {
    /// Upper bound on a whole `/generate` request body.
    pub max_body_bytes: usize,
    /// Where images are staged for reference encoding.
    pub dir: String,
    /// The externally reachable base URL of this server, e.g. `https://meta.example.com`.
    pub public_base_url: Option<String>,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 200 * 1024 * 1024,
            dir: "uploads".to_string(),
            public_base_url: None,
        }
    }
}

impl AppConfig {
    /// Rejects combinations that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider.provider.as_str() {
            "openai" => {
                if self.provider.api_url.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Invalid(
                        "provider.api_url is required for the openai provider".to_string(),
                    ));
                }
            }
            "gemini" => {
                if self.provider.api_key.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Invalid(
                        "provider.api_key is required for the gemini provider".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unsupported provider type '{other}'"
                )))
            }
        }
        if self.pipeline.max_images == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.max_images must be at least 1".to_string(),
            ));
        }
        if self.pipeline.call_timeout_secs == 0 || self.pipeline.batch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.call_timeout_secs and pipeline.batch_timeout_secs must be at least 1"
                    .to_string(),
            ));
        }
        validate_sheet_name(&self.export.sheet_name).map_err(|e| {
            ConfigError::Invalid(format!(
                "export.sheet_name '{}' is not a valid sheet name: {e}",
                self.export.sheet_name
            ))
        })?;
        if self.pipeline.image_encoding == ImageEncodingKind::Reference
            && self.uploads.public_base_url.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::Invalid(
                "uploads.public_base_url is required when pipeline.image_encoding is 'reference'"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(format!("Invalid substitution pattern: {e}")))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// - The file is `config_path_override` when given, else `config.yml` next to
///   this crate's manifest, else `config.<AI_PROVIDER>.yml` (default `openai`).
/// - `PORT` overrides the top-level port.
/// - Nested keys are overridden by `STOCKMETA_...` variables
///   (e.g. `STOCKMETA_PIPELINE__CONCURRENCY=8`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");

    let main_config_path = if let Some(override_path) = config_path_override {
        override_path.to_string()
    } else {
        let user_config_path = format!("{base_path}/config.yml");
        if std::path::Path::new(&user_config_path).exists() {
            info!("Loading user-defined configuration from '{user_config_path}'.");
            user_config_path
        } else {
            let provider = env::var("AI_PROVIDER").unwrap_or_else(|_| "openai".to_string());
            let fallback_path = format!("{base_path}/config.{provider}.yml");
            info!("'{user_config_path}' not found. Falling back to '{fallback_path}' based on AI_PROVIDER='{provider}'.");
            fallback_path
        }
    };

    let main_content = read_and_substitute(&main_config_path)?.ok_or_else(|| {
        ConfigError::NotFound(format!(
            "Main config file not found at '{main_config_path}'. Please ensure 'config.yml' exists or your AI_PROVIDER is set to load a valid template ('openai' or 'gemini')."
        ))
    })?;

    let settings = ConfigBuilder::builder()
        .add_source(File::from_str(&main_content, FileFormat::Yaml))
        // Top-level keys like PORT.
        .add_source(Environment::default())
        // Prefixed variables for nested overrides.
        .add_source(
            Environment::with_prefix("STOCKMETA")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    // Unset `${VAR}` placeholders substitute to empty strings.
    for value in [
        &mut config.provider.api_key,
        &mut config.provider.api_url,
        &mut config.uploads.public_base_url,
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            *value = None;
        }
    }

    config.validate()?;
    Ok(config)
}
