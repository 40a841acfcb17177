//! # Vision Provider Factory
//!
//! Builds the single inference client the server uses for its whole lifetime
//! from the `provider` section of the configuration.

use crate::config::ProviderConfig;
use stockmeta::providers::ai::{gemini::GeminiProvider, openai::OpenAiProvider, VisionProvider};
use tracing::info;

/// Creates the configured `VisionProvider`.
pub fn create_provider(config: &ProviderConfig) -> anyhow::Result<Box<dyn VisionProvider>> {
    let provider: Box<dyn VisionProvider> = match config.provider.as_str() {
        "openai" => {
            let api_url = config.api_url.clone().ok_or_else(|| {
                anyhow::anyhow!("api_url is required for the openai provider")
            })?;
            info!(api_url = %api_url, model = %config.model_name, "Configuring OpenAI-compatible provider");
            Box::new(
                OpenAiProvider::new(api_url, config.api_key.clone(), config.model_name.clone())?
                    .with_json_mode(config.json_mode),
            )
        }
        "gemini" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("api_key is required for the gemini provider"))?;
            // If api_url is not provided in config, construct it from the model name.
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| GeminiProvider::default_api_url(&config.model_name));
            info!(api_url = %api_url, "Configuring Gemini provider");
            Box::new(GeminiProvider::new(api_url, api_key)?.with_json_mode(config.json_mode))
        }
        other => {
            return Err(anyhow::anyhow!("Unsupported AI provider type '{other}'"));
        }
    };
    Ok(provider)
}
