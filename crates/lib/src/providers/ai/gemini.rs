use crate::{encoding::ImagePayload, errors::InferenceError, providers::ai::VisionProvider};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

// --- Gemini-specific request and response structures ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: Blob<'a> },
    File { file_data: FileData<'a> },
}

#[derive(Serialize)]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize, Debug)]
struct PartResponse {
    #[serde(default)]
    text: Option<String>,
}

// --- Gemini Provider implementation ---

/// A provider for interacting with the Google Gemini `generateContent` API.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
    json_mode: bool,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider`.
    pub fn new(api_url: String, api_key: String) -> Result<Self, InferenceError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(InferenceError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            json_mode: false,
        })
    }

    /// The `generateContent` endpoint for a model name.
    pub fn default_api_url(model_name: &str) -> String {
        format!("https://generativelanguage.googleapis.com/v1beta/models/{model_name}:generateContent")
    }

    /// Sets `responseMimeType` to `application/json`.
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    async fn describe_image(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<String, InferenceError> {
        let image_part = match image {
            ImagePayload::Inline { mime_type, data } => Part::Inline {
                inline_data: Blob { mime_type, data },
            },
            ImagePayload::Url { url, mime_type } => Part::File {
                file_data: FileData {
                    mime_type,
                    file_uri: url,
                },
            },
        };

        let request_body = GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::Text { text: prompt }, image_part],
            }],
            generation_config: self.json_mode.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        debug!(api_url = %self.api_url, "--> Sending image to Gemini API");

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await
            .map_err(InferenceError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(InferenceError::Deserialization)?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .filter(|t| !t.trim().is_empty())
            .ok_or(InferenceError::EmptyResponse)?;

        debug!("<-- Raw response: {}", text);
        Ok(text)
    }
}
