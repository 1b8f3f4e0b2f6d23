//! Google Gemini `generateContent` client

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{CompletionRequest, LanguageModel, ModelError};
use crate::config::AppConfig;

#[derive(Debug)]
pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiModel {
    /// Build a client. `timeout: None` waits indefinitely.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Technical(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ModelError> {
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            config.request_timeout(),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl LanguageModel for GeminiModel {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ModelError> {
        if request.api_key.trim().is_empty() {
            return Err(ModelError::MissingApiKey);
        }

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: request.prompt(),
                }],
            }],
        };

        log::debug!("Calling {} ({} bytes of material)", self.model, request.material.len());
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", request.api_key)
            .json(&body)
            .send()
            .map_err(|e| ModelError::Technical(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(classify_failure(status, &detail, &self.model));
        }

        let parsed: GeminiResponse = response
            .json()
            .map_err(|e| ModelError::Technical(format!("Unexpected response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Map an HTTP failure onto the user-facing error kinds
fn classify_failure(status: StatusCode, detail: &str, model: &str) -> ModelError {
    if detail.contains("API_KEY_INVALID")
        || matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        )
    {
        return ModelError::KeyRejected;
    }
    if status == StatusCode::NOT_FOUND {
        return ModelError::ModelNotFound(model.to_string());
    }

    let mut detail = detail.trim().to_string();
    if detail.len() > 200 {
        let cut = (0..=200).rev().find(|i| detail.is_char_boundary(*i)).unwrap_or(0);
        detail.truncate(cut);
    }
    ModelError::Technical(format!("HTTP {}: {}", status.as_u16(), detail))
}
