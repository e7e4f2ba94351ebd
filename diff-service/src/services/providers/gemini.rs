//! Gemini provider implementation.
//!
//! Calls `generateContent` either through Vertex AI (project/region scoped,
//! Google credentials) or through the Generative Language API (API key).

use super::{FinishReason, ProviderError, ProviderResponse, TextProvider};
use crate::services::auth::AccessTokenSource;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Generative Language API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Where requests are sent and how they are authorized.
pub enum GeminiBackend {
    VertexAi {
        project_id: String,
        region: String,
        tokens: Arc<AccessTokenSource>,
    },
    ApiKey {
        api_key: Secret<String>,
    },
}

/// Gemini provider configuration.
pub struct GeminiConfig {
    pub backend: GeminiBackend,
    pub model: String,
    /// Overrides the public endpoint (tests, private endpoints).
    pub base_url: Option<String>,
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig, client: Client) -> Result<Self, ProviderError> {
        if config.model.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "model name is empty".to_string(),
            ));
        }

        match &config.backend {
            GeminiBackend::VertexAi {
                project_id, region, ..
            } => {
                if project_id.trim().is_empty() || region.trim().is_empty() {
                    return Err(ProviderError::NotConfigured(
                        "Vertex AI needs a project and a region".to_string(),
                    ));
                }
            }
            GeminiBackend::ApiKey { api_key } => {
                if api_key.expose_secret().is_empty() {
                    return Err(ProviderError::NotConfigured(
                        "Gemini API key not configured".to_string(),
                    ));
                }
            }
        }

        Ok(Self { config, client })
    }

    /// Build the `generateContent` URL for the configured backend.
    fn api_url(&self) -> String {
        let model = &self.config.model;
        match &self.config.backend {
            GeminiBackend::VertexAi {
                project_id, region, ..
            } => {
                let base = self.config.base_url.clone().unwrap_or_else(|| {
                    if region == "global" {
                        "https://aiplatform.googleapis.com".to_string()
                    } else {
                        format!("https://{}-aiplatform.googleapis.com", region)
                    }
                });
                format!(
                    "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                    base.trim_end_matches('/'),
                    project_id,
                    region,
                    model
                )
            }
            GeminiBackend::ApiKey { .. } => {
                let base = self
                    .config
                    .base_url
                    .as_deref()
                    .unwrap_or(GEMINI_API_BASE)
                    .trim_end_matches('/');
                format!("{}/models/{}:generateContent", base, model)
            }
        }
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ProviderError> {
        match &self.config.backend {
            GeminiBackend::VertexAi { tokens, .. } => {
                let headers = tokens
                    .headers()
                    .await
                    .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
                Ok(request.headers(headers))
            }
            GeminiBackend::ApiKey { api_key } => {
                Ok(request.query(&[("key", api_key.expose_secret().as_str())]))
            }
        }
    }
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("STOP") | None => FinishReason::Complete,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT")
        | Some("SPII") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Error,
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let builder = self.client.post(self.api_url()).json(&request);
        let response = self
            .authorize(builder)
            .await?
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        if let Some(feedback) = &api_response.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                tracing::warn!(block_reason = %reason, "Gemini blocked the prompt");
                return Err(ProviderError::ContentFiltered);
            }
        }

        let candidate = api_response.candidates.first();

        // Gemini may split one answer across several parts.
        let text = candidate
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty());

        let usage = api_response.usage_metadata.unwrap_or_default();

        let finish_reason = map_finish_reason(candidate.and_then(|c| c.finish_reason.as_deref()));

        if finish_reason == FinishReason::ContentFilter {
            return Err(ProviderError::ContentFiltered);
        }

        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
            finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(region: &str) -> GeminiTextProvider {
        GeminiTextProvider::new(
            GeminiConfig {
                backend: GeminiBackend::VertexAi {
                    project_id: "proj".to_string(),
                    region: region.to_string(),
                    tokens: Arc::new(AccessTokenSource::Static(Secret::new("t".to_string()))),
                },
                model: "gemini-2.5-flash".to_string(),
                base_url: None,
            },
            Client::new(),
        )
        .unwrap()
    }

    #[test]
    fn vertex_url_uses_regional_host() {
        assert_eq!(
            vertex("europe-west1").api_url(),
            concat!(
                "https://europe-west1-aiplatform.googleapis.com/v1/projects/proj",
                "/locations/europe-west1/publishers/google/models/gemini-2.5-flash:generateContent"
            )
        );
    }

    #[test]
    fn vertex_global_region_uses_global_host() {
        assert!(vertex("global")
            .api_url()
            .starts_with("https://aiplatform.googleapis.com/v1/projects/proj/locations/global/"));
    }

    #[test]
    fn api_key_url_targets_generative_language() {
        let provider = GeminiTextProvider::new(
            GeminiConfig {
                backend: GeminiBackend::ApiKey {
                    api_key: Secret::new("k".to_string()),
                },
                model: "gemini-2.5-flash".to_string(),
                base_url: None,
            },
            Client::new(),
        )
        .unwrap();
        assert_eq!(
            provider.api_url(),
            concat!(
                "https://generativelanguage.googleapis.com",
                "/v1beta/models/gemini-2.5-flash:generateContent"
            )
        );
    }

    #[test]
    fn missing_project_is_not_configured() {
        let result = GeminiTextProvider::new(
            GeminiConfig {
                backend: GeminiBackend::VertexAi {
                    project_id: String::new(),
                    region: "europe-west1".to_string(),
                    tokens: Arc::new(AccessTokenSource::Static(Secret::new("t".to_string()))),
                },
                model: "gemini-2.5-flash".to_string(),
                base_url: None,
            },
            Client::new(),
        );
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn finish_reasons_map_to_outcomes() {
        assert_eq!(map_finish_reason(Some("STOP")), FinishReason::Complete);
        assert_eq!(map_finish_reason(None), FinishReason::Complete);
        assert_eq!(map_finish_reason(Some("MAX_TOKENS")), FinishReason::Length);
        assert_eq!(map_finish_reason(Some("SAFETY")), FinishReason::ContentFilter);
        assert_eq!(map_finish_reason(Some("OTHER")), FinishReason::Error);
    }
}
