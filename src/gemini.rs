use std::time::Duration;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::GeminiConfig;

/// Image bytes already base64-encoded, sent inline with the prompt.
#[derive(Debug, Clone, Copy)]
pub struct InlineImage<'a> {
    pub mime_type: &'a str,
    pub data_base64: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("request to model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyResponse,
}

/// A text (+ optional image) in, free text out generative model.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<InlineImage<'_>>,
    ) -> Result<String, ModelError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(cfg: &GeminiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            endpoint: format!("{}/models/{}:generateContent", cfg.base_url, cfg.model),
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(skip_all, fields(with_image = image.is_some()))]
    async fn generate(
        &self,
        prompt: &str,
        image: Option<InlineImage<'_>>,
    ) -> Result<String, ModelError> {
        let body = GenerateContentRequest::new(prompt, image);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "gemini request rejected");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: truncate(&text, 500).to_string(),
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed.into_text()?;
        debug!(chars = text.len(), "gemini responded");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str, image: Option<InlineImage<'a>>) -> Self {
        let mut parts = vec![Part::Text { text: prompt }];
        if let Some(img) = image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: img.mime_type,
                    data: img.data_base64,
                },
            });
        }
        Self {
            contents: [Content { parts }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Joins the text parts of the first candidate.
    fn into_text(self) -> Result<String, ModelError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_places_image_after_prompt() {
        let body = GenerateContentRequest::new(
            "describe",
            Some(InlineImage {
                mime_type: "image/png",
                data_base64: "AAAA",
            }),
        );
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "parts": [
                        { "text": "describe" },
                        { "inline_data": { "mime_type": "image/png", "data": "AAAA" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn request_body_without_image_has_single_part() {
        let value = serde_json::to_value(GenerateContentRequest::new("hi", None)).unwrap();
        assert_eq!(value["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "  {\"a\":" }, { "text": "1}\n" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(resp.into_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn blocked_or_empty_response_is_an_error() {
        let resp: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert!(matches!(resp.into_text(), Err(ModelError::EmptyResponse)));

        let resp: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [{ "finishReason": "SAFETY" }] }))
                .unwrap();
        assert!(matches!(resp.into_text(), Err(ModelError::EmptyResponse)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("héllo", 2), "h");
    }

    #[test]
    fn client_builds_endpoint_from_config() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: "k".into(),
            model: "gemini-2.5-flash".into(),
            base_url: "http://localhost:1/v1beta".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            client.endpoint,
            "http://localhost:1/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
