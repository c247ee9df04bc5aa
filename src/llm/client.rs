use crate::config::AppConfig;
use crate::error::{MetricsError, Result};
use crate::llm::types::*;
use reqwest::Client;

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Builds a client with the configured key, base URL and timeout.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| MetricsError::Config {
            key: "GEMINI_API_KEY".to_string(),
            details: "not set".to_string(),
        })?;

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub(crate) async fn generate_content(
        &self,
        model: &str,
        system_prompt: &str,
        messages: Vec<Content>,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: messages,
            system_instruction: Some(Content::user(system_prompt)),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema,
                temperature: Some(0.2),
            },
        };

        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(MetricsError::NarrativeFailed(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        first_text(body)
    }
}

fn first_text(body: GenerateContentResponse) -> Result<String> {
    let part = body
        .candidates
        .ok_or_else(|| MetricsError::NarrativeFailed("No candidates returned".to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| MetricsError::NarrativeFailed("Empty candidates list".to_string()))?
        .content
        .parts
        .into_iter()
        .next()
        .ok_or_else(|| MetricsError::NarrativeFailed("No parts in content".to_string()))?;

    match part {
        Part::Text { text } => Ok(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_api_key() {
        let err = GeminiClient::from_config(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, MetricsError::Config { .. }));
    }

    #[test]
    fn test_from_config_trims_base_url() {
        let config = AppConfig {
            api_key: Some("k".to_string()),
            base_url: "http://localhost:8080/v1beta/".to_string(),
            ..AppConfig::default()
        };
        let client = GeminiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1beta");
    }

    #[test]
    fn test_first_text_errors() {
        let none = GenerateContentResponse { candidates: None };
        assert!(first_text(none).is_err());

        let empty = GenerateContentResponse {
            candidates: Some(Vec::new()),
        };
        assert!(first_text(empty).is_err());

        let ok = GenerateContentResponse {
            candidates: Some(vec![Candidate {
                content: Content::model("{\"analysis\":\"x\"}"),
            }]),
        };
        assert_eq!(first_text(ok).unwrap(), "{\"analysis\":\"x\"}");
    }
}
