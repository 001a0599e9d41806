use crate::config::AppConfig;
use crate::error::{AnalysisError, Result};
use crate::models::*;
use async_trait::async_trait;
use reqwest::Client;

/// The remote document-understanding service. One call is one round trip;
/// implementations never retry.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Returns the raw response text. It is not guaranteed to be JSON.
    async fn call(&self, request: &AnalysisRequest) -> Result<String>;
}

pub struct GeminiService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl AnalysisClient for GeminiService {
    async fn call(&self, request: &AnalysisRequest) -> Result<String> {
        let body = GeminiRequest::from(request);

        log::info!(
            "Calling {} with {} questions",
            self.model,
            request.question_texts.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(AnalysisError::Transport(describe_api_error(status, &error_text)));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        Ok(extract_text(gemini_response))
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(response: GeminiResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .map(|candidate| {
            candidate
                .content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn describe_api_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<GeminiErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            format!("Gemini API error ({}): {}", status, envelope.error.message)
        }
        _ => format!("Gemini API error ({}): {}", status, body.trim()),
    }
}
