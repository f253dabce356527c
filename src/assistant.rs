use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::AssistantConfig;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant API key is not configured")]
    NotConfigured,

    #[error("{} - {body}", .status.as_u16())]
    Status { status: StatusCode, body: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion response had no choices")]
    EmptyCompletion,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    content: String,
}

/// Chat-completions client used for question generation and code correction
///
/// Both operations are best-effort enrichments: callers render failures into
/// text with `render_questions` / `render_correction` instead of failing.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    questions_timeout: Duration,
}

impl AssistantClient {
    pub fn new(config: &AssistantConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout.into())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            model: config.model.clone(),
            questions_timeout: config.questions_timeout.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends a single user message and returns the trimmed reply
    ///
    /// `timeout` overrides the client-wide request timeout.
    async fn complete(
        &self,
        prompt: String,
        timeout: Option<Duration>,
    ) -> Result<String, AssistantError> {
        let api_key = self.api_key.as_deref().ok_or(AssistantError::NotConfigured)?;
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        log::debug!("Assistant request to {url}");
        let mut request = self.client.post(&url).bearer_auth(api_key).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Status { status, body });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or(AssistantError::EmptyCompletion)
    }

    /// Asks for comprehension questions about `code`, one per line of the reply
    pub async fn generate_questions(&self, code: &str) -> Result<Vec<String>, AssistantError> {
        let reply = self
            .complete(
                format!(
                    "Analyze the following code and generate 5 conceptual or practical questions:\n\n{code}"
                ),
                Some(self.questions_timeout),
            )
            .await?;

        Ok(reply
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Asks for a corrected and improved version of `code`
    pub async fn correct_code(&self, code: &str) -> Result<String, AssistantError> {
        self.complete(
            format!("Correct the following code and improve it:\n\n{code}"),
            None,
        )
        .await
    }
}

/// Degrades a failed question request to a single error entry
pub fn render_questions(result: Result<Vec<String>, AssistantError>) -> Vec<String> {
    match result {
        Ok(questions) => questions,
        Err(e) => {
            log::warn!("Question generation failed: {e}");
            match &e {
                AssistantError::Status { .. } => vec![format!("Error: {e}")],
                _ => vec![format!("Error generating questions: {e}")],
            }
        }
    }
}

/// Degrades a failed correction request to an error string
pub fn render_correction(result: Result<String, AssistantError>) -> String {
    result.unwrap_or_else(|e| {
        log::warn!("Code correction failed: {e}");
        format!("Error: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_questions() {
        let ok = render_questions(Ok(vec!["Why?".to_string()]));
        assert_eq!(ok, vec!["Why?".to_string()]);

        let status = render_questions(Err(AssistantError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "bad key".to_string(),
        }));
        assert_eq!(status, vec!["Error: 401 - bad key".to_string()]);

        let unconfigured = render_questions(Err(AssistantError::NotConfigured));
        assert_eq!(
            unconfigured,
            vec!["Error generating questions: assistant API key is not configured".to_string()]
        );
    }

    #[test]
    fn test_render_correction() {
        assert_eq!(render_correction(Ok("fixed".to_string())), "fixed");
        assert_eq!(
            render_correction(Err(AssistantError::EmptyCompletion)),
            "Error: completion response had no choices"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_client_makes_no_request() {
        let client = AssistantClient::new(&AssistantConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            api_key: Some(String::new()),
            ..AssistantConfig::default()
        })
        .unwrap();

        assert!(!client.is_configured());
        let err = client.correct_code("x = 1").await.unwrap_err();
        assert!(matches!(err, AssistantError::NotConfigured));
    }
}
