//! `OpenAI` chat completions client.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// System prompt sent with every care plan request.
const SYSTEM_PROMPT: &str = "You are a clinical triage assistant generating concise care plans.";

/// `OpenAI` client.
pub struct OpenAiClient {
    /// API key.
    api_key: SecretString,
    /// API base URL.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Default API base URL.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Completion token cap.
    const MAX_TOKENS: u32 = 300;

    /// Sampling temperature.
    const TEMPERATURE: f32 = 0.2;

    /// Creates a client using the default endpoint and model.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            api_key: SecretString::from(api_key.to_string()),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client,
        }
    }

    /// Sets the API base URL. `/chat/completions` is appended per request.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sends `prompt` as the user message and returns the first choice's text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] on transport errors, non-success
    /// statuses, or a response without choices.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: Self::MAX_TOKENS,
            temperature: Self::TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    provider = "openai",
                    model = %self.model,
                    error = %e,
                    error_kind = if e.is_timeout() { "timeout" } else { "transport" },
                    "OpenAI request failed"
                );
                Error::operation("openai_request", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "openai",
                model = %self.model,
                status = %status,
                "OpenAI API returned error status"
            );
            return Err(Error::operation(
                "openai_request",
                format!("API returned status: {status} - {body}"),
            ));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::operation("openai_response", e))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| Error::operation("openai_response", "No choices in response"))
    }
}

/// Request to the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response from the Chat Completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: "prompt",
                },
            ],
            max_tokens: OpenAiClient::MAX_TOKENS,
            temperature: OpenAiClient::TEMPERATURE,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["max_tokens"], 300);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "prompt");
        assert!((value["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Triage: urgent"}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content, "Triage: urgent");
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = OpenAiClient::new(reqwest::Client::new(), "sk-test")
            .with_endpoint("http://127.0.0.1:9000/v1/");
        assert_eq!(client.endpoint, "http://127.0.0.1:9000/v1");
        assert_eq!(client.model, OpenAiClient::DEFAULT_MODEL);
    }
}
