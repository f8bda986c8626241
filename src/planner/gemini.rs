//! Google Gemini `generateContent` client.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Gemini client.
pub struct GeminiClient {
    api_key: SecretString,
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Default models base URL.
    pub const DEFAULT_ENDPOINT: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/models";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";

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

    /// Sets the models base URL. `/{model}:generateContent` is appended per request.
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

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }

    /// Sends `prompt` and returns the first candidate's first text part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] on transport errors, non-success
    /// statuses, or a response without a text part.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    provider = "gemini",
                    model = %self.model,
                    error = %e,
                    error_kind = if e.is_timeout() { "timeout" } else { "transport" },
                    "Gemini request failed"
                );
                Error::operation("gemini_request", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "gemini",
                model = %self.model,
                status = %status,
                "Gemini API returned error status"
            );
            return Err(Error::operation(
                "gemini_request",
                format!("API returned status: {status} - {body}"),
            ));
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::operation("gemini_response", e))?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text.trim().to_string())
            .ok_or_else(|| Error::operation("gemini_response", "No candidates in response"))
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_includes_model() {
        let client = GeminiClient::new(reqwest::Client::new(), "g-test")
            .with_endpoint("http://127.0.0.1:9000/models/")
            .with_model("gemini-pro");
        assert_eq!(
            client.url(),
            "http://127.0.0.1:9000/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"- ECG"}],"role":"model"}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.candidates[0].content.parts[0].text, "- ECG");

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.candidates.is_empty());
    }
}
