//! Care plan generation.
//!
//! [`GenerativeCarePlanner`] walks a provider chain: each configured remote
//! provider family gets at most one attempt, in priority order (`OpenAI`, then
//! Gemini), and the keyword heuristic answers whenever no remote provider
//! produced a plan. Generation therefore never fails.

mod gemini;
pub mod heuristic;
mod openai;
mod response;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use response::{format_prompt, parse_plan};

use crate::config::GenAiConfig;
use crate::models::{CarePlan, IntakeRequest};
use crate::Result;
use std::time::Duration;

/// Remote provider families, in fallback priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// `OpenAI` chat completions.
    OpenAi,
    /// Google Gemini `generateContent`.
    Gemini,
}

impl ProviderFamily {
    /// Families in the order they are attempted.
    pub const PRIORITY: [Self; 2] = [Self::OpenAi, Self::Gemini];

    /// Resolves a configured provider name.
    ///
    /// Returns `None` for `heuristic` and unknown names, which use the heuristic
    /// planner only.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "chatgpt" => Some(Self::OpenAi),
            "gemini" | "google" => Some(Self::Gemini),
            _ => None,
        }
    }

    /// Stable name used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

/// A configured remote provider.
pub enum RemoteProvider {
    /// `OpenAI` client.
    OpenAi(OpenAiClient),
    /// Gemini client.
    Gemini(GeminiClient),
}

impl RemoteProvider {
    /// Builds the provider for `family` from configuration.
    ///
    /// Returns `None` when no API key is configured.
    #[must_use]
    pub fn from_config(family: ProviderFamily, config: &GenAiConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let client = build_http_client(config);
        let provider = match family {
            ProviderFamily::OpenAi => {
                let mut openai = OpenAiClient::new(client, api_key).with_model(&config.model);
                if let Some(endpoint) = &config.endpoint {
                    openai = openai.with_endpoint(endpoint);
                }
                Self::OpenAi(openai)
            },
            ProviderFamily::Gemini => {
                let mut gemini = GeminiClient::new(client, api_key).with_model(&config.model);
                if let Some(endpoint) = &config.endpoint {
                    gemini = gemini.with_endpoint(endpoint);
                }
                Self::Gemini(gemini)
            },
        };
        Some(provider)
    }

    /// The provider's family.
    #[must_use]
    pub const fn family(&self) -> ProviderFamily {
        match self {
            Self::OpenAi(_) => ProviderFamily::OpenAi,
            Self::Gemini(_) => ProviderFamily::Gemini,
        }
    }

    /// Sends the prompt and returns the completion text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the provider answers with a
    /// non-success status, or the response has an unexpected shape.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        match self {
            Self::OpenAi(client) => client.complete(prompt).await,
            Self::Gemini(client) => client.complete(prompt).await,
        }
    }
}

/// Builds the HTTP client shared by remote providers.
///
/// Zero timeouts are left unset.
#[must_use]
pub fn build_http_client(config: &GenAiConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build provider HTTP client: {err}");
        reqwest::Client::new()
    })
}

/// Care planner with remote providers and a heuristic fallback.
pub struct GenerativeCarePlanner {
    providers: Vec<RemoteProvider>,
}

impl GenerativeCarePlanner {
    /// Builds the provider chain from configuration.
    ///
    /// Only the configured family is attempted, and only when an API key is set.
    #[must_use]
    pub fn new(config: &GenAiConfig) -> Self {
        let configured = ProviderFamily::from_name(&config.provider);
        let providers: Vec<_> = ProviderFamily::PRIORITY
            .into_iter()
            .filter(|family| configured == Some(*family))
            .filter_map(|family| RemoteProvider::from_config(family, config))
            .collect();

        if configured.is_some() && providers.is_empty() {
            tracing::warn!(
                provider = %config.provider,
                "No API key configured; care plans will use the heuristic planner"
            );
        }
        Self::with_providers(providers)
    }

    /// Builds a planner over an explicit provider chain.
    ///
    /// Providers are attempted in the given order; a family appearing twice is
    /// attempted once.
    #[must_use]
    pub fn with_providers(providers: Vec<RemoteProvider>) -> Self {
        let mut chain: Vec<RemoteProvider> = Vec::with_capacity(providers.len());
        for provider in providers {
            if !chain.iter().any(|p| p.family() == provider.family()) {
                chain.push(provider);
            }
        }
        Self { providers: chain }
    }

    /// Builds a planner that only uses the heuristic.
    #[must_use]
    pub const fn heuristic_only() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Families that will be attempted, in order.
    #[must_use]
    pub fn provider_families(&self) -> Vec<ProviderFamily> {
        self.providers.iter().map(RemoteProvider::family).collect()
    }

    /// Generates a care plan. Never fails.
    pub async fn generate(&self, request: &IntakeRequest) -> CarePlan {
        if !self.providers.is_empty() {
            let prompt = format_prompt(request);
            for provider in &self.providers {
                let family = provider.family().as_str();
                match provider.complete(&prompt).await {
                    Ok(text) => match parse_plan(&text, request) {
                        Some(plan) => {
                            tracing::debug!(provider = family, "Care plan generated by provider");
                            metrics::counter!("care_plan_generated_total", "source" => family)
                                .increment(1);
                            return plan;
                        },
                        None => {
                            tracing::warn!(provider = family, "Provider returned an empty completion");
                            metrics::counter!("care_plan_provider_failures_total", "provider" => family)
                                .increment(1);
                        },
                    },
                    Err(e) => {
                        tracing::warn!(provider = family, error = %e, "Provider failed; trying next");
                        metrics::counter!("care_plan_provider_failures_total", "provider" => family)
                            .increment(1);
                    },
                }
            }
        }

        metrics::counter!("care_plan_generated_total", "source" => "heuristic").increment(1);
        heuristic::plan(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TriageLevel, VitalSigns};
    use test_case::test_case;

    fn genai(provider: &str, api_key: Option<&str>) -> GenAiConfig {
        GenAiConfig {
            provider: provider.to_string(),
            api_key: api_key.map(String::from),
            ..GenAiConfig::default()
        }
    }

    #[test_case("openai", Some(ProviderFamily::OpenAi); "openai")]
    #[test_case("ChatGPT", Some(ProviderFamily::OpenAi); "chatgpt alias")]
    #[test_case("gemini", Some(ProviderFamily::Gemini); "gemini")]
    #[test_case(" google ", Some(ProviderFamily::Gemini); "google alias")]
    #[test_case("heuristic", None; "heuristic")]
    #[test_case("anthropic", None; "unknown")]
    fn test_family_from_name(name: &str, expected: Option<ProviderFamily>) {
        assert_eq!(ProviderFamily::from_name(name), expected);
    }

    #[test]
    fn test_chain_requires_api_key() {
        assert!(GenerativeCarePlanner::new(&genai("openai", None)).provider_families().is_empty());
        assert!(GenerativeCarePlanner::new(&genai("openai", Some("  "))).provider_families().is_empty());
        assert_eq!(
            GenerativeCarePlanner::new(&genai("openai", Some("sk-test"))).provider_families(),
            [ProviderFamily::OpenAi]
        );
        assert_eq!(
            GenerativeCarePlanner::new(&genai("google", Some("g-test"))).provider_families(),
            [ProviderFamily::Gemini]
        );
        assert!(GenerativeCarePlanner::new(&genai("heuristic", Some("sk-test"))).provider_families().is_empty());
    }

    #[test]
    fn test_with_providers_attempts_each_family_once() {
        let config = genai("openai", Some("sk-test"));
        let providers = vec![
            RemoteProvider::from_config(ProviderFamily::OpenAi, &config).unwrap(),
            RemoteProvider::from_config(ProviderFamily::Gemini, &config).unwrap(),
            RemoteProvider::from_config(ProviderFamily::OpenAi, &config).unwrap(),
        ];
        let planner = GenerativeCarePlanner::with_providers(providers);
        assert_eq!(
            planner.provider_families(),
            [ProviderFamily::OpenAi, ProviderFamily::Gemini]
        );
    }

    #[tokio::test]
    async fn test_heuristic_only_generates() {
        let planner = GenerativeCarePlanner::heuristic_only();
        let request = IntakeRequest::new(
            vec!["high fever".into()],
            VitalSigns::new(39.4, 104, 122, 78).unwrap(),
        )
        .unwrap();
        let plan = planner.generate(&request).await;
        assert_eq!(plan.triage_level(), TriageLevel::Urgent);
        assert_eq!(plan, heuristic::plan(&request));
    }
}
