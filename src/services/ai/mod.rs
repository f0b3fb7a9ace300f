pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod prompt;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use prompt::{build_prompt, MetadataPrompt};

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Raw text returned by a provider. `truncated` marks output cut short by
/// the length limit; it still goes through repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub text: String,
    pub truncated: bool,
}

/// One generative text backend: prompt in, raw text out.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short identifier recorded in the draft ("gemini", "openai", ...).
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &MetadataPrompt) -> Result<ProviderResponse>;
}

/// Provider-neutral reading of a native stop reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Complete,
    LengthLimit,
    Blocked(String),
}

/// Apply the stop-reason rules shared by every adapter.
pub fn finish_response(provider: &str, text: String, stop: StopReason) -> Result<ProviderResponse> {
    match stop {
        StopReason::Blocked(reason) => Err(AppError::BlockedContent(format!(
            "{} stopped with {}",
            provider, reason
        ))),
        StopReason::LengthLimit if text.trim().is_empty() => Err(AppError::Truncated(format!(
            "{} hit the output limit before producing any text",
            provider
        ))),
        StopReason::LengthLimit => {
            tracing::warn!(
                provider = provider,
                chars = text.len(),
                "{} response truncated at output limit, passing {} chars to repair",
                provider,
                text.len()
            );
            Ok(ProviderResponse {
                text,
                truncated: true,
            })
        }
        StopReason::Complete if text.trim().is_empty() => Err(AppError::Provider(format!(
            "{} returned an empty response",
            provider
        ))),
        StopReason::Complete => Ok(ProviderResponse {
            text,
            truncated: false,
        }),
    }
}

/// Send a JSON request and decode the JSON reply, mapping transport and
/// HTTP failures to `AppError::Provider`.
pub(crate) async fn post_json<B, R>(provider: &str, request: RequestBuilder, body: &B) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| AppError::Provider(format!("{} request failed: {}", provider, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::warn!(
            provider = provider,
            status = %status,
            "{} API HTTP error {}: {}",
            provider, status, error_text
        );
        return Err(AppError::Provider(format!(
            "{} HTTP {}: {}",
            provider, status, error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Provider(format!("{} returned an unreadable body: {}", provider, e)))
}

/// Construct the adapter selected by configuration.
pub fn build_provider(config: &ProviderConfig) -> Box<dyn MetadataProvider> {
    match config.kind {
        ProviderKind::Gemini => Box::new(GeminiProvider::new(config.clone())),
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(config.clone())),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(config.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_response_rules() {
        let ok = finish_response("gemini", "{}".into(), StopReason::Complete).unwrap();
        assert!(!ok.truncated);

        let partial = finish_response("gemini", "{\"a\": ".into(), StopReason::LengthLimit).unwrap();
        assert!(partial.truncated);
        assert_eq!(partial.text, "{\"a\": ");

        assert!(matches!(
            finish_response("gemini", "  ".into(), StopReason::LengthLimit),
            Err(AppError::Truncated(_))
        ));
        assert!(matches!(
            finish_response("gemini", "text".into(), StopReason::Blocked("SAFETY".into())),
            Err(AppError::BlockedContent(_))
        ));
        assert!(matches!(
            finish_response("gemini", String::new(), StopReason::Complete),
            Err(AppError::Provider(_))
        ));
    }

    #[test]
    fn test_build_provider_uses_configured_kind() {
        for kind in ProviderKind::ALL {
            let provider = build_provider(&ProviderConfig {
                kind,
                model: kind.default_model().to_string(),
                api_key: "test-key".to_string(),
                base_url: kind.default_base_url().to_string(),
                max_output_tokens: 1024,
            });
            assert_eq!(provider.name(), kind.to_string());
        }
    }
}
