use super::{finish_response, post_json, MetadataPrompt, MetadataProvider, ProviderResponse, StopReason};
use crate::config::ProviderConfig;
use crate::constants::ANTHROPIC_API_VERSION;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const NAME: &str = "anthropic";

/// Anthropic Messages API adapter.
#[derive(Clone)]
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Self {
        AnthropicProvider {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl MetadataProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn generate(&self, prompt: &MetadataPrompt) -> Result<ProviderResponse> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));

        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_output_tokens,
            system: &prompt.system,
            messages: vec![Message {
                role: "user",
                content: &prompt.task,
            }],
        };

        tracing::debug!(model = %self.config.model, "Anthropic request to {}", self.config.model);

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION);
        let response: MessagesResponse = post_json(NAME, request, &body).await?;

        let text = collect_text(&response.content);
        finish_response(NAME, text, map_stop_reason(response.stop_reason.as_deref()))
    }
}

/// Map a native `stop_reason` to the shared taxonomy.
pub fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("max_tokens") => StopReason::LengthLimit,
        Some("refusal") => StopReason::Blocked("refusal".to_string()),
        _ => StopReason::Complete,
    }
}

fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter(|b| b.block_type == "text")
        .filter_map(|b| b.text.as_deref())
        .collect()
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason(Some("end_turn")), StopReason::Complete);
        assert_eq!(map_stop_reason(Some("max_tokens")), StopReason::LengthLimit);
        assert_eq!(
            map_stop_reason(Some("refusal")),
            StopReason::Blocked("refusal".to_string())
        );
    }

    #[test]
    fn test_collect_text_skips_other_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content": [{"type": "thinking", "thinking": "..."}, {"type": "text", "text": "{\"a\": 1}"}], "stop_reason": "end_turn"}"#,
        )
        .unwrap();
        assert_eq!(collect_text(&response.content), "{\"a\": 1}");
    }
}
