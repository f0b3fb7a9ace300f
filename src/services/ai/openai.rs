use super::{finish_response, post_json, MetadataPrompt, MetadataProvider, ProviderResponse, StopReason};
use crate::config::ProviderConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const NAME: &str = "openai";

/// OpenAI-compatible chat completions adapter. `base_url` may point at any
/// server speaking the same protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        OpenAiProvider {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl MetadataProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn generate(&self, prompt: &MetadataPrompt) -> Result<ProviderResponse> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.task,
                },
            ],
            max_tokens: self.config.max_output_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        tracing::debug!(model = %self.config.model, "OpenAI request to {}", self.config.model);

        let request = self.client.post(&url).bearer_auth(&self.config.api_key);
        let response: ChatResponse = post_json(NAME, request, &body).await?;

        let Some(choice) = response.choices.into_iter().next() else {
            return finish_response(NAME, String::new(), StopReason::Complete);
        };
        let text = choice.message.content.unwrap_or_default();
        let stop = match choice.message.refusal {
            Some(refusal) => StopReason::Blocked(format!("refusal: {}", refusal)),
            None => map_finish_reason(choice.finish_reason.as_deref()),
        };
        finish_response(NAME, text, stop)
    }
}

/// Map a native `finish_reason` to the shared taxonomy.
pub fn map_finish_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::LengthLimit,
        Some("content_filter") => StopReason::Blocked("content_filter".to_string()),
        _ => StopReason::Complete,
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some("stop")), StopReason::Complete);
        assert_eq!(map_finish_reason(Some("length")), StopReason::LengthLimit);
        assert_eq!(
            map_finish_reason(Some("content_filter")),
            StopReason::Blocked("content_filter".to_string())
        );
        assert_eq!(map_finish_reason(None), StopReason::Complete);
    }

    #[test]
    fn test_response_with_null_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "length"}]}"#,
        )
        .unwrap();
        let choice = &response.choices[0];
        assert!(choice.message.content.is_none());
        assert_eq!(choice.finish_reason.as_deref(), Some("length"));
    }
}
