use super::{finish_response, post_json, MetadataPrompt, MetadataProvider, ProviderResponse, StopReason};
use crate::config::ProviderConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const NAME: &str = "gemini";

/// Google Gemini `generateContent` adapter.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        GeminiProvider {
            client: Client::new(),
            config,
        }
    }

    fn request_body<'a>(&self, prompt: &'a MetadataPrompt) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: &prompt.system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt.task }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: "application/json",
                temperature: 0.7,
            },
        }
    }
}

#[async_trait]
impl MetadataProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn generate(&self, prompt: &MetadataPrompt) -> Result<ProviderResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        tracing::debug!(model = %self.config.model, "Gemini request to {}", self.config.model);

        let request = self
            .client
            .post(&url)
            .query(&[("key", &self.config.api_key)]);
        let response: GenerateResponse = post_json(NAME, request, &self.request_body(prompt)).await?;

        let (text, stop) = interpret(response);
        finish_response(NAME, text, stop)
    }
}

/// Map a native `finishReason` to the shared taxonomy.
pub fn map_finish_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("MAX_TOKENS") => StopReason::LengthLimit,
        Some(r @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII")) => {
            StopReason::Blocked(r.to_string())
        }
        _ => StopReason::Complete,
    }
}

fn interpret(response: GenerateResponse) -> (String, StopReason) {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return (String::new(), StopReason::Blocked(reason));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return (String::new(), StopReason::Complete);
    };

    let text = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();
    (text, map_finish_reason(candidate.finish_reason.as_deref()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
