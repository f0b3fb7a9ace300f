use crate::constants::*;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Generative text backends the metadata provider can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
    ];

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => GEMINI_DEFAULT_MODEL,
            ProviderKind::OpenAi => OPENAI_DEFAULT_MODEL,
            ProviderKind::Anthropic => ANTHROPIC_DEFAULT_MODEL,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => GEMINI_BASE_URL,
            ProviderKind::OpenAi => OPENAI_BASE_URL,
            ProviderKind::Anthropic => ANTHROPIC_BASE_URL,
        }
    }

    /// Env var holding this provider's credential.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            _ => Err(format!(
                "Invalid AI provider: {}. Use 'gemini', 'openai' or 'anthropic'",
                s
            )),
        }
    }
}

/// Resolved settings for the active metadata provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` when no credential is configured for any provider.
    pub provider: Option<ProviderConfig>,
    pub maps_api_key: Option<String>,
    pub maps_base_url: String,
    /// Language the provider must write natural-language fields in.
    pub metadata_language: String,
    pub ai_timeout_secs: u64,
    pub image_timeout_secs: u64,
    pub gallery_concurrency: usize,
    pub place_cache_ttl: u64,
    pub place_cache_max_entries: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            maps_api_key: None,
            maps_base_url: MAPS_API_BASE_URL.to_string(),
            metadata_language: DEFAULT_METADATA_LANGUAGE.to_string(),
            ai_timeout_secs: DEFAULT_AI_TIMEOUT_SECONDS,
            image_timeout_secs: DEFAULT_IMAGE_TIMEOUT_SECONDS,
            gallery_concurrency: DEFAULT_GALLERY_CONCURRENCY,
            place_cache_ttl: DEFAULT_PLACE_CACHE_TTL_SECONDS,
            place_cache_max_entries: DEFAULT_PLACE_CACHE_MAX_ENTRIES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let gallery_concurrency: usize = env::var("GALLERY_CONCURRENCY")
            .unwrap_or_else(|_| DEFAULT_GALLERY_CONCURRENCY.to_string())
            .parse()
            .map_err(|_| "Invalid GALLERY_CONCURRENCY")?;

        if gallery_concurrency == 0 || gallery_concurrency > MAX_GALLERY_CONCURRENCY {
            return Err(format!(
                "GALLERY_CONCURRENCY must be between 1 and {}",
                MAX_GALLERY_CONCURRENCY
            ));
        }

        Ok(Config {
            provider: provider_from_env()?,
            maps_api_key: non_empty_var("GOOGLE_MAPS_API_KEY"),
            maps_base_url: non_empty_var("MAPS_BASE_URL")
                .unwrap_or_else(|| MAPS_API_BASE_URL.to_string()),
            metadata_language: non_empty_var("METADATA_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_METADATA_LANGUAGE.to_string()),
            ai_timeout_secs: env::var("AI_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_AI_TIMEOUT_SECONDS.to_string())
                .parse()
                .map_err(|_| "Invalid AI_TIMEOUT_SECS")?,
            image_timeout_secs: env::var("IMAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_IMAGE_TIMEOUT_SECONDS.to_string())
                .parse()
                .map_err(|_| "Invalid IMAGE_TIMEOUT_SECS")?,
            gallery_concurrency,
            place_cache_ttl: env::var("PLACE_CACHE_TTL")
                .unwrap_or_else(|_| DEFAULT_PLACE_CACHE_TTL_SECONDS.to_string())
                .parse()
                .map_err(|_| "Invalid PLACE_CACHE_TTL")?,
            place_cache_max_entries: env::var("PLACE_CACHE_MAX_ENTRIES")
                .unwrap_or_else(|_| DEFAULT_PLACE_CACHE_MAX_ENTRIES.to_string())
                .parse()
                .map_err(|_| "Invalid PLACE_CACHE_MAX_ENTRIES")?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Pick the active provider: an explicit `AI_PROVIDER` wins when its key is
/// present, otherwise the first provider with a credential is used.
fn provider_from_env() -> Result<Option<ProviderConfig>, String> {
    let requested: Option<ProviderKind> = non_empty_var("AI_PROVIDER")
        .map(|v| v.parse())
        .transpose()?;

    let kind = match requested {
        Some(kind) if non_empty_var(kind.api_key_var()).is_some() => Some(kind),
        Some(kind) => {
            let alternative = ProviderKind::ALL
                .into_iter()
                .find(|k| non_empty_var(k.api_key_var()).is_some());
            if let Some(alt) = alternative {
                tracing::warn!(
                    "AI_PROVIDER={} but {} is not set; using {} instead",
                    kind,
                    kind.api_key_var(),
                    alt
                );
            }
            alternative
        }
        None => ProviderKind::ALL
            .into_iter()
            .find(|k| non_empty_var(k.api_key_var()).is_some()),
    };

    let Some(kind) = kind else {
        return Ok(None);
    };

    let api_key = non_empty_var(kind.api_key_var()).unwrap_or_default();
    // An explicit model only applies to the provider it was chosen for.
    let model = match requested {
        Some(r) if r != kind => kind.default_model().to_string(),
        _ => non_empty_var("AI_MODEL").unwrap_or_else(|| kind.default_model().to_string()),
    };

    Ok(Some(ProviderConfig {
        kind,
        model,
        api_key,
        base_url: non_empty_var("AI_BASE_URL")
            .unwrap_or_else(|| kind.default_base_url().to_string()),
        max_output_tokens: env::var("AI_MAX_OUTPUT_TOKENS")
            .unwrap_or_else(|_| DEFAULT_AI_MAX_OUTPUT_TOKENS.to_string())
            .parse()
            .map_err(|_| "Invalid AI_MAX_OUTPUT_TOKENS")?,
    }))
}
