use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The uploaded file carries no usable geometry. The only fatal error.
    #[error("Track parse error: {0}")]
    Parse(String),

    #[error("Metadata provider error: {0}")]
    Provider(String),

    #[error("Metadata provider blocked the request: {0}")]
    BlockedContent(String),

    #[error("Metadata provider response truncated: {0}")]
    Truncated(String),

    #[error("Unrecoverable metadata response: {message} (near: {excerpt:?})")]
    EnrichmentParse { message: String, excerpt: String },

    #[error("Image resolution failed: {0}")]
    ImageResolution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors raised while obtaining AI metadata. These never abort a
    /// request; the pipeline degrades to the fallback synthesizer instead.
    pub fn is_enrichment_failure(&self) -> bool {
        matches!(
            self,
            AppError::Provider(_)
                | AppError::BlockedContent(_)
                | AppError::Truncated(_)
                | AppError::EnrichmentParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_failures_are_non_fatal() {
        assert!(AppError::Provider("HTTP 500".into()).is_enrichment_failure());
        assert!(AppError::BlockedContent("SAFETY".into()).is_enrichment_failure());
        assert!(AppError::Truncated("MAX_TOKENS".into()).is_enrichment_failure());
        assert!(AppError::EnrichmentParse {
            message: "eof".into(),
            excerpt: "{\"a\"".into()
        }
        .is_enrichment_failure());

        assert!(!AppError::Parse("no points".into()).is_enrichment_failure());
        assert!(!AppError::ImageResolution("lookup".into()).is_enrichment_failure());
    }

    #[test]
    fn test_enrichment_parse_display_includes_excerpt() {
        let err = AppError::EnrichmentParse {
            message: "EOF while parsing an object".into(),
            excerpt: "\"region\": \"Hue".into(),
        };
        let text = err.to_string();
        assert!(text.contains("EOF while parsing"));
        assert!(text.contains("Hue"));
    }
}
