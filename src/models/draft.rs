use crate::models::{GeometrySummary, ImageReference, SeoFields, Waypoint};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the descriptive metadata of a draft came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EnrichmentSource {
    Ai { provider: String },
    Fallback,
}

/// Fully assembled route description handed back to the caller. Nothing in
/// here is optional-null: absent metadata is an empty string or list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDraft {
    pub id: Uuid,
    /// RFC 3339 timestamp of assembly
    pub generated_at: String,
    pub title: String,
    pub description: String,

    #[serde(flatten)]
    pub geometry: GeometrySummary,
    pub waypoints: Vec<Waypoint>,

    pub difficulty: String,
    pub duration_text: String,
    pub route_type: String,
    pub region: String,
    pub province: String,
    pub locality: String,
    pub best_season: String,
    pub access: String,
    pub parking: String,
    pub public_transport: String,
    pub water_points: String,
    pub safety_tips: Vec<String>,
    pub highlights: Vec<String>,
    pub narrative: String,
    pub seo: SeoFields,

    pub primary_image: ImageReference,
    pub gallery: Vec<ImageReference>,

    pub enrichment_source: EnrichmentSource,
    /// Ordered, human-readable notes on which stages ran and which
    /// fallbacks triggered.
    pub diagnostics: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_source_tagging() {
        let ai = EnrichmentSource::Ai {
            provider: "gemini".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&ai).unwrap(),
            serde_json::json!({"kind": "ai", "provider": "gemini"})
        );
        assert_eq!(
            serde_json::to_value(EnrichmentSource::Fallback).unwrap(),
            serde_json::json!({"kind": "fallback"})
        );
    }
}
