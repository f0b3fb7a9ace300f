use crate::models::{
    EnrichedMetadata, EnrichmentSource, GeometrySummary, ImageReference, RouteDraft, Waypoint,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

pub const UNTITLED_ROUTE: &str = "Ruta sin título";

/// Everything the assembler merges into a draft.
pub struct DraftParts {
    pub title: Option<String>,
    pub description: Option<String>,
    pub geometry: GeometrySummary,
    pub waypoints: Vec<Waypoint>,
    pub metadata: EnrichedMetadata,
    pub primary_image: ImageReference,
    pub gallery: Vec<ImageReference>,
    pub enrichment_source: EnrichmentSource,
    pub diagnostics: Vec<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Title shown for the route: the one decoded from the file, else the SEO
/// title the metadata suggested, else a placeholder.
pub fn resolve_title(decoded: Option<&str>, metadata: &EnrichedMetadata) -> String {
    non_blank(decoded.map(str::to_string))
        .or_else(|| non_blank(Some(metadata.seo.title.clone())))
        .unwrap_or_else(|| UNTITLED_ROUTE.to_string())
}

/// Merge geometry, waypoints, metadata and resolved images into a draft.
/// No I/O; the only inputs not taken from `parts` are the id and the
/// timestamp.
pub fn assemble(parts: DraftParts) -> RouteDraft {
    let DraftParts {
        title,
        description,
        geometry,
        waypoints,
        metadata,
        primary_image,
        gallery,
        enrichment_source,
        diagnostics,
    } = parts;

    let title = resolve_title(title.as_deref(), &metadata);
    let description = non_blank(description).unwrap_or_else(|| metadata.description.clone());
    let duration_text = non_blank(Some(metadata.duration_text))
        .unwrap_or_else(|| geometry.estimated_duration.clone());
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    RouteDraft {
        id: Uuid::new_v4(),
        generated_at,
        title,
        description,
        geometry,
        waypoints,
        difficulty: metadata.difficulty,
        duration_text,
        route_type: metadata.route_type,
        region: metadata.region,
        province: metadata.province,
        locality: metadata.locality,
        best_season: metadata.best_season,
        access: metadata.access,
        parking: metadata.parking,
        public_transport: metadata.public_transport,
        water_points: metadata.water_points,
        safety_tips: metadata.safety_tips,
        highlights: metadata.highlights,
        narrative: metadata.narrative,
        seo: metadata.seo,
        primary_image,
        gallery,
        enrichment_source,
        diagnostics,
    }
}
