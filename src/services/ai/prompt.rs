use crate::models::Coordinates;

/// System instructions plus the per-route task, ready for any provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPrompt {
    pub system: String,
    pub task: String,
}

/// Shape of the object the provider must return. Field names match
/// `EnrichedMetadata`.
const RESPONSE_SCHEMA: &str = r#"{
  "description": "string, 2-3 sentences",
  "difficulty": "Fácil | Moderada | Difícil | Muy difícil",
  "duration_text": "string",
  "route_type": "string (Senderismo, Ciclismo, Ascensión...)",
  "region": "string (autonomous community or equivalent)",
  "province": "string",
  "locality": "string (nearest town)",
  "best_season": "string",
  "access": "string (how to reach the trailhead)",
  "parking": "string",
  "public_transport": "string",
  "water_points": "string",
  "safety_tips": ["string"],
  "highlights": ["string"],
  "narrative": "string, 3-5 paragraphs",
  "seo": {"title": "string <= 60 chars", "meta_description": "string <= 155 chars", "keywords": ["string"], "slug": "kebab-case-string"},
  "primary_image": {"url": "string", "alt": "string", "width": 1200, "height": 800},
  "gallery": [{"url": "string", "alt": "string", "width": 1200, "height": 800}]
}"#;

/// Build the prompt for one route. Natural-language fields are requested
/// in `language` whatever language the title is written in.
pub fn build_prompt(title: &str, coordinates: Option<Coordinates>, language: &str) -> MetadataPrompt {
    let system = format!(
        "You are an expert hiking guide and travel writer. You describe outdoor routes \
accurately and never make up facts you cannot infer from the route name and location.\n\
Respond with exactly one valid JSON object and nothing else: no markdown fences, no \
commentary before or after it.\n\
The object must follow this schema:\n{schema}\n\
Write every natural-language value in {language}, regardless of the language of the \
route name or of these instructions.\n\
Image rules: never invent image URLs. Only use photo URLs returned by the Google Places \
photo service for a real place near the route. If you do not have one, leave \"url\" \
empty and describe the desired picture in \"alt\" (a searchable place name works best).",
        schema = RESPONSE_SCHEMA,
        language = language,
    );

    let location = match coordinates {
        Some(c) => format!(
            "The route starts at latitude {:.5}, longitude {:.5}.",
            c.lat, c.lng
        ),
        None => "The starting coordinates are unknown; infer the area from the name.".to_string(),
    };

    let task = format!(
        "Generate the route description for: \"{}\".\n{}\nReturn only the JSON object.",
        title.trim(),
        location
    );

    MetadataPrompt { system, task }
}
