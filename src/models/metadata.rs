use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// An image to show with the route. After resolution `url` always points
/// at an allow-listed photo or static-map endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct ImageReference {
    pub url: String,
    pub alt: String,
    pub width: u32,
    pub height: u32,
}

impl ImageReference {
    pub fn new(url: impl Into<String>, alt: impl Into<String>, width: u32, height: u32) -> Self {
        ImageReference {
            url: url.into(),
            alt: alt.into(),
            width,
            height,
        }
    }
}

/// Providers return images either as bare URL strings or as objects with
/// loosely typed sizes; both are accepted.
impl<'de> Deserialize<'de> for ImageReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Object {
            #[serde(default, alias = "src", deserialize_with = "lenient_string")]
            url: String,
            #[serde(default, alias = "caption", alias = "alt_text", deserialize_with = "lenient_string")]
            alt: String,
            #[serde(default, deserialize_with = "lenient_u32")]
            width: u32,
            #[serde(default, deserialize_with = "lenient_u32")]
            height: u32,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Url(String),
            Object(Object),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Url(url) => ImageReference {
                url,
                ..Default::default()
            },
            Repr::Object(o) => ImageReference {
                url: o.url,
                alt: o.alt,
                width: o.width,
                height: o.height,
            },
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SeoFields {
    #[serde(alias = "seo_title", alias = "metaTitle", deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(alias = "metaDescription", deserialize_with = "lenient_string")]
    pub meta_description: String,
    #[serde(deserialize_with = "lenient_list")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub slug: String,
}

/// Descriptive route metadata, from the AI provider or the fallback
/// synthesizer. Every field defaults to empty so the shape never varies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EnrichedMetadata {
    #[serde(alias = "summary", deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(alias = "dificultad", deserialize_with = "lenient_string")]
    pub difficulty: String,
    #[serde(alias = "durationText", alias = "duration", deserialize_with = "lenient_string")]
    pub duration_text: String,
    #[serde(alias = "routeType", alias = "activity_type", deserialize_with = "lenient_string")]
    pub route_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub region: String,
    #[serde(deserialize_with = "lenient_string")]
    pub province: String,
    #[serde(alias = "town", deserialize_with = "lenient_string")]
    pub locality: String,
    #[serde(alias = "bestSeason", deserialize_with = "lenient_string")]
    pub best_season: String,
    #[serde(alias = "how_to_get_there", alias = "howToGetThere", deserialize_with = "lenient_string")]
    pub access: String,
    #[serde(deserialize_with = "lenient_string")]
    pub parking: String,
    #[serde(alias = "publicTransport", deserialize_with = "lenient_string")]
    pub public_transport: String,
    #[serde(alias = "waterPoints", deserialize_with = "lenient_string")]
    pub water_points: String,
    #[serde(alias = "safetyTips", deserialize_with = "lenient_list")]
    pub safety_tips: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub highlights: Vec<String>,
    #[serde(alias = "story", alias = "long_description", deserialize_with = "lenient_string")]
    pub narrative: String,
    #[serde(deserialize_with = "lenient_seo")]
    pub seo: SeoFields,
    #[serde(alias = "primaryImage", alias = "main_image", deserialize_with = "lenient_image")]
    pub primary_image: Option<ImageReference>,
    #[serde(alias = "images", deserialize_with = "lenient_images")]
    pub gallery: Vec<ImageReference>,
}

impl EnrichedMetadata {
    /// An object with neither a description nor a narrative carries nothing
    /// worth showing; treat it as a failed enrichment.
    pub fn has_content(&self) -> bool {
        !self.description.trim().is_empty() || !self.narrative.trim().is_empty()
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(value_to_string).collect();
            Some(parts.join("\n"))
        }
        Value::Object(_) => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let items: Vec<String> = match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(value_to_string).collect(),
        Value::String(s) => s
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
            .collect(),
        other => value_to_string(other).into_iter().collect(),
    };
    Ok(items.into_iter().filter(|s| !s.is_empty()).collect())
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|v| v.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        Value::String(s) => s.trim().trim_end_matches("px").parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_seo<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SeoFields, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_image<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ImageReference>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_images<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<ImageReference>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Value::Null => Vec::new(),
        single => serde_json::from_value(single).into_iter().collect(),
    })
}
