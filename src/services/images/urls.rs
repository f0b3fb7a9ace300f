//! Allow-listed image URL construction and validation.

use crate::constants::*;
use crate::models::{Coordinates, ImageReference};
use reqwest::Url;
use std::collections::HashMap;

/// Rendering parameters for one static-map image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticMapStyle {
    pub zoom: u8,
    pub maptype: &'static str,
    pub width: u32,
    pub height: u32,
}

const STATIC_MAP_VARIANTS: [(u8, &str); 4] = [
    (STATIC_MAP_DEFAULT_ZOOM, "terrain"),
    (STATIC_MAP_DEFAULT_ZOOM + 2, "satellite"),
    (STATIC_MAP_DEFAULT_ZOOM + 1, "hybrid"),
    (STATIC_MAP_DEFAULT_ZOOM - 1, "roadmap"),
];

/// Style for the `index`-th static map of a draft. Index 0 is the primary
/// image; gallery entries cycle through the remaining zoom/maptype pairs so
/// substitutes do not all look identical.
pub fn static_map_style(index: usize) -> StaticMapStyle {
    let (zoom, maptype) = STATIC_MAP_VARIANTS[index % STATIC_MAP_VARIANTS.len()];
    StaticMapStyle {
        zoom,
        maptype,
        width: MAX_STATIC_MAP_DIMENSION,
        height: MAX_STATIC_MAP_DIMENSION * DEFAULT_IMAGE_HEIGHT / DEFAULT_IMAGE_WIDTH,
    }
}

/// The default map centre used when a route has no usable coordinates.
pub fn default_center() -> Coordinates {
    Coordinates {
        lat: DEFAULT_MAP_CENTER_LAT,
        lng: DEFAULT_MAP_CENTER_LNG,
    }
}

/// A URL that passed validation, with the size it renders at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Builds and validates URLs for the place-photo and static-map endpoints.
/// Every URL produced here points at [`MAPS_API_HOST`].
#[derive(Debug, Clone, Default)]
pub struct MapsUrlBuilder {
    api_key: Option<String>,
}

impl MapsUrlBuilder {
    pub fn new(api_key: Option<String>) -> Self {
        MapsUrlBuilder { api_key }
    }

    fn push_key(&self, url: &mut String) {
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(&urlencoding::encode(key));
        }
    }

    /// Place Photo URL for a photo reference; `max_width` is clamped to the
    /// API's accepted range.
    pub fn photo(&self, photo_reference: &str, max_width: u32) -> String {
        let mut url = format!(
            "{}{}?maxwidth={}&photo_reference={}",
            MAPS_API_BASE_URL,
            PLACE_PHOTO_PATH,
            max_width.clamp(1, MAX_PHOTO_WIDTH),
            urlencoding::encode(photo_reference)
        );
        self.push_key(&mut url);
        url
    }

    pub fn static_map(&self, center: Coordinates, style: StaticMapStyle) -> String {
        let center_value = center.to_query_value();
        let mut url = format!(
            "{}{}?center={}&zoom={}&size={}x{}&maptype={}&markers={}",
            MAPS_API_BASE_URL,
            STATIC_MAP_PATH,
            urlencoding::encode(&center_value),
            style.zoom,
            style.width.clamp(1, MAX_STATIC_MAP_DIMENSION),
            style.height.clamp(1, MAX_STATIC_MAP_DIMENSION),
            style.maptype,
            urlencoding::encode(&format!("color:red|{}", center_value))
        );
        self.push_key(&mut url);
        url
    }

    /// Static-map image reference for slot `index` (0 = primary).
    pub fn static_map_image(
        &self,
        center: Option<Coordinates>,
        index: usize,
        alt: impl Into<String>,
    ) -> ImageReference {
        let style = static_map_style(index);
        ImageReference::new(
            self.static_map(center.unwrap_or_else(default_center), style),
            alt,
            style.width,
            style.height,
        )
    }

    /// Accept `raw` only if it targets an allow-listed endpoint with the
    /// parameters that endpoint requires. The URL is rebuilt canonically:
    /// sizes are clamped and the configured credential replaces any key
    /// the URL carried.
    pub fn validate(&self, raw: &str) -> Option<ValidatedImage> {
        let url = Url::parse(raw.trim()).ok()?;
        if !matches!(url.scheme(), "https" | "http") || url.host_str() != Some(MAPS_API_HOST) {
            return None;
        }

        let params: HashMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
            .collect();
        let param = |name: &str| params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

        match url.path().trim_end_matches('/') {
            PLACE_PHOTO_PATH => {
                let reference = param("photo_reference").or_else(|| param("photoreference"))?;
                let width = param("maxwidth")
                    .and_then(|w| w.parse::<u32>().ok())
                    .unwrap_or(DEFAULT_IMAGE_WIDTH)
                    .clamp(1, MAX_PHOTO_WIDTH);
                Some(ValidatedImage {
                    url: self.photo(reference, width),
                    width,
                    height: width * DEFAULT_IMAGE_HEIGHT / DEFAULT_IMAGE_WIDTH,
                })
            }
            STATIC_MAP_PATH => {
                let center = parse_center(param("center")?)?;
                let default_style = static_map_style(0);
                let (width, height) = param("size")
                    .and_then(parse_size)
                    .unwrap_or((default_style.width, default_style.height));
                let zoom = param("zoom")
                    .and_then(|z| z.parse::<u8>().ok())
                    .map(|z| z.min(21))
                    .unwrap_or(default_style.zoom);
                let maptype = param("maptype")
                    .and_then(|m| {
                        ["roadmap", "satellite", "terrain", "hybrid"]
                            .into_iter()
                            .find(|known| known.eq_ignore_ascii_case(m))
                    })
                    .unwrap_or(default_style.maptype);
                let style = StaticMapStyle {
                    zoom,
                    maptype,
                    width: width.clamp(1, MAX_STATIC_MAP_DIMENSION),
                    height: height.clamp(1, MAX_STATIC_MAP_DIMENSION),
                };
                Some(ValidatedImage {
                    url: self.static_map(center, style),
                    width: style.width,
                    height: style.height,
                })
            }
            _ => None,
        }
    }

    /// True when `url` already points at an allow-listed endpoint.
    pub fn is_allowed(url: &str) -> bool {
        Url::parse(url)
            .ok()
            .filter(|u| u.host_str() == Some(MAPS_API_HOST))
            .map(|u| matches!(u.path(), PLACE_PHOTO_PATH | STATIC_MAP_PATH))
            .unwrap_or(false)
    }
}

fn parse_center(value: &str) -> Option<Coordinates> {
    let (lat, lng) = value.split_once(',')?;
    Coordinates::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?).ok()
}

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.to_lowercase().split_once('x').map(|(w, h)| (w.to_string(), h.to_string()))?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MapsUrlBuilder {
        MapsUrlBuilder::new(Some("test-key".to_string()))
    }

    #[test]
    fn test_photo_url_shape() {
        let url = builder().photo("Aap_uE/x y", 5000);
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/place/photo?maxwidth=1600&photo_reference=Aap_uE%2Fx%20y&key=test-key"
        );
        assert!(MapsUrlBuilder::is_allowed(&url));
    }

    #[test]
    fn test_static_map_url_shape() {
        let center = Coordinates::new(42.5, -0.25).unwrap();
        let url = MapsUrlBuilder::default().static_map(center, static_map_style(0));
        assert!(url.starts_with("https://maps.googleapis.com/maps/api/staticmap?center=42.500000%2C-0.250000"));
        assert!(url.contains("&zoom=12&size=640x426&maptype=terrain"));
        assert!(!url.contains("key="));
        assert!(MapsUrlBuilder::is_allowed(&url));
    }

    #[test]
    fn test_validate_rejects_foreign_hosts() {
        let b = builder();
        assert!(b.validate("https://example.com/photo.jpg").is_none());
        assert!(b.validate("https://maps.googleapis.com.evil.io/maps/api/place/photo?photo_reference=x").is_none());
        assert!(b.validate("not a url").is_none());
        assert!(b.validate("").is_none());
        assert!(b.validate("https://maps.googleapis.com/maps/api/geocode/json?address=x").is_none());
    }

    #[test]
    fn test_validate_requires_endpoint_parameters() {
        let b = builder();
        assert!(b.validate("https://maps.googleapis.com/maps/api/place/photo?maxwidth=400").is_none());
        assert!(b.validate("https://maps.googleapis.com/maps/api/staticmap?zoom=3").is_none());
    }

    #[test]
    fn test_validate_normalizes_photo_url() {
        let validated = builder()
            .validate("http://maps.googleapis.com/maps/api/place/photo?photoreference=ABC&maxwidth=9999&key=LEAKED")
            .unwrap();
        assert_eq!(
            validated.url,
            "https://maps.googleapis.com/maps/api/place/photo?maxwidth=1600&photo_reference=ABC&key=test-key"
        );
        assert_eq!(validated.width, 1600);
        assert!(!validated.url.contains("LEAKED"));
    }

    #[test]
    fn test_validate_normalizes_static_map() {
        let validated = builder()
            .validate("https://maps.googleapis.com/maps/api/staticmap?center=42.1,-0.5&size=2000x300&maptype=SATELLITE&zoom=40")
            .unwrap();
        assert_eq!(validated.width, 640);
        assert_eq!(validated.height, 300);
        assert!(validated.url.contains("zoom=21"));
        assert!(validated.url.contains("maptype=satellite"));
        assert!(validated.url.ends_with("&key=test-key"));
    }

    #[test]
    fn test_validate_is_stable_on_own_output() {
        let b = builder();
        let first = b
            .validate("https://maps.googleapis.com/maps/api/place/photo?photo_reference=ABC")
            .unwrap();
        let second = b.validate(&first.url).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_static_map_styles_cycle() {
        assert_eq!(static_map_style(0).maptype, "terrain");
        assert_ne!(static_map_style(1), static_map_style(2));
        assert_eq!(static_map_style(1), static_map_style(5));
    }
}
