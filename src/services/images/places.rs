use crate::constants::{PLACE_SEARCH_BIAS_RADIUS_M, PLACE_TEXT_SEARCH_PATH};
use crate::error::{AppError, Result};
use crate::models::Coordinates;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Text-based place search that yields a photo identifier.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// Photo reference of the first result that exposes one. `Ok(None)`
    /// means the search worked but nothing usable came back.
    async fn find_photo_reference(
        &self,
        query: &str,
        bias: Option<Coordinates>,
    ) -> Result<Option<String>>;
}

/// Google Places text search client.
#[derive(Clone)]
pub struct GooglePlacesClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        GooglePlacesClient {
            client: Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl PlaceLookup for GooglePlacesClient {
    async fn find_photo_reference(
        &self,
        query: &str,
        bias: Option<Coordinates>,
    ) -> Result<Option<String>> {
        let url = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            PLACE_TEXT_SEARCH_PATH
        );

        let mut request = self
            .client
            .get(&url)
            .query(&[("query", query), ("key", self.api_key.as_str())]);
        if let Some(center) = bias {
            request = request.query(&[
                ("location", center.to_query_value()),
                ("radius", PLACE_SEARCH_BIAS_RADIUS_M.to_string()),
            ]);
        }

        tracing::debug!(query = %query, biased = bias.is_some(), "Place search: {}", query);

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ImageResolution(format!("Place search failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ImageResolution(format!(
                "Place search HTTP {}",
                status
            )));
        }

        let body: TextSearchResponse = response.json().await.map_err(|e| {
            AppError::ImageResolution(format!("Failed to parse place search response: {}", e))
        })?;

        first_photo_reference(body)
    }
}

/// Interpret a text search body: `ZERO_RESULTS` is an empty answer, any
/// other non-`OK` status is an error.
fn first_photo_reference(body: TextSearchResponse) -> Result<Option<String>> {
    match body.status.as_str() {
        "OK" => Ok(body
            .results
            .into_iter()
            .flat_map(|place| place.photos.into_iter())
            .map(|photo| photo.photo_reference)
            .find(|reference| !reference.is_empty())),
        "ZERO_RESULTS" => Ok(None),
        status => Err(AppError::ImageResolution(format!(
            "Place search status {}: {}",
            status,
            body.error_message.unwrap_or_default()
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    photos: Vec<PlacePhoto>,
}

#[derive(Debug, Deserialize)]
struct PlacePhoto {
    #[serde(default)]
    photo_reference: String,
}
