use async_trait::async_trait;
use senda::constants::EARTH_RADIUS_KM;
use senda::error::{AppError, Result};
use senda::models::Coordinates;
use senda::services::ai::{MetadataPrompt, MetadataProvider, ProviderResponse};
use senda::services::images::{ImageResolver, MapsUrlBuilder, PlaceLookup};
use senda::RouteDraftService;
use std::sync::Arc;
use std::time::Duration;

/// Skip tests that hit real APIs
#[allow(dead_code)]
pub fn should_skip_real_api_tests() -> bool {
    std::env::var("SKIP_REAL_API_TESTS").is_ok()
}

/// Latitude offset (degrees) for a northward distance in meters.
#[allow(dead_code)]
pub fn north_m(meters: f64) -> f64 {
    meters / 1000.0 / EARTH_RADIUS_KM * (180.0 / std::f64::consts::PI)
}

/// Build a GPX 1.1 document with one track segment and optional waypoints.
#[allow(dead_code)]
pub fn gpx(name: Option<&str>, points: &[(f64, f64, f64)], waypoints: &[(f64, f64, &str)]) -> String {
    let mut doc = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx version=\"1.1\" creator=\"test\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n",
    );
    if let Some(name) = name {
        doc.push_str(&format!("  <metadata><name>{}</name></metadata>\n", name));
    }
    for (lat, lon, label) in waypoints {
        doc.push_str(&format!(
            "  <wpt lat=\"{}\" lon=\"{}\"><name>{}</name></wpt>\n",
            lat, lon, label
        ));
    }
    doc.push_str("  <trk><trkseg>\n");
    for (lat, lon, ele) in points {
        doc.push_str(&format!(
            "    <trkpt lat=\"{}\" lon=\"{}\"><ele>{}</ele></trkpt>\n",
            lat, lon, ele
        ));
    }
    doc.push_str("  </trkseg></trk>\n</gpx>\n");
    doc
}

/// What a [`StubProvider`] does when asked for metadata.
#[allow(dead_code)]
pub enum StubBehaviour {
    Complete(String),
    Truncated(String),
    Blocked,
    HttpError,
    Hangs,
}

pub struct StubProvider {
    behaviour: StubBehaviour,
}

#[allow(dead_code)]
impl StubProvider {
    pub fn boxed(behaviour: StubBehaviour) -> Box<dyn MetadataProvider> {
        Box::new(StubProvider { behaviour })
    }
}

#[async_trait]
impl MetadataProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn generate(&self, _prompt: &MetadataPrompt) -> Result<ProviderResponse> {
        match &self.behaviour {
            StubBehaviour::Complete(text) => Ok(ProviderResponse {
                text: text.clone(),
                truncated: false,
            }),
            StubBehaviour::Truncated(text) => Ok(ProviderResponse {
                text: text.clone(),
                truncated: true,
            }),
            StubBehaviour::Blocked => Err(AppError::BlockedContent("stub stopped with SAFETY".into())),
            StubBehaviour::HttpError => Err(AppError::Provider("stub HTTP 503".into())),
            StubBehaviour::Hangs => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Err(AppError::Provider("unreachable".into()))
            }
        }
    }
}

/// Place lookup that always answers with the same photo reference.
pub struct FixedPhotoLookup(pub &'static str);

#[async_trait]
impl PlaceLookup for FixedPhotoLookup {
    async fn find_photo_reference(
        &self,
        _query: &str,
        _bias: Option<Coordinates>,
    ) -> Result<Option<String>> {
        Ok(Some(self.0.to_string()))
    }
}

/// Service wired with stubs and short timeouts.
#[allow(dead_code)]
pub fn service(
    provider: Option<Box<dyn MetadataProvider>>,
    lookup: Option<Arc<dyn PlaceLookup>>,
) -> RouteDraftService {
    let images = ImageResolver::new(
        MapsUrlBuilder::new(Some("test-maps-key".to_string())),
        lookup,
        Duration::from_millis(200),
        3,
    );
    RouteDraftService::new(provider, images, "español", Duration::from_millis(300))
}
