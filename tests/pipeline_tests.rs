use senda::error::AppError;
use senda::models::{EnrichmentSource, LoopClassification, WaypointCategory};
use senda::services::images::{MapsUrlBuilder, PlaceLookup};
use std::sync::Arc;

mod common;
use common::{gpx, north_m, service, FixedPhotoLookup, StubBehaviour, StubProvider};

const AI_RESPONSE: &str = r#"```json
{
  "description": "Circular sencilla junto al ibón.",
  "difficulty": "Moderada",
  "region": "Aragón",
  "province": "Huesca",
  "safety_tips": ["Lleva agua", "Consulta el parte"],
  "narrative": "Una ruta preciosa.",
  "primary_image": {"url": "https://images.example.com/ibon.jpg", "alt": "Ibón de Plan"},
  "gallery": [
    "https://maps.googleapis.com/maps/api/place/photo?photo_reference=GOOD&maxwidth=800",
    {"url": "", "alt": "Basa de la Mora"}
  ]
}
```"#;

fn three_point_track() -> String {
    gpx(
        Some("Circular del Ibón"),
        &[
            (42.0, 0.0, 1000.0),
            (42.01, 0.0, 1300.0),
            (42.0 + north_m(50.0), 0.0, 1000.0),
        ],
        &[],
    )
}

fn assert_images_allow_listed(draft: &senda::models::RouteDraft) {
    for image in std::iter::once(&draft.primary_image).chain(draft.gallery.iter()) {
        assert!(!image.url.is_empty());
        assert!(
            MapsUrlBuilder::is_allowed(&image.url),
            "image outside allow-list: {}",
            image.url
        );
    }
}

#[tokio::test]
async fn test_three_point_loop_end_to_end() {
    let draft = service(None, None)
        .create_draft(&three_point_track(), Some("ibon.gpx"))
        .await
        .unwrap();

    assert!(draft.geometry.distance_km > 0.0);
    assert_eq!(draft.geometry.elevation_gain_m, 300.0);
    assert_eq!(draft.geometry.elevation_loss_m, 300.0);
    assert_eq!(draft.geometry.loop_classification, LoopClassification::Circular);

    let hours = (draft.geometry.distance_km / 4.0 + 300.0 / 300.0).floor() as u64;
    assert_eq!(
        draft.geometry.estimated_duration,
        format!("{}-{} horas", hours, hours + 1)
    );

    assert_eq!(draft.title, "Circular del Ibón");
    assert_eq!(draft.enrichment_source, EnrichmentSource::Fallback);
    assert!(!draft.narrative.is_empty());
    assert_images_allow_listed(&draft);
    assert!(draft
        .diagnostics
        .iter()
        .any(|d| d.contains("No AI provider configured")));
}

#[tokio::test]
async fn test_ai_metadata_with_images_repaired() {
    let lookup: Arc<dyn PlaceLookup> = Arc::new(FixedPhotoLookup("LOOKED-UP"));
    let draft = service(
        Some(StubProvider::boxed(StubBehaviour::Complete(AI_RESPONSE.to_string()))),
        Some(lookup),
    )
    .create_draft(&three_point_track(), None)
    .await
    .unwrap();

    assert_eq!(
        draft.enrichment_source,
        EnrichmentSource::Ai {
            provider: "stub".to_string()
        }
    );
    assert_eq!(draft.region, "Aragón");
    assert_eq!(draft.safety_tips.len(), 2);
    // No description in the file, so the AI one is used
    assert_eq!(draft.description, "Circular sencilla junto al ibón.");

    // Invented host replaced through place lookup
    assert!(draft.primary_image.url.contains("photo_reference=LOOKED-UP"));
    assert_eq!(draft.primary_image.alt, "Ibón de Plan");
    // Valid photo URL kept in place, missing one looked up
    assert_eq!(draft.gallery.len(), 2);
    assert!(draft.gallery[0].url.contains("photo_reference=GOOD"));
    assert!(draft.gallery[1].url.contains("photo_reference=LOOKED-UP"));
    assert_images_allow_listed(&draft);
}

#[tokio::test]
async fn test_severely_truncated_response_uses_fallback() {
    let draft = service(
        Some(StubProvider::boxed(StubBehaviour::Truncated(
            "{\"descrip".to_string(),
        ))),
        None,
    )
    .create_draft(&three_point_track(), None)
    .await
    .unwrap();

    assert_eq!(draft.enrichment_source, EnrichmentSource::Fallback);
    assert!(!draft.gallery.is_empty());
    assert_images_allow_listed(&draft);
    assert!(draft.diagnostics.iter().any(|d| d.contains("output limit")));
    assert!(draft.diagnostics.iter().any(|d| d.contains("using fallback metadata")));
}

#[tokio::test]
async fn test_partially_truncated_response_is_repaired() {
    let text = "{\"description\": \"Ruta por el ibón\", \"highlights\": [\"Lago\", \"Cas";
    let draft = service(
        Some(StubProvider::boxed(StubBehaviour::Truncated(text.to_string()))),
        None,
    )
    .create_draft(&three_point_track(), None)
    .await
    .unwrap();

    assert!(matches!(draft.enrichment_source, EnrichmentSource::Ai { .. }));
    assert_eq!(draft.highlights, vec!["Lago".to_string(), "Cas".to_string()]);
    // Nothing usable for images: primary slot still filled
    assert_images_allow_listed(&draft);
}

#[tokio::test]
async fn test_provider_failures_degrade_to_fallback() {
    for behaviour in [StubBehaviour::Blocked, StubBehaviour::HttpError, StubBehaviour::Hangs] {
        let draft = service(Some(StubProvider::boxed(behaviour)), None)
            .create_draft(&three_point_track(), None)
            .await
            .unwrap();
        assert_eq!(draft.enrichment_source, EnrichmentSource::Fallback);
        assert!(!draft.description.is_empty());
        assert_images_allow_listed(&draft);
    }
}

#[tokio::test]
async fn test_unparseable_text_uses_fallback() {
    let draft = service(
        Some(StubProvider::boxed(StubBehaviour::Complete(
            "Lo siento, no puedo ayudar con eso.".to_string(),
        ))),
        None,
    )
    .create_draft(&three_point_track(), None)
    .await
    .unwrap();

    assert_eq!(draft.enrichment_source, EnrichmentSource::Fallback);
    assert!(draft
        .diagnostics
        .iter()
        .any(|d| d.contains("Unrecoverable metadata response")));
}

#[tokio::test]
async fn test_waypoints_classified_along_track() {
    let track = gpx(
        Some("Mirador"),
        &[
            (42.00, 0.0, 1000.0),
            (42.01, 0.0, 1100.0),
            (42.02, 0.0, 1200.0),
        ],
        &[
            (42.0, 0.0, "Refugio de Góriz"),
            (42.02, 0.0, "Mirador del Fraile"),
            (42.015, 0.001, "Roca X"),
        ],
    );
    let draft = service(None, None).create_draft(&track, None).await.unwrap();

    assert_eq!(draft.waypoints.len(), 3);
    assert_eq!(draft.waypoints[0].category, WaypointCategory::Refugio);
    assert_eq!(draft.waypoints[0].distance_from_start_km, 0.0);
    assert_eq!(draft.waypoints[1].category, WaypointCategory::Mirador);
    assert!((draft.waypoints[1].distance_from_start_km - 2.22).abs() < 0.02);
    assert_eq!(draft.waypoints[2].category, WaypointCategory::Unknown);
    assert!(draft.waypoints[2].distance_from_start_km > 1.0);
    assert!(draft.waypoints[2].distance_from_start_km < 2.3);
}

#[tokio::test]
async fn test_title_override_and_filename_title() {
    let untitled = gpx(None, &[(42.0, 0.0, 0.0), (42.01, 0.0, 0.0)], &[]);
    let svc = service(None, None);

    let from_file = svc
        .create_draft(&untitled, Some("ruta_valle-de-pineta.gpx"))
        .await
        .unwrap();
    assert_eq!(from_file.title, "ruta valle de pineta");
    assert_eq!(from_file.geometry.loop_classification, LoopClassification::InicioFin);

    let overridden = svc
        .create_draft_titled(&untitled, Some("x.gpx"), Some("Valle de Pineta"))
        .await
        .unwrap();
    assert_eq!(overridden.title, "Valle de Pineta");
    assert_eq!(overridden.seo.slug, "valle-de-pineta");
}

#[tokio::test]
async fn test_no_geometry_is_fatal() {
    let err = service(None, None)
        .create_draft("<gpx><metadata><name>Vacío</name></metadata></gpx>", Some("vacio.gpx"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Parse(_)));
}

#[tokio::test]
async fn test_kml_input() {
    let kml = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document><name>Subida al Moncayo</name>
<Placemark><name>Cumbre</name><Point><coordinates>-1.8395,41.7871,2314</coordinates></Point></Placemark>
<Placemark><LineString><coordinates>
-1.8100,41.7700,1600 -1.8250,41.7800,1900 -1.8395,41.7871,2314
</coordinates></LineString></Placemark>
</Document></kml>"#;
    let draft = service(None, None).create_draft(kml, Some("moncayo.kml")).await.unwrap();

    assert_eq!(draft.title, "Subida al Moncayo");
    assert_eq!(draft.geometry.elevation_gain_m, 714.0);
    assert_eq!(draft.waypoints.len(), 1);
    assert_eq!(draft.waypoints[0].category, WaypointCategory::Pico);
    assert_eq!(draft.province, "Zaragoza");
}

#[tokio::test]
async fn test_draft_serializes_without_nulls() {
    let draft = service(None, None)
        .create_draft(&three_point_track(), None)
        .await
        .unwrap();
    let json = serde_json::to_value(&draft).unwrap();
    let object = json.as_object().unwrap();
    assert!(object.values().all(|v| !v.is_null()));
    assert_eq!(object["loop_classification"], "Circular");
    assert_eq!(object["enrichment_source"]["kind"], "fallback");
}
