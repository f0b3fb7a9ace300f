use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Coordinates, EnrichedMetadata, EnrichmentSource, RouteDraft};
use crate::services::ai::{build_prompt, build_provider, MetadataProvider};
use crate::services::images::{ImageContext, ImageResolver};
use crate::services::route_assembler::{assemble, DraftParts, UNTITLED_ROUTE};
use crate::services::{fallback, geometry_analyzer, repair, track_decoder, waypoint_classifier};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Ordered notes on what each stage did; every entry is also logged.
#[derive(Debug, Default)]
struct Diagnostics(Vec<String>);

impl Diagnostics {
    fn info(&mut self, message: String) {
        tracing::info!("{}", message);
        self.0.push(message);
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.0.push(message);
    }
}

/// Runs one track file through decode, analysis, enrichment, image
/// resolution and assembly. Holds no per-request state, so one instance can
/// serve concurrent requests.
pub struct RouteDraftService {
    provider: Option<Box<dyn MetadataProvider>>,
    images: ImageResolver,
    language: String,
    ai_timeout: Duration,
}

impl RouteDraftService {
    pub fn new(
        provider: Option<Box<dyn MetadataProvider>>,
        images: ImageResolver,
        language: impl Into<String>,
        ai_timeout: Duration,
    ) -> Self {
        RouteDraftService {
            provider,
            images,
            language: language.into(),
            ai_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let provider = config.provider.as_ref().map(|p| {
            tracing::info!(provider = %p.kind, model = %p.model, "Metadata provider: {} ({})", p.kind, p.model);
            build_provider(p)
        });
        if provider.is_none() {
            tracing::info!("No AI credential configured, metadata will come from the fallback synthesizer");
        }

        RouteDraftService::new(
            provider,
            ImageResolver::from_config(config),
            config.metadata_language.clone(),
            Duration::from_secs(config.ai_timeout_secs),
        )
    }

    pub async fn create_draft(&self, raw: &str, filename: Option<&str>) -> Result<RouteDraft> {
        self.create_draft_titled(raw, filename, None).await
    }

    /// Like [`create_draft`](Self::create_draft) but `title` replaces
    /// whatever title the file carries.
    pub async fn create_draft_titled(
        &self,
        raw: &str,
        filename: Option<&str>,
        title: Option<&str>,
    ) -> Result<RouteDraft> {
        let started = Instant::now();
        let mut diagnostics = Diagnostics::default();

        let decoded = track_decoder::decode_track(raw, filename).map_err(|e| {
            tracing::warn!(filename = ?filename, "Track decoding failed: {}", e);
            e
        })?;
        diagnostics.info(format!(
            "Decoded {} track points and {} waypoints",
            decoded.track_points.len(),
            decoded.waypoints.len()
        ));

        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or(decoded.title);
        let prompt_title = title.clone().unwrap_or_else(|| UNTITLED_ROUTE.to_string());

        let points = Arc::new(decoded.track_points);
        let raw_waypoints = decoded.waypoints;
        let analysis = tokio::task::spawn_blocking({
            let points = Arc::clone(&points);
            move || geometry_analyzer::analyze(&points)
        });
        let classification = tokio::task::spawn_blocking({
            let points = Arc::clone(&points);
            move || waypoint_classifier::classify_waypoints(&raw_waypoints, &points)
        });
        let (geometry, waypoints) = tokio::try_join!(analysis, classification)
            .map_err(|e| AppError::Internal(format!("Geometry analysis task failed: {}", e)))?;
        diagnostics.info(format!(
            "Geometry: {:.1} km, +{} m / -{} m, {}",
            geometry.distance_km,
            geometry.elevation_gain_m,
            geometry.elevation_loss_m,
            geometry.loop_classification
        ));

        let (metadata, enrichment_source) = self
            .enrich(&prompt_title, geometry.start, &mut diagnostics)
            .await;

        let ctx = ImageContext {
            title: prompt_title,
            region: metadata.region.clone(),
            center: geometry.start,
        };
        let resolved = self
            .images
            .resolve_all(metadata.primary_image.as_ref(), &metadata.gallery, &ctx)
            .await;
        diagnostics.info(resolved.summary());
        let (primary_image, gallery) = resolved.into_parts();
        if let Some(stats) = self.images.cache_stats().await {
            tracing::debug!(
                hits = stats.hits,
                misses = stats.misses,
                entries = stats.entries,
                "Place cache hit rate {:.1}%",
                stats.hit_rate
            );
        }

        let draft = assemble(DraftParts {
            title,
            description: decoded.description,
            geometry,
            waypoints,
            metadata,
            primary_image,
            gallery,
            enrichment_source,
            diagnostics: diagnostics.0,
        });

        tracing::info!(
            draft_id = %draft.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Draft '{}' assembled in {}ms",
            draft.title,
            started.elapsed().as_millis()
        );

        Ok(draft)
    }

    /// AI metadata when possible, fallback metadata otherwise. Never fails.
    async fn enrich(
        &self,
        title: &str,
        start: Option<Coordinates>,
        diagnostics: &mut Diagnostics,
    ) -> (EnrichedMetadata, EnrichmentSource) {
        let Some(provider) = &self.provider else {
            diagnostics.info("No AI provider configured; using fallback metadata".to_string());
            return (self.fallback(title, start), EnrichmentSource::Fallback);
        };

        match self.generate(provider.as_ref(), title, start, diagnostics).await {
            Ok(metadata) => {
                diagnostics.info(format!("Metadata generated by {}", provider.name()));
                (
                    metadata,
                    EnrichmentSource::Ai {
                        provider: provider.name().to_string(),
                    },
                )
            }
            Err(e) => {
                if !e.is_enrichment_failure() {
                    tracing::error!(provider = provider.name(), "Unexpected enrichment error: {}", e);
                }
                diagnostics.warn(format!(
                    "AI enrichment via {} failed ({}); using fallback metadata",
                    provider.name(),
                    e
                ));
                (self.fallback(title, start), EnrichmentSource::Fallback)
            }
        }
    }

    async fn generate(
        &self,
        provider: &dyn MetadataProvider,
        title: &str,
        start: Option<Coordinates>,
        diagnostics: &mut Diagnostics,
    ) -> Result<EnrichedMetadata> {
        let prompt = build_prompt(title, start, &self.language);
        let requested = Instant::now();

        let response = tokio::time::timeout(self.ai_timeout, provider.generate(&prompt))
            .await
            .map_err(|_| {
                AppError::Provider(format!(
                    "{} did not answer within {}s",
                    provider.name(),
                    self.ai_timeout.as_secs()
                ))
            })??;

        tracing::debug!(
            provider = provider.name(),
            chars = response.text.len(),
            elapsed_ms = requested.elapsed().as_millis() as u64,
            "Provider answered with {} chars",
            response.text.len()
        );

        if response.truncated {
            diagnostics.warn(format!(
                "{} response was cut at the output limit; attempting repair",
                provider.name()
            ));
        }

        repair::parse_metadata(&response.text)
    }

    fn fallback(&self, title: &str, start: Option<Coordinates>) -> EnrichedMetadata {
        fallback::synthesize(title, start, self.images.urls())
    }
}
