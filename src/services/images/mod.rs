pub mod places;
pub mod urls;

pub use places::{GooglePlacesClient, PlaceLookup};
pub use urls::{default_center, static_map_style, MapsUrlBuilder, StaticMapStyle, ValidatedImage};

use crate::cache::{place_query_key, CacheStats, MemoryPhotoCache, PhotoLookupCache};
use crate::config::Config;
use crate::constants::DEFAULT_IMAGE_WIDTH;
use crate::models::{Coordinates, ImageReference};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

/// What the resolver knows about the route when fixing an image.
#[derive(Debug, Clone, Default)]
pub struct ImageContext {
    pub title: String,
    pub region: String,
    pub center: Option<Coordinates>,
}

/// Which step produced the final URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Validated,
    LookedUp,
    StaticMap,
}

#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub image: ImageReference,
    pub outcome: ImageOutcome,
}

#[derive(Debug, Clone)]
pub struct ResolvedImages {
    pub primary: ResolvedImage,
    pub gallery: Vec<ResolvedImage>,
}

impl ResolvedImages {
    /// One-line tally of how the images were obtained.
    pub fn summary(&self) -> String {
        let all = std::iter::once(&self.primary).chain(self.gallery.iter());
        let (mut validated, mut looked_up, mut static_maps) = (0, 0, 0);
        for resolved in all {
            match resolved.outcome {
                ImageOutcome::Validated => validated += 1,
                ImageOutcome::LookedUp => looked_up += 1,
                ImageOutcome::StaticMap => static_maps += 1,
            }
        }
        format!(
            "Images: {} validated, {} from place lookup, {} static map",
            validated, looked_up, static_maps
        )
    }

    pub fn into_parts(self) -> (ImageReference, Vec<ImageReference>) {
        (
            self.primary.image,
            self.gallery.into_iter().map(|r| r.image).collect(),
        )
    }
}

/// Turns whatever image references the metadata carries into allow-listed
/// URLs: validate, else place lookup, else static map. Never fails.
pub struct ImageResolver {
    urls: MapsUrlBuilder,
    lookup: Option<Arc<dyn PlaceLookup>>,
    cache: Option<Arc<dyn PhotoLookupCache>>,
    timeout: Duration,
    concurrency: usize,
}

impl ImageResolver {
    pub fn new(
        urls: MapsUrlBuilder,
        lookup: Option<Arc<dyn PlaceLookup>>,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        ImageResolver {
            urls,
            lookup,
            cache: None,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn PhotoLookupCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let lookup = config.maps_api_key.as_ref().map(|key| {
            Arc::new(GooglePlacesClient::new(key.clone(), config.maps_base_url.clone()))
                as Arc<dyn PlaceLookup>
        });
        if lookup.is_none() {
            tracing::info!("GOOGLE_MAPS_API_KEY not set, images fall back to static maps");
        }

        let cache = Arc::new(MemoryPhotoCache::new(
            config.place_cache_ttl,
            config.place_cache_max_entries,
        ));
        tracing::info!(
            "Place photo cache: {} (ttl {}s, max {} entries)",
            cache.backend_name(),
            config.place_cache_ttl,
            config.place_cache_max_entries
        );

        ImageResolver::new(
            MapsUrlBuilder::new(config.maps_api_key.clone()),
            lookup,
            Duration::from_secs(config.image_timeout_secs),
            config.gallery_concurrency,
        )
        .with_cache(cache)
    }

    pub fn urls(&self) -> &MapsUrlBuilder {
        &self.urls
    }

    /// Place cache counters, or `None` when no cache is attached.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.get_stats().await),
            None => None,
        }
    }

    /// Resolve the primary image and the gallery. The primary image and the
    /// gallery run concurrently; gallery entries run with bounded
    /// concurrency and keep their order.
    pub async fn resolve_all(
        &self,
        primary: Option<&ImageReference>,
        gallery: &[ImageReference],
        ctx: &ImageContext,
    ) -> ResolvedImages {
        let primary_future = self.resolve(primary, 0, ctx);
        let gallery_future = stream::iter(gallery.iter().enumerate())
            .map(|(i, image)| self.resolve(Some(image), i + 1, ctx))
            .buffered(self.concurrency)
            .collect::<Vec<_>>();

        let (primary, gallery) = tokio::join!(primary_future, gallery_future);
        ResolvedImages { primary, gallery }
    }

    /// Resolve one image. `index` 0 is the primary slot.
    pub async fn resolve(
        &self,
        image: Option<&ImageReference>,
        index: usize,
        ctx: &ImageContext,
    ) -> ResolvedImage {
        let alt = image
            .map(|i| i.alt.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_alt(ctx, index));

        if let Some(candidate) = image.map(|i| i.url.trim()).filter(|u| !u.is_empty()) {
            match self.urls.validate(candidate) {
                Some(valid) => {
                    return ResolvedImage {
                        image: ImageReference::new(valid.url, alt, valid.width, valid.height),
                        outcome: ImageOutcome::Validated,
                    };
                }
                None => {
                    tracing::warn!(slot = index, "Rejected image URL outside allow-list: {}", candidate);
                }
            }
        }

        let query = lookup_query(&alt, ctx);
        if let Some(reference) = self.lookup_photo(&query, ctx.center).await {
            let width = DEFAULT_IMAGE_WIDTH;
            let validated = self.urls.validate(&self.urls.photo(&reference, width));
            if let Some(valid) = validated {
                return ResolvedImage {
                    image: ImageReference::new(valid.url, alt, valid.width, valid.height),
                    outcome: ImageOutcome::LookedUp,
                };
            }
        }

        tracing::debug!(slot = index, "Substituting static map for image {}", index);
        ResolvedImage {
            image: self.urls.static_map_image(ctx.center, index, alt),
            outcome: ImageOutcome::StaticMap,
        }
    }

    async fn lookup_photo(&self, query: &str, center: Option<Coordinates>) -> Option<String> {
        let lookup = self.lookup.as_ref()?;
        if query.trim().is_empty() {
            return None;
        }

        let key = place_query_key(query, center.as_ref());
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get_photo_reference(&key).await {
                return cached;
            }
        }

        match tokio::time::timeout(self.timeout, lookup.find_photo_reference(query, center)).await {
            Ok(Ok(reference)) => {
                if let Some(cache) = &self.cache {
                    cache.cache_photo_reference(&key, reference.clone()).await;
                }
                reference
            }
            Ok(Err(e)) => {
                tracing::warn!(query = %query, "Place lookup failed: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    query = %query,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Place lookup timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                );
                None
            }
        }
    }
}

fn default_alt(ctx: &ImageContext, index: usize) -> String {
    let title = ctx.title.trim();
    if index == 0 {
        title.to_string()
    } else {
        format!("{} ({})", title, index)
    }
}

/// Search text for a place lookup: the image description, qualified by the
/// route's region when it is not already mentioned.
fn lookup_query(alt: &str, ctx: &ImageContext) -> String {
    let base = alt.trim();
    let region = ctx.region.trim();
    if region.is_empty() || base.to_lowercase().contains(&region.to_lowercase()) {
        base.to_string()
    } else {
        format!("{} {}", base, region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Found(&'static str),
        Nothing,
        Fails,
        Hangs,
    }

    struct StubLookup {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubLookup {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(StubLookup {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PlaceLookup for StubLookup {
        async fn find_photo_reference(
            &self,
            _query: &str,
            _bias: Option<Coordinates>,
        ) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Found(r) => Ok(Some(r.to_string())),
                Behaviour::Nothing => Ok(None),
                Behaviour::Fails => Err(AppError::ImageResolution("HTTP 500".into())),
                Behaviour::Hangs => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Some("late".to_string()))
                }
            }
        }
    }

    fn resolver(lookup: Option<Arc<StubLookup>>) -> ImageResolver {
        ImageResolver::new(
            MapsUrlBuilder::new(Some("k".to_string())),
            lookup.map(|l| l as Arc<dyn PlaceLookup>),
            Duration::from_millis(100),
            2,
        )
    }

    fn ctx() -> ImageContext {
        ImageContext {
            title: "Ibón de Plan".to_string(),
            region: "Aragón".to_string(),
            center: Some(Coordinates::new(42.6, 0.3).unwrap()),
        }
    }

    #[tokio::test]
    async fn valid_url_is_kept() {
        let stub = StubLookup::new(Behaviour::Found("REF"));
        let r = resolver(Some(stub.clone()));
        let image = ImageReference::new(
            "https://maps.googleapis.com/maps/api/place/photo?photo_reference=OK&maxwidth=800",
            "Lago",
            0,
            0,
        );
        let resolved = r.resolve(Some(&image), 0, &ctx()).await;
        assert_eq!(resolved.outcome, ImageOutcome::Validated);
        assert!(resolved.image.url.contains("photo_reference=OK"));
        assert_eq!(resolved.image.alt, "Lago");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invented_url_is_replaced_by_lookup() {
        let stub = StubLookup::new(Behaviour::Found("REF-42"));
        let r = resolver(Some(stub.clone()));
        let image = ImageReference::new("https://upload.wikimedia.org/fake.jpg", "", 0, 0);
        let resolved = r.resolve(Some(&image), 0, &ctx()).await;
        assert_eq!(resolved.outcome, ImageOutcome::LookedUp);
        assert!(resolved.image.url.contains("photo_reference=REF-42"));
        assert_eq!(resolved.image.alt, "Ibón de Plan");
        assert!(MapsUrlBuilder::is_allowed(&resolved.image.url));
    }

    #[tokio::test]
    async fn lookup_failures_fall_back_to_static_map() {
        for behaviour in [Behaviour::Nothing, Behaviour::Fails, Behaviour::Hangs] {
            let r = resolver(Some(StubLookup::new(behaviour)));
            let resolved = r.resolve(None, 0, &ctx()).await;
            assert_eq!(resolved.outcome, ImageOutcome::StaticMap);
            assert!(resolved.image.url.contains("/maps/api/staticmap?center=42.600000%2C0.300000"));
        }

        let no_lookup = resolver(None).resolve(None, 2, &ImageContext::default()).await;
        assert_eq!(no_lookup.outcome, ImageOutcome::StaticMap);
        assert!(MapsUrlBuilder::is_allowed(&no_lookup.image.url));
    }

    #[tokio::test]
    async fn cache_prevents_repeat_lookups() {
        let stub = StubLookup::new(Behaviour::Found("REF"));
        let r = resolver(Some(stub.clone())).with_cache(Arc::new(MemoryPhotoCache::new(60, 10)));
        let image = ImageReference::new("", "Cascada del Estrecho", 0, 0);

        r.resolve(Some(&image), 1, &ctx()).await;
        r.resolve(Some(&image), 1, &ctx()).await;
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);

        let stats = r.cache_stats().await.unwrap();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert!(resolver(None).cache_stats().await.is_none());
    }

    #[tokio::test]
    async fn gallery_order_is_preserved() {
        let r = resolver(None);
        let gallery: Vec<ImageReference> = (0..5)
            .map(|i| ImageReference::new("", format!("foto {}", i), 0, 0))
            .collect();
        let resolved = r.resolve_all(None, &gallery, &ctx()).await;

        assert_eq!(resolved.gallery.len(), 5);
        for (i, item) in resolved.gallery.iter().enumerate() {
            assert_eq!(item.image.alt, format!("foto {}", i));
        }
        assert_eq!(
            resolved.summary(),
            "Images: 0 validated, 0 from place lookup, 6 static map"
        );
    }

    #[test]
    fn test_lookup_query_adds_region_once() {
        assert_eq!(lookup_query("Ibón de Plan", &ctx()), "Ibón de Plan Aragón");
        assert_eq!(lookup_query("Pirineo de Aragón", &ctx()), "Pirineo de Aragón");
    }
}
