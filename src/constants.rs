//! Stable application-wide constants.
//!
//! Values here are algorithm coefficients, provider endpoints and default
//! fallbacks for env-var-based configuration. They should rarely change.
//! Per-deployment knobs (credentials, timeouts, concurrency) live in
//! [`Config`](crate::config::Config) instead.

// --- Geometry ---

/// Mean Earth radius used by every Haversine computation.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// A track whose first and last points are closer than this is "Circular".
pub const LOOP_CLOSURE_THRESHOLD_KM: f64 = 0.1;
/// Waypoints within this distance of their nearest trackpoint take that
/// point's cumulative distance directly; farther ones are interpolated.
pub const WAYPOINT_SNAP_TOLERANCE_M: f64 = 10.0;

// --- Duration estimate (hiking rule of thumb) ---

/// Horizontal walking speed on flat ground.
pub const WALKING_SPEED_KMH: f64 = 4.0;
/// Metres of ascent covered per hour on top of horizontal time.
pub const CLIMB_RATE_M_PER_HOUR: f64 = 300.0;

// --- Default map centre when no coordinates are known (Iberian peninsula) ---

pub const DEFAULT_MAP_CENTER_LAT: f64 = 40.4168;
pub const DEFAULT_MAP_CENTER_LNG: f64 = -3.7038;

// --- Image provider ---

/// The only host image URLs in a draft may point to.
pub const MAPS_API_HOST: &str = "maps.googleapis.com";
pub const MAPS_API_BASE_URL: &str = "https://maps.googleapis.com";
pub const PLACE_TEXT_SEARCH_PATH: &str = "/maps/api/place/textsearch/json";
pub const PLACE_PHOTO_PATH: &str = "/maps/api/place/photo";
pub const STATIC_MAP_PATH: &str = "/maps/api/staticmap";

/// Default rendered width for place photos.
pub const DEFAULT_IMAGE_WIDTH: u32 = 1200;
/// Default rendered height for place photos and static maps.
pub const DEFAULT_IMAGE_HEIGHT: u32 = 800;
/// Place Photo API upper bound on `maxwidth`.
pub const MAX_PHOTO_WIDTH: u32 = 1600;
/// Static Maps API upper bound on each `size` dimension (free tier).
pub const MAX_STATIC_MAP_DIMENSION: u32 = 640;
/// Radius (m) used to bias place lookups around known coordinates.
pub const PLACE_SEARCH_BIAS_RADIUS_M: u32 = 50_000;
/// Zoom level for static-map substitutes.
pub const STATIC_MAP_DEFAULT_ZOOM: u8 = 12;

// --- Generative provider defaults ---

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

// --- Config defaults (used when env vars are absent) ---

pub const DEFAULT_METADATA_LANGUAGE: &str = "español";
pub const DEFAULT_AI_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_AI_MAX_OUTPUT_TOKENS: u32 = 4096;
pub const DEFAULT_IMAGE_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_GALLERY_CONCURRENCY: usize = 3;
pub const MAX_GALLERY_CONCURRENCY: usize = 16;
pub const DEFAULT_PLACE_CACHE_TTL_SECONDS: u64 = 3_600;
pub const DEFAULT_PLACE_CACHE_MAX_ENTRIES: u64 = 500;

// --- Repair engine ---

/// Characters of context kept on each side of a parse failure in the
/// excerpt attached to an `EnrichmentParse` error.
pub const REPAIR_EXCERPT_RADIUS: usize = 40;
