pub mod coordinates;
pub mod draft;
pub mod metadata;
pub mod track;

pub use coordinates::Coordinates;
pub use draft::{EnrichmentSource, RouteDraft};
pub use metadata::{EnrichedMetadata, ImageReference, SeoFields};
pub use track::{
    DecodedTrack, GeometrySummary, LoopClassification, RawWaypoint, TrackPoint, Waypoint,
    WaypointCategory,
};
