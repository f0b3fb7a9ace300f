pub mod ai;
pub mod fallback;
pub mod geometry_analyzer;
pub mod images;
pub mod pipeline;
pub mod repair;
pub mod route_assembler;
pub mod track_decoder;
pub mod waypoint_classifier;

pub use pipeline::RouteDraftService;
