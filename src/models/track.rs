use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single recorded position. Elevation is 0 when the file carries none.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    pub elevation: f64,
}

impl TrackPoint {
    pub fn new(lat: f64, lng: f64, elevation: f64) -> Self {
        TrackPoint {
            lat,
            lng,
            elevation,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Haversine distance in kilometers
    pub fn distance_to(&self, other: &TrackPoint) -> f64 {
        self.coordinates().distance_to(&other.coordinates())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaypointCategory {
    Mirador,
    Puente,
    Fuente,
    Enlace,
    Iglesia,
    Hermita,
    Arbol,
    Laguna,
    Refugio,
    Pico,
    #[default]
    Unknown,
}

impl WaypointCategory {
    /// Classification precedence: earlier categories win on ambiguous names.
    pub const PRECEDENCE: [WaypointCategory; 10] = [
        WaypointCategory::Mirador,
        WaypointCategory::Puente,
        WaypointCategory::Fuente,
        WaypointCategory::Enlace,
        WaypointCategory::Iglesia,
        WaypointCategory::Hermita,
        WaypointCategory::Arbol,
        WaypointCategory::Laguna,
        WaypointCategory::Refugio,
        WaypointCategory::Pico,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaypointCategory::Mirador => "mirador",
            WaypointCategory::Puente => "puente",
            WaypointCategory::Fuente => "fuente",
            WaypointCategory::Enlace => "enlace",
            WaypointCategory::Iglesia => "iglesia",
            WaypointCategory::Hermita => "hermita",
            WaypointCategory::Arbol => "arbol",
            WaypointCategory::Laguna => "laguna",
            WaypointCategory::Refugio => "refugio",
            WaypointCategory::Pico => "pico",
            WaypointCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WaypointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named point of interest placed along the track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Along-track distance from the first trackpoint (km)
    pub distance_from_start_km: f64,
    pub category: WaypointCategory,
}

/// A waypoint exactly as read from the file, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWaypoint {
    pub lat: f64,
    pub lng: f64,
    pub elevation: Option<f64>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl RawWaypoint {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Output of the geometry decoder.
#[derive(Debug, Clone, Default)]
pub struct DecodedTrack {
    pub title: Option<String>,
    pub description: Option<String>,
    pub track_points: Vec<TrackPoint>,
    pub waypoints: Vec<RawWaypoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoopClassification {
    Circular,
    #[serde(rename = "Inicio-Fin")]
    InicioFin,
}

impl fmt::Display for LoopClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopClassification::Circular => write!(f, "Circular"),
            LoopClassification::InicioFin => write!(f, "Inicio-Fin"),
        }
    }
}

/// Metrics derived purely from track geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometrySummary {
    pub distance_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub min_elevation_m: f64,
    pub max_elevation_m: f64,
    pub loop_classification: LoopClassification,
    pub estimated_duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Coordinates>,
}
