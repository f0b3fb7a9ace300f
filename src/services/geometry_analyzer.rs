use crate::constants::*;
use crate::models::{GeometrySummary, LoopClassification, TrackPoint};

/// Sum of consecutive Haversine distances (km), unrounded.
pub fn track_length_km(points: &[TrackPoint]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Running along-track distance (km) at every point; `result[0] == 0`.
pub fn cumulative_distances_km(points: &[TrackPoint]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            total += points[i - 1].distance_to(point);
        }
        cumulative.push(total);
    }
    cumulative
}

/// Positive and negative elevation deltas summed over consecutive points.
/// No smoothing is applied, so noisy altimeter data inflates both totals.
pub fn elevation_gain_loss(points: &[TrackPoint]) -> (f64, f64) {
    points
        .windows(2)
        .map(|w| w[1].elevation - w[0].elevation)
        .fold((0.0, 0.0), |(gain, loss), delta| {
            if delta > 0.0 {
                (gain + delta, loss)
            } else {
                (gain, loss - delta)
            }
        })
}

/// Circular iff the first and last points are within
/// [`LOOP_CLOSURE_THRESHOLD_KM`] of each other.
pub fn classify_loop(points: &[TrackPoint]) -> LoopClassification {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if first.distance_to(last) < LOOP_CLOSURE_THRESHOLD_KM => {
            LoopClassification::Circular
        }
        (Some(_), Some(_)) => LoopClassification::InicioFin,
        _ => LoopClassification::Circular,
    }
}

/// Walking time estimate: `distance / 4 km/h + gain / 300 m/h`.
/// Formatted as an hour range ("3-4 horas") or minutes below one hour.
pub fn estimate_duration(distance_km: f64, elevation_gain_m: f64) -> String {
    let total_hours =
        distance_km / WALKING_SPEED_KMH + elevation_gain_m / CLIMB_RATE_M_PER_HOUR;

    if total_hours >= 1.0 {
        let hours = total_hours.floor() as u64;
        format!("{}-{} horas", hours, hours + 1)
    } else {
        format!("{} minutos", (total_hours * 60.0).round() as u64)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Compute the full geometry summary for an ordered track.
pub fn analyze(points: &[TrackPoint]) -> GeometrySummary {
    let distance_km = round_to(track_length_km(points), 1);
    let (gain, loss) = elevation_gain_loss(points);
    let elevation_gain_m = gain.round();
    let elevation_loss_m = loss.round();

    let (min_elevation_m, max_elevation_m) = if points.is_empty() {
        (0.0, 0.0)
    } else {
        points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), p| {
            (min.min(p.elevation), max.max(p.elevation))
        })
    };

    let summary = GeometrySummary {
        distance_km,
        elevation_gain_m,
        elevation_loss_m,
        min_elevation_m: round_to(min_elevation_m, 1),
        max_elevation_m: round_to(max_elevation_m, 1),
        loop_classification: classify_loop(points),
        estimated_duration: estimate_duration(distance_km, elevation_gain_m),
        start: points.first().map(TrackPoint::coordinates),
        end: points.last().map(TrackPoint::coordinates),
    };

    tracing::debug!(
        distance_km = summary.distance_km,
        gain_m = summary.elevation_gain_m,
        loop_type = %summary.loop_classification,
        "Geometry: {:.1}km, +{}m/-{}m, {}",
        summary.distance_km,
        summary.elevation_gain_m,
        summary.elevation_loss_m,
        summary.loop_classification
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64, ele: f64) -> TrackPoint {
        TrackPoint::new(lat, lng, ele)
    }

    /// Latitude offset (degrees) for a given northward distance in meters.
    fn north_m(meters: f64) -> f64 {
        meters / 1000.0 / EARTH_RADIUS_KM * (180.0 / std::f64::consts::PI)
    }

    #[test]
    fn test_distance_is_sum_of_segments() {
        let points = vec![
            p(42.60, -0.10, 1000.0),
            p(42.61, -0.09, 1100.0),
            p(42.63, -0.08, 1050.0),
            p(42.64, -0.05, 1200.0),
        ];
        let expected: f64 = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
        let summary = analyze(&points);
        assert!((summary.distance_km - expected).abs() <= 0.05);
        assert!(summary.distance_km > 0.0);

        let cumulative = cumulative_distances_km(&points);
        assert_eq!(cumulative.len(), 4);
        assert_eq!(cumulative[0], 0.0);
        assert!((cumulative[3] - expected).abs() < 1e-9);
        assert!(cumulative.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_elevation_gain_and_loss() {
        let points = vec![
            p(0.0, 0.0, 100.0),
            p(0.0, 0.001, 150.0),
            p(0.0, 0.002, 120.0),
            p(0.0, 0.003, 0.0),
            p(0.0, 0.004, 60.0),
        ];
        let (gain, loss) = elevation_gain_loss(&points);
        assert_eq!(gain, 110.0);
        assert_eq!(loss, 150.0);

        let summary = analyze(&points);
        assert_eq!(summary.min_elevation_m, 0.0);
        assert_eq!(summary.max_elevation_m, 150.0);
    }

    #[test]
    fn test_loop_classification_threshold() {
        let start = p(42.0, 0.0, 0.0);
        let far = p(42.05, 0.0, 0.0);

        let near_end = p(42.0 + north_m(50.0), 0.0, 0.0);
        assert_eq!(
            classify_loop(&[start, far, near_end]),
            LoopClassification::Circular
        );

        let distant_end = p(42.0 + north_m(500.0), 0.0, 0.0);
        assert_eq!(
            classify_loop(&[start, far, distant_end]),
            LoopClassification::InicioFin
        );
    }

    #[test]
    fn test_duration_format() {
        // 8 km / 4 = 2h, 300 m / 300 = 1h
        assert_eq!(estimate_duration(8.0, 300.0), "3-4 horas");
        assert_eq!(estimate_duration(5.0, 150.0), "1-2 horas");
        assert_eq!(estimate_duration(2.0, 0.0), "30 minutos");
        assert_eq!(estimate_duration(0.0, 0.0), "0 minutos");
    }

    #[test]
    fn test_degenerate_tracks() {
        let single = analyze(&[p(42.0, 0.0, 900.0)]);
        assert_eq!(single.distance_km, 0.0);
        assert_eq!(single.elevation_gain_m, 0.0);
        assert_eq!(single.min_elevation_m, 900.0);
        assert_eq!(single.loop_classification, LoopClassification::Circular);
        assert!(single.start.is_some());

        let empty = analyze(&[]);
        assert_eq!(empty.distance_km, 0.0);
        assert!(empty.start.is_none());
    }
}
