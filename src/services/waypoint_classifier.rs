use crate::constants::WAYPOINT_SNAP_TOLERANCE_M;
use crate::models::{RawWaypoint, TrackPoint, Waypoint, WaypointCategory};
use crate::services::geometry_analyzer::cumulative_distances_km;

/// Keywords per category (Spanish, Catalan, Galician, Basque, English,
/// French). Single words match whole tokens; multi-word entries match as
/// phrases.
fn keywords(category: WaypointCategory) -> &'static [&'static str] {
    match category {
        WaypointCategory::Mirador => &[
            "mirador", "miradores", "viewpoint", "lookout", "belvedere", "mirante", "miradoiro",
            "talaia", "behatokia", "behatoki", "panorámica", "panoramica", "vista", "vistas",
        ],
        WaypointCategory::Puente => &[
            "puente", "puentes", "pont", "ponts", "ponte", "zubia", "zubi", "bridge", "pasarela",
        ],
        WaypointCategory::Fuente => &[
            "fuente", "fuentes", "font", "fonts", "fonte", "iturria", "iturri", "spring",
            "manantial", "source", "abrevadero",
        ],
        WaypointCategory::Enlace => &[
            "enlace", "cruce", "desvío", "desvio", "bifurcación", "bifurcacion", "cruïlla",
            "encreuament", "enllaç", "cruce de caminos", "junction", "intersection", "crossroads",
            "carrefour",
        ],
        WaypointCategory::Iglesia => &[
            "iglesia", "església", "esglesia", "igrexa", "eliza", "elizia", "church", "église",
            "eglise", "catedral", "colegiata", "parroquia", "capilla",
        ],
        WaypointCategory::Hermita => &[
            "ermita", "hermita", "ermitas", "ermida", "ermitage", "hermitage", "santuario",
            "santuari", "baseliza",
        ],
        WaypointCategory::Arbol => &[
            "árbol", "arbol", "arbre", "árbore", "arbore", "zuhaitza", "tree", "roble", "haya",
            "pino", "encina", "tejo", "castaño", "olmo", "carballo", "alcornoque", "sabina",
        ],
        WaypointCategory::Laguna => &[
            "laguna", "lagunas", "lago", "lagos", "ibón", "ibon", "ibones", "estany", "estanys",
            "lagoa", "aintzira", "lake", "lac", "embalse", "pantano", "charca", "pozo", "poza",
        ],
        WaypointCategory::Refugio => &[
            "refugio", "refugi", "refuxio", "aterpea", "aterpe", "refuge", "hut", "shelter",
            "cabaña", "cabana", "borda", "chozo", "albergue", "caseta",
        ],
        WaypointCategory::Pico => &[
            "pico", "picos", "pic", "cima", "cumbre", "cim", "tuca", "tuc", "tossal", "puig",
            "mendi", "gaina", "peak", "summit", "sommet", "monte", "peña", "pena", "alto de",
            "cerro", "vértice", "vertice",
        ],
        WaypointCategory::Unknown => &[],
    }
}

fn matches_keyword(tokens: &[&str], normalized: &str, keyword: &str) -> bool {
    if keyword.contains(' ') {
        normalized.contains(keyword)
    } else {
        tokens.iter().any(|t| *t == keyword)
    }
}

/// Classify a waypoint from its name and description. Categories are tried
/// in [`WaypointCategory::PRECEDENCE`] order and the first hit wins.
pub fn classify(name: Option<&str>, description: Option<&str>) -> WaypointCategory {
    let text = format!("{} {}", name.unwrap_or_default(), description.unwrap_or_default())
        .to_lowercase();
    let tokens: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .collect();
    let normalized = tokens.join(" ");

    WaypointCategory::PRECEDENCE
        .into_iter()
        .find(|category| {
            keywords(*category)
                .iter()
                .any(|kw| matches_keyword(&tokens, &normalized, kw))
        })
        .unwrap_or(WaypointCategory::Unknown)
}

/// Along-track distance (km) from the first trackpoint to where the
/// waypoint sits on the path.
///
/// The nearest trackpoint is found first. Within the snap tolerance its
/// cumulative distance is used as-is; otherwise the distance is
/// interpolated between the nearest point and whichever neighbour is closer
/// to the waypoint, weighted by the waypoint's distance to each.
pub fn project_onto_track(
    waypoint: &RawWaypoint,
    track_points: &[TrackPoint],
    cumulative_km: &[f64],
) -> f64 {
    if track_points.is_empty() || cumulative_km.len() != track_points.len() {
        return 0.0;
    }

    let target = waypoint.coordinates();
    let distances: Vec<f64> = track_points
        .iter()
        .map(|p| p.coordinates().distance_to(&target))
        .collect();

    let nearest = distances
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    if distances[nearest] * 1000.0 <= WAYPOINT_SNAP_TOLERANCE_M || track_points.len() < 2 {
        return cumulative_km[nearest];
    }

    let neighbour = match (nearest.checked_sub(1), nearest + 1 < track_points.len()) {
        (Some(prev), true) => {
            if distances[prev] <= distances[nearest + 1] {
                prev
            } else {
                nearest + 1
            }
        }
        (Some(prev), false) => prev,
        (None, _) => nearest + 1,
    };

    let (a, b) = if neighbour < nearest {
        (neighbour, nearest)
    } else {
        (nearest, neighbour)
    };

    let weight_total = distances[a] + distances[b];
    if weight_total <= f64::EPSILON {
        return cumulative_km[nearest];
    }

    let fraction = distances[a] / weight_total;
    let along = cumulative_km[a] + fraction * (cumulative_km[b] - cumulative_km[a]);
    along.clamp(cumulative_km[a], cumulative_km[b])
}

/// Classify every waypoint and place it along the track.
pub fn classify_waypoints(raw: &[RawWaypoint], track_points: &[TrackPoint]) -> Vec<Waypoint> {
    let cumulative = cumulative_distances_km(track_points);

    raw.iter()
        .map(|wpt| {
            let category = classify(wpt.name.as_deref(), wpt.description.as_deref());
            let distance = project_onto_track(wpt, track_points, &cumulative);
            Waypoint {
                lat: wpt.lat,
                lng: wpt.lng,
                elevation: wpt.elevation,
                name: wpt.name.clone(),
                description: wpt.description.clone(),
                distance_from_start_km: (distance * 100.0).round() / 100.0,
                category,
            }
        })
        .collect()
}
