//! Deterministic metadata built from the route title alone.
//!
//! Used whenever AI enrichment is unavailable or unrecoverable. The output
//! has the same shape as a good provider response, and its images are
//! static maps on the allow-listed host.

use crate::models::{Coordinates, EnrichedMetadata, ImageReference, SeoFields};
use crate::services::images::MapsUrlBuilder;

const SEO_TITLE_MAX_CHARS: usize = 60;
const SEO_DESCRIPTION_MAX_CHARS: usize = 155;
const GALLERY_SIZE: usize = 3;

struct RegionEntry {
    terms: &'static [&'static str],
    region: &'static str,
    province: &'static str,
    centroid: (f64, f64),
    high_mountain: bool,
}

/// Ordered: more specific areas before the ranges that contain them.
const REGIONS: &[RegionEntry] = &[
    RegionEntry {
        terms: &["ordesa", "monte perdido", "góriz", "goriz", "torla", "añisclo", "pineta"],
        region: "Aragón",
        province: "Huesca",
        centroid: (42.65, -0.05),
        high_mountain: true,
    },
    RegionEntry {
        terms: &["benasque", "aneto", "posets", "panticosa", "ibón", "ibon", "ibones"],
        region: "Aragón",
        province: "Huesca",
        centroid: (42.60, 0.52),
        high_mountain: true,
    },
    RegionEntry {
        terms: &["aigüestortes", "aiguestortes", "sant maurici", "vall de boí", "estany", "estanys"],
        region: "Cataluña",
        province: "Lleida",
        centroid: (42.58, 0.95),
        high_mountain: true,
    },
    RegionEntry {
        terms: &["picos de europa", "covadonga", "ruta del cares", "naranjo de bulnes", "urriellu"],
        region: "Asturias",
        province: "Asturias",
        centroid: (43.20, -4.85),
        high_mountain: true,
    },
    RegionEntry {
        terms: &["sierra nevada", "mulhacén", "mulhacen", "veleta", "alpujarra"],
        region: "Andalucía",
        province: "Granada",
        centroid: (37.05, -3.31),
        high_mountain: true,
    },
    RegionEntry {
        terms: &["gredos", "almanzor", "laguna grande"],
        region: "Castilla y León",
        province: "Ávila",
        centroid: (40.25, -5.27),
        high_mountain: true,
    },
    RegionEntry {
        terms: &["guadarrama", "peñalara", "penalara", "navacerrada", "pedriza", "cercedilla"],
        region: "Comunidad de Madrid",
        province: "Madrid",
        centroid: (40.82, -3.95),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["montseny", "montserrat", "collserola"],
        region: "Cataluña",
        province: "Barcelona",
        centroid: (41.77, 2.40),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["teide", "anaga", "tenerife"],
        region: "Canarias",
        province: "Santa Cruz de Tenerife",
        centroid: (28.27, -16.64),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["moncayo"],
        region: "Aragón",
        province: "Zaragoza",
        centroid: (41.79, -1.84),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["albarracín", "albarracin", "teruel"],
        region: "Aragón",
        province: "Teruel",
        centroid: (40.41, -1.44),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["urbasa", "aralar", "irati", "navarra"],
        region: "Navarra",
        province: "Navarra",
        centroid: (42.90, -1.70),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["gorbea", "urkiola", "aizkorri", "anboto"],
        region: "País Vasco",
        province: "Bizkaia",
        centroid: (43.04, -2.78),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["cazorla", "sierra de segura"],
        region: "Andalucía",
        province: "Jaén",
        centroid: (37.91, -2.95),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["grazalema"],
        region: "Andalucía",
        province: "Cádiz",
        centroid: (36.77, -5.40),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["tramuntana", "mallorca"],
        region: "Illes Balears",
        province: "Illes Balears",
        centroid: (39.78, 2.78),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["ancares", "courel", "eume"],
        region: "Galicia",
        province: "Lugo",
        centroid: (42.80, -6.90),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["somiedo", "asturias"],
        region: "Asturias",
        province: "Asturias",
        centroid: (43.10, -6.25),
        high_mountain: false,
    },
    RegionEntry {
        terms: &["pirineo", "pirineos", "pyrenees"],
        region: "Aragón",
        province: "Huesca",
        centroid: (42.62, 0.0),
        high_mountain: true,
    },
];

/// (terms, activity label)
const ACTIVITIES: &[(&[&str], &str)] = &[
    (&["ferrata"], "Vía ferrata"),
    (&["btt", "mtb", "bici", "bicicleta", "ciclismo", "cicloturismo", "bike", "gravel"], "Ciclismo"),
    (&["trail", "carrera", "running"], "Trail running"),
    (&["raquetas", "esquí", "esqui", "skimo", "invernal"], "Montaña invernal"),
    (&["vía verde", "via verde"], "Vía verde"),
    (&["pico", "cima", "cumbre", "ascensión", "ascension", "tuca", "tuc", "puig", "tossal"], "Ascensión"),
];

const DEFAULT_ACTIVITY: &str = "Senderismo";

/// Checked in order; "muy difícil" must precede "difícil".
const DIFFICULTIES: &[(&[&str], &str)] = &[
    (&["muy difícil", "muy dificil", "extrema", "extremo"], "Muy difícil"),
    (&["difícil", "dificil", "exigente", "alpina", "aérea", "aerea"], "Difícil"),
    (&["fácil", "facil", "familiar", "familia", "paseo", "niños", "ninos", "sencilla", "vía verde", "via verde"], "Fácil"),
];

/// Lowercase, non-alphanumerics to spaces, padded so terms can be matched
/// as whole words with `contains(" term ")`.
fn normalize(text: &str) -> String {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    format!(" {} ", words.join(" "))
}

fn mentions(normalized: &str, term: &str) -> bool {
    normalized.contains(&format!(" {} ", term))
}

fn find_region(normalized: &str) -> Option<&'static RegionEntry> {
    REGIONS
        .iter()
        .find(|entry| entry.terms.iter().any(|t| mentions(normalized, t)))
}

fn find_activity(normalized: &str) -> &'static str {
    ACTIVITIES
        .iter()
        .find(|(terms, _)| terms.iter().any(|t| mentions(normalized, t)))
        .map(|(_, label)| *label)
        .unwrap_or(DEFAULT_ACTIVITY)
}

fn find_difficulty(normalized: &str, activity: &str) -> &'static str {
    DIFFICULTIES
        .iter()
        .find(|(terms, _)| terms.iter().any(|t| mentions(normalized, t)))
        .map(|(_, label)| *label)
        .unwrap_or(match activity {
            "Vía ferrata" | "Montaña invernal" => "Difícil",
            "Vía verde" => "Fácil",
            _ => "Moderada",
        })
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// URL slug with Spanish and Catalan diacritics folded to ASCII.
pub fn slugify(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect();

    folded
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn safety_tips(activity: &str, high_mountain: bool) -> Vec<String> {
    let mut tips = vec![
        "Consulta la previsión meteorológica antes de salir y evita la ruta con tormenta."
            .to_string(),
        "Lleva agua suficiente, comida y ropa de abrigo aunque el día parezca estable.".to_string(),
        "Descarga el track en tu dispositivo y lleva batería de reserva.".to_string(),
        "Avisa a alguien de tu itinerario y de la hora prevista de regreso.".to_string(),
    ];
    match activity {
        "Vía ferrata" => tips.push(
            "Usa casco, arnés y disipador homologados y revisa el estado de los anclajes."
                .to_string(),
        ),
        "Ciclismo" => tips.push(
            "Usa casco, respeta a los senderistas y modera la velocidad en los descensos."
                .to_string(),
        ),
        "Montaña invernal" => tips.push(
            "Consulta el boletín de aludes y lleva material invernal adecuado.".to_string(),
        ),
        _ => {}
    }
    if high_mountain {
        tips.push(
            "En alta montaña el tiempo cambia rápido: madruga y ten prevista una retirada."
                .to_string(),
        );
    }
    tips
}

fn best_season(region: Option<&RegionEntry>, activity: &str) -> &'static str {
    match (region, activity) {
        (_, "Montaña invernal") => "De diciembre a marzo, según el estado de la nieve",
        (Some(r), _) if r.region == "Canarias" => "Todo el año",
        (Some(r), _) if r.high_mountain => "De junio a octubre",
        _ => "Primavera y otoño",
    }
}

/// Build complete metadata for `title`. `center` (usually the track start)
/// positions the static maps; without it the matched region's centroid or
/// the default centre is used.
pub fn synthesize(
    title: &str,
    center: Option<Coordinates>,
    maps: &MapsUrlBuilder,
) -> EnrichedMetadata {
    let title = title.trim();
    let normalized = normalize(title);
    let region = find_region(&normalized);
    let activity = find_activity(&normalized);
    let difficulty = find_difficulty(&normalized, activity);

    let (region_name, province) = region
        .map(|r| (r.region.to_string(), r.province.to_string()))
        .unwrap_or_default();
    let high_mountain = region.map(|r| r.high_mountain).unwrap_or(false);

    let place_phrase = match region {
        Some(r) if r.province != r.region => format!(" en {} ({})", r.province, r.region),
        Some(r) => format!(" en {}", r.region),
        None => String::new(),
    };

    let description = format!(
        "{} es una ruta de {} de dificultad {}{}.",
        title,
        activity.to_lowercase(),
        difficulty.to_lowercase(),
        place_phrase
    );

    let narrative = format!(
        "{description}\n\n\
El recorrido sigue el track GPX incluido, que recoge la distancia, el desnivel y los puntos \
de interés registrados sobre el terreno. Revisa el perfil de elevación antes de salir para \
repartir bien el esfuerzo.\n\n\
{season_note} Como en cualquier salida al medio natural, respeta la señalización, no dejes \
residuos y adapta el plan a tu experiencia y a las condiciones del día.",
        description = description,
        season_note = format!(
            "La mejor época para hacerla es: {}.",
            best_season(region, activity).to_lowercase()
        ),
    );

    let mut highlights = vec![format!("Recorrido completo de {}", title)];
    if let Some(r) = region {
        highlights.push(format!("Paisajes de {}", r.region));
    }
    if high_mountain {
        highlights.push("Entorno de alta montaña".to_string());
    }

    let mut keywords: Vec<String> = vec![
        title.to_lowercase(),
        activity.to_lowercase(),
        region_name.to_lowercase(),
        province.to_lowercase(),
        "ruta".to_string(),
        "track gpx".to_string(),
    ];
    keywords.retain(|k| !k.is_empty());
    keywords.dedup();

    let seo = SeoFields {
        title: truncate_chars(&format!("{} | Ruta de {}", title, activity), SEO_TITLE_MAX_CHARS),
        meta_description: truncate_chars(&description, SEO_DESCRIPTION_MAX_CHARS),
        keywords,
        slug: slugify(title),
    };

    let map_center = center.or_else(|| {
        region.and_then(|r| Coordinates::new(r.centroid.0, r.centroid.1).ok())
    });

    let primary_image = maps.static_map_image(map_center, 0, format!("Mapa de {}", title));
    let gallery_alts = [
        format!("Vista de satélite de {}", title),
        format!("Relieve de la zona de {}", title),
        format!("Mapa de situación de {}", title),
    ];
    let gallery: Vec<ImageReference> = gallery_alts
        .into_iter()
        .take(GALLERY_SIZE)
        .enumerate()
        .map(|(i, alt)| maps.static_map_image(map_center, i + 1, alt))
        .collect();

    EnrichedMetadata {
        description,
        difficulty: difficulty.to_string(),
        duration_text: String::new(),
        route_type: activity.to_string(),
        region: region_name,
        province,
        locality: String::new(),
        best_season: best_season(region, activity).to_string(),
        access: format!(
            "Comprueba el acceso al punto de inicio de {} antes de salir; el track marca el recorrido completo.",
            title
        ),
        parking: "Infórmate de las zonas de aparcamiento cercanas al inicio de la ruta.".to_string(),
        public_transport: "Consulta las líneas de autobús regionales que dan servicio a la zona."
            .to_string(),
        water_points: "No hay fuentes confirmadas en el recorrido; lleva agua suficiente."
            .to_string(),
        safety_tips: safety_tips(activity, high_mountain),
        highlights,
        narrative,
        seo,
        primary_image: Some(primary_image),
        gallery,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps() -> MapsUrlBuilder {
        MapsUrlBuilder::new(Some("k".to_string()))
    }

    #[test]
    fn test_region_and_activity_from_title() {
        let m = synthesize("Ascensión al Pico Aneto desde Benasque", None, &maps());
        assert_eq!(m.region, "Aragón");
        assert_eq!(m.province, "Huesca");
        assert_eq!(m.route_type, "Ascensión");
        assert_eq!(m.best_season, "De junio a octubre");
        assert!(m.description.contains("en Huesca (Aragón)"));
    }

    #[test]
    fn test_unknown_title_still_complete() {
        let m = synthesize("Roca X", None, &maps());
        assert_eq!(m.region, "");
        assert_eq!(m.route_type, "Senderismo");
        assert_eq!(m.difficulty, "Moderada");
        assert!(m.has_content());
        assert!(!m.narrative.is_empty());
        assert!(!m.safety_tips.is_empty());
        assert_eq!(m.seo.slug, "roca-x");
        assert!(m.primary_image.is_some());
        assert_eq!(m.gallery.len(), GALLERY_SIZE);
    }

    #[test]
    fn test_difficulty_keywords() {
        let easy = synthesize("Paseo familiar por la Vía Verde del Aceite", None, &maps());
        assert_eq!(easy.difficulty, "Fácil");
        assert_eq!(easy.route_type, "Vía verde");

        let hard = synthesize("Travesía muy difícil de Gredos", None, &maps());
        assert_eq!(hard.difficulty, "Muy difícil");
        assert_eq!(hard.province, "Ávila");

        let ferrata = synthesize("Ferrata de Sant Benet", None, &maps());
        assert_eq!(ferrata.difficulty, "Difícil");
    }

    #[test]
    fn test_images_are_allow_listed_static_maps() {
        let m = synthesize("Circular del Montseny", None, &maps());
        let images: Vec<&ImageReference> =
            m.primary_image.iter().chain(m.gallery.iter()).collect();
        assert_eq!(images.len(), 4);
        for image in images {
            assert!(MapsUrlBuilder::is_allowed(&image.url), "{}", image.url);
            assert!(image.url.contains("center=41.770000%2C2.400000"));
            assert!(!image.alt.is_empty());
        }
    }

    #[test]
    fn test_explicit_center_wins() {
        let start = Coordinates::new(42.1, -0.4).unwrap();
        let m = synthesize("Circular del Montseny", Some(start), &maps());
        let primary = m.primary_image.unwrap();
        assert!(primary.url.contains("center=42.100000%2C-0.400000"));
    }

    #[test]
    fn test_deterministic() {
        let a = synthesize("Ruta del Cares", None, &maps());
        let b = synthesize("Ruta del Cares", None, &maps());
        assert_eq!(a, b);
        assert_eq!(a.region, "Asturias");
    }

    #[test]
    fn test_slugify_and_truncation() {
        assert_eq!(slugify("Ibón de Plan / Basa de la Mora"), "ibon-de-plan-basa-de-la-mora");
        assert_eq!(slugify("  Cañón d'Añisclo  "), "canon-d-anisclo");
        assert_eq!(truncate_chars("abcdef", 4), "abc…");
        assert_eq!(truncate_chars("abc", 4), "abc");
    }
}
