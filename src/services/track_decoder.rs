use crate::error::{AppError, Result};
use crate::models::{Coordinates, DecodedTrack, RawWaypoint, TrackPoint};
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

/// Supported track file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Gpx,
    Kml,
}

impl TrackFormat {
    /// Pick the format from the file extension, sniffing the content when
    /// the extension is missing or unknown.
    pub fn detect(filename: Option<&str>, raw: &str) -> Self {
        let extension = filename
            .and_then(|f| Path::new(f).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("kml") => TrackFormat::Kml,
            Some("gpx") => TrackFormat::Gpx,
            _ if raw.contains("<kml") => TrackFormat::Kml,
            _ => TrackFormat::Gpx,
        }
    }
}

/// Everything pulled out of the document before precedence rules apply.
#[derive(Debug, Default)]
struct ParsedDocument {
    document_name: Option<String>,
    document_desc: Option<String>,
    track_name: Option<String>,
    track_desc: Option<String>,
    route_name: Option<String>,
    route_desc: Option<String>,
    track_points: Vec<TrackPoint>,
    route_points: Vec<TrackPoint>,
    waypoints: Vec<RawWaypoint>,
}

/// Decode a raw track file into ordered points, waypoints and a title.
///
/// Title precedence is document name, then track name, then route name,
/// then the filename with its extension stripped. Track segment points are
/// preferred; route points are used only when no track points exist.
pub fn decode_track(raw: &str, filename: Option<&str>) -> Result<DecodedTrack> {
    let format = TrackFormat::detect(filename, raw);
    let doc = match format {
        TrackFormat::Gpx => parse_gpx(raw)?,
        TrackFormat::Kml => parse_kml(raw)?,
    };

    let title = [doc.document_name, doc.track_name, doc.route_name]
        .into_iter()
        .flatten()
        .map(|t| collapse_whitespace(&t))
        .find(|t| !t.is_empty())
        .or_else(|| filename.and_then(title_from_filename));

    let description = [doc.document_desc, doc.track_desc, doc.route_desc]
        .into_iter()
        .flatten()
        .map(|d| d.trim().to_string())
        .find(|d| !d.is_empty());

    let track_points = if doc.track_points.is_empty() {
        doc.route_points
    } else {
        doc.track_points
    };

    if track_points.is_empty() {
        return Err(AppError::Parse(format!(
            "No track or route points found in {:?} file",
            format
        )));
    }

    tracing::debug!(
        format = ?format,
        points = track_points.len(),
        waypoints = doc.waypoints.len(),
        "Decoded track: {} points, {} waypoints",
        track_points.len(),
        doc.waypoints.len()
    );

    Ok(DecodedTrack {
        title,
        description,
        track_points,
        waypoints: doc.waypoints,
    })
}

/// `ruta_ordesa-monte-perdido.gpx` becomes `ruta ordesa monte perdido`.
pub fn title_from_filename(filename: &str) -> Option<String> {
    let stem = Path::new(filename).file_stem()?.to_str()?;
    let title = collapse_whitespace(&stem.replace(['_', '-'], " "));
    (!title.is_empty()).then_some(title)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn set_once(slot: &mut Option<String>, value: String) {
    if slot.is_none() && !value.trim().is_empty() {
        *slot = Some(value);
    }
}

fn xml_error(e: quick_xml::Error) -> AppError {
    AppError::Parse(format!("Malformed XML: {}", e))
}

fn valid_position(lat: f64, lng: f64) -> bool {
    Coordinates::new(lat, lng).is_ok()
}

// ── GPX ─────────────────────────────────────────────────────

/// A wpt/rtept/trkpt with the children we care about.
struct GpxPoint {
    lat: f64,
    lon: f64,
    ele: Option<f64>,
    name: Option<String>,
    desc: Option<String>,
}

impl GpxPoint {
    fn new(lat: f64, lon: f64) -> Self {
        GpxPoint {
            lat,
            lon,
            ele: None,
            name: None,
            desc: None,
        }
    }

    fn into_track_point(self) -> TrackPoint {
        TrackPoint::new(self.lat, self.lon, self.ele.unwrap_or(0.0))
    }

    fn into_waypoint(self) -> RawWaypoint {
        RawWaypoint {
            lat: self.lat,
            lng: self.lon,
            elevation: self.ele,
            name: self.name.map(|n| collapse_whitespace(&n)).filter(|n| !n.is_empty()),
            description: self.desc.filter(|d| !d.trim().is_empty()),
        }
    }
}

fn parse_gpx(xml: &str) -> Result<ParsedDocument> {
    let mut reader = Reader::from_str(xml);
    let mut doc = ParsedDocument::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"gpx" => {}
                b"metadata" => parse_metadata(&mut reader, &mut doc)?,
                // GPX 1.0 keeps name/desc directly under the root
                b"name" => set_once(&mut doc.document_name, read_text_owned(&mut reader, &e)?),
                b"desc" => set_once(&mut doc.document_desc, read_text_owned(&mut reader, &e)?),
                b"wpt" => {
                    if let Some(pt) = parse_point(&e, &mut reader)? {
                        doc.waypoints.push(pt.into_waypoint());
                    }
                }
                b"trk" => parse_track(&mut reader, &mut doc)?,
                b"rte" => parse_route(&mut reader, &mut doc)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"wpt" {
                    if let Some((lat, lon)) = parse_lat_lon(&e) {
                        doc.waypoints.push(GpxPoint::new(lat, lon).into_waypoint());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(doc)
}

/// Read lat/lon attributes; `None` when either is missing, unparseable or
/// out of range.
fn parse_lat_lon(e: &BytesStart<'_>) -> Option<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr in e.attributes().flatten() {
        let val = std::str::from_utf8(&attr.value).unwrap_or_default().trim();
        match attr.key.local_name().as_ref() {
            b"lat" => lat = val.parse().ok(),
            b"lon" => lon = val.parse().ok(),
            _ => {}
        }
    }

    let (lat, lon) = (lat?, lon?);
    valid_position(lat, lon).then_some((lat, lon))
}

/// Called after Event::Start for a point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<Option<GpxPoint>> {
    let Some((lat, lon)) = parse_lat_lon(start) else {
        reader.read_to_end(start.name()).map_err(xml_error)?;
        return Ok(None);
    };

    let mut point = GpxPoint::new(lat, lon);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => point.ele = read_text_owned(reader, &e)?.parse::<f64>().ok(),
                b"name" => point.name = Some(read_text_owned(reader, &e)?),
                b"desc" => point.desc = Some(read_text_owned(reader, &e)?),
                b"cmt" => {
                    let cmt = read_text_owned(reader, &e)?;
                    if point.desc.is_none() {
                        point.desc = Some(cmt);
                    }
                }
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(Some(point))
}

fn parse_metadata(reader: &mut Reader<&[u8]>, doc: &mut ParsedDocument) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => set_once(&mut doc.document_name, read_text_owned(reader, &e)?),
                b"desc" => set_once(&mut doc.document_desc, read_text_owned(reader, &e)?),
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"metadata" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
    Ok(())
}

fn parse_track(reader: &mut Reader<&[u8]>, doc: &mut ParsedDocument) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => set_once(&mut doc.track_name, read_text_owned(reader, &e)?),
                b"desc" => set_once(&mut doc.track_desc, read_text_owned(reader, &e)?),
                b"trkseg" => parse_segment(reader, &mut doc.track_points)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
    Ok(())
}

fn parse_segment(reader: &mut Reader<&[u8]>, points: &mut Vec<TrackPoint>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    if let Some(pt) = parse_point(&e, reader)? {
                        points.push(pt.into_track_point());
                    }
                }
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    if let Some((lat, lon)) = parse_lat_lon(&e) {
                        points.push(TrackPoint::new(lat, lon, 0.0));
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
    Ok(())
}

fn parse_route(reader: &mut Reader<&[u8]>, doc: &mut ParsedDocument) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => set_once(&mut doc.route_name, read_text_owned(reader, &e)?),
                b"desc" => set_once(&mut doc.route_desc, read_text_owned(reader, &e)?),
                b"rtept" => {
                    if let Some(pt) = parse_point(&e, reader)? {
                        doc.route_points.push(pt.into_track_point());
                    }
                }
                _ => {
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"rtept" {
                    if let Some((lat, lon)) = parse_lat_lon(&e) {
                        doc.route_points.push(TrackPoint::new(lat, lon, 0.0));
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"rte" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }
    Ok(())
}

/// Read the text content of an element, including CDATA and entity
/// references, trimmed.
fn read_text_owned(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default()),
            Ok(Event::CData(e)) => text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default()),
            Ok(Event::GeneralRef(e)) => push_entity(&mut text, &e),
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}

fn push_entity(text: &mut String, e: &BytesRef<'_>) {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        text.push(ch);
        return;
    }
    match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
        "amp" => text.push('&'),
        "lt" => text.push('<'),
        "gt" => text.push('>'),
        "quot" => text.push('"'),
        "apos" => text.push('\''),
        _ => {}
    }
}

// ── KML ─────────────────────────────────────────────────────

#[derive(Default)]
struct Placemark {
    name: Option<String>,
    description: Option<String>,
    point: Option<(f64, f64, Option<f64>)>,
    line: Vec<(f64, f64, Option<f64>)>,
}

fn parse_kml(xml: &str) -> Result<ParsedDocument> {
    let mut reader = Reader::from_str(xml);
    let mut doc = ParsedDocument::default();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut placemark: Option<Placemark> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"Placemark" {
                    placemark = Some(Placemark::default());
                }
                text.clear();
                path.push(name);
            }
            Ok(Event::Text(e)) => text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default()),
            Ok(Event::CData(e)) => text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default()),
            Ok(Event::GeneralRef(e)) => push_entity(&mut text, &e),
            Ok(Event::End(_)) => {
                let Some(name) = path.pop() else {
                    continue;
                };
                let parent = path.last().map(|p| p.as_slice());
                let value = std::mem::take(&mut text).trim().to_string();

                match (name.as_slice(), parent) {
                    (b"name", Some(b"Document")) => set_once(&mut doc.document_name, value),
                    (b"description", Some(b"Document")) => set_once(&mut doc.document_desc, value),
                    (b"name", Some(b"Placemark")) => {
                        if let Some(pm) = placemark.as_mut() {
                            set_once(&mut pm.name, value);
                        }
                    }
                    (b"description", Some(b"Placemark")) => {
                        if let Some(pm) = placemark.as_mut() {
                            set_once(&mut pm.description, value);
                        }
                    }
                    (b"coordinates", Some(b"Point")) => {
                        if let Some(pm) = placemark.as_mut() {
                            pm.point = parse_kml_coordinates(&value).into_iter().next();
                        }
                    }
                    (b"coordinates", Some(b"LineString")) => {
                        if let Some(pm) = placemark.as_mut() {
                            pm.line.extend(parse_kml_coordinates(&value));
                        }
                    }
                    (b"Placemark", _) => {
                        if let Some(pm) = placemark.take() {
                            finish_placemark(pm, &mut doc);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(doc)
}

fn finish_placemark(pm: Placemark, doc: &mut ParsedDocument) {
    if !pm.line.is_empty() {
        if let Some(name) = pm.name {
            set_once(&mut doc.track_name, name);
        }
        if let Some(desc) = pm.description {
            set_once(&mut doc.track_desc, desc);
        }
        doc.track_points.extend(
            pm.line
                .into_iter()
                .map(|(lat, lng, ele)| TrackPoint::new(lat, lng, ele.unwrap_or(0.0))),
        );
    } else if let Some((lat, lng, elevation)) = pm.point {
        doc.waypoints.push(RawWaypoint {
            lat,
            lng,
            elevation,
            name: pm.name.map(|n| collapse_whitespace(&n)),
            description: pm.description,
        });
    }
}

/// KML tuples are `lng,lat[,alt]` separated by whitespace.
fn parse_kml_coordinates(text: &str) -> Vec<(f64, f64, Option<f64>)> {
    text.split_whitespace()
        .filter_map(|tuple| {
            let mut parts = tuple.split(',').map(|p| p.trim().parse::<f64>());
            let lng = parts.next()?.ok()?;
            let lat = parts.next()?.ok()?;
            let ele = parts.next().and_then(|p| p.ok());
            valid_position(lat, lng).then_some((lat, lng, ele))
        })
        .collect()
}
