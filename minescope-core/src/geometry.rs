//! Canonical polygon rings and bounding boxes from heterogeneous
//! GeoJSON-ish encodings.
//!
//! Everything here degrades to `None` on malformed input; a block without
//! usable geometry still gets a row downstream.

use crate::fields::{as_finite, pick_number};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `[lon, lat]` in degrees.
pub type LonLat = [f64; 2];
pub type Ring = Vec<LonLat>;

const MIN_RING_POINTS: usize = 3;

/// Axis-aligned envelope, serialized as `[minLon, minLat, maxLon, maxLat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    pub fn center(&self) -> LonLat {
        [
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        ]
    }

    fn envelope<'a, I: IntoIterator<Item = &'a LonLat>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first[0], first[1], first[0], first[1]);
        for p in iter {
            bbox.min_lon = bbox.min_lon.min(p[0]);
            bbox.min_lat = bbox.min_lat.min(p[1]);
            bbox.max_lon = bbox.max_lon.max(p[0]);
            bbox.max_lat = bbox.max_lat.max(p[1]);
        }
        Some(bbox)
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lon, b.min_lat, b.max_lon, b.max_lat]
    }
}

/// Parse a 2+ element sequence into `[lon, lat]`. Both components must be
/// finite numbers; extra components (altitude) are ignored.
pub fn normalize_coordinate(value: &Value) -> Option<LonLat> {
    let items = value.as_array()?;
    if items.len() < 2 {
        return None;
    }
    let lon = as_finite(&items[0])?;
    let lat = as_finite(&items[1])?;
    Some([lon, lat])
}

/// Accepts a literal `[minLon, minLat, maxLon, maxLat]` tuple, a sequence of
/// coordinate pairs (envelope is computed), or an object carrying the four
/// edges under common names.
pub fn normalize_bounds_tuple(value: &Value) -> Option<BoundingBox> {
    match value {
        Value::Array(items) => {
            if items.len() == 4 && items.iter().all(|v| !v.is_array()) {
                let nums: Option<Vec<f64>> = items.iter().map(as_finite).collect();
                return nums.map(|n| BoundingBox::new(n[0], n[1], n[2], n[3]));
            }
            let points: Vec<LonLat> = items.iter().filter_map(normalize_coordinate).collect();
            if points.len() < 2 {
                return None;
            }
            BoundingBox::envelope(&points)
        }
        Value::Object(_) => {
            let min_lon = pick_number(value, &["min_lon", "minLon", "west", "xmin", "minx"])?;
            let min_lat = pick_number(value, &["min_lat", "minLat", "south", "ymin", "miny"])?;
            let max_lon = pick_number(value, &["max_lon", "maxLon", "east", "xmax", "maxx"])?;
            let max_lat = pick_number(value, &["max_lat", "maxLat", "north", "ymax", "maxy"])?;
            Some(BoundingBox::new(min_lon, min_lat, max_lon, max_lat))
        }
        _ => None,
    }
}

/// Normalize a geometry into a flat list of rings.
///
/// Dispatches on `type`: `Polygon` keeps each ring, `MultiPolygon` flattens
/// rings across polygons, `Feature` recurses into its geometry, and a bare
/// coordinate array is accepted at ring, polygon or multipolygon depth.
/// Rings with fewer than three valid points are dropped.
pub fn normalize_polygon_rings(geometry: &Value) -> Option<Vec<Ring>> {
    let rings = match geometry {
        Value::Object(map) => match map.get("type").and_then(Value::as_str) {
            Some("Polygon") => rings_from_polygon(map.get("coordinates")?),
            Some("MultiPolygon") => rings_from_multipolygon(map.get("coordinates")?),
            Some("Feature") => return normalize_polygon_rings(map.get("geometry")?),
            Some(other) => {
                log::debug!("Unsupported geometry type '{}'", other);
                return None;
            }
            None => rings_from_bare(map.get("coordinates")?),
        },
        Value::Array(_) => rings_from_bare(geometry),
        _ => return None,
    };

    if rings.is_empty() {
        None
    } else {
        Some(rings)
    }
}

/// Envelope over every point of every ring.
pub fn bounds_from_polygon(rings: &[Ring]) -> Option<BoundingBox> {
    BoundingBox::envelope(rings.iter().flatten())
}

fn normalize_ring(value: &Value) -> Option<Ring> {
    let ring: Ring = value
        .as_array()?
        .iter()
        .filter_map(normalize_coordinate)
        .collect();
    (ring.len() >= MIN_RING_POINTS).then_some(ring)
}

fn rings_from_polygon(coords: &Value) -> Vec<Ring> {
    coords
        .as_array()
        .map(|rings| rings.iter().filter_map(normalize_ring).collect())
        .unwrap_or_default()
}

fn rings_from_multipolygon(coords: &Value) -> Vec<Ring> {
    coords
        .as_array()
        .map(|polys| polys.iter().flat_map(rings_from_polygon).collect())
        .unwrap_or_default()
}

/// Depth of nesting until the first non-array element: 1 for a coordinate,
/// 2 for a ring, 3 for a polygon, 4 for a multipolygon.
fn nesting_depth(value: &Value) -> usize {
    let mut depth = 0;
    let mut current = value;
    while let Some(first) = current.as_array().and_then(|a| a.first()) {
        depth += 1;
        current = first;
    }
    depth
}

fn rings_from_bare(coords: &Value) -> Vec<Ring> {
    match nesting_depth(coords) {
        2 => normalize_ring(coords).into_iter().collect(),
        3 => rings_from_polygon(coords),
        4 => rings_from_multipolygon(coords),
        _ => Vec::new(),
    }
}
