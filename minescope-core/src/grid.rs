//! Dense elevation/depth grids attached to quantitative block metrics.

use crate::axis::{axis_values_from_json, compute_axis_positions, AxisExtent};
use crate::fields::{as_finite, pick, pick_number, pick_string};
use crate::geometry::normalize_bounds_tuple;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Matrix = Vec<Vec<Option<f64>>>;

const ELEVATION_KEYS: &[&str] = &["elevation", "elevation_grid", "elevationGrid", "z", "dem"];
const DEPTH_KEYS: &[&str] = &["depth", "depth_grid", "depthGrid"];
const X_KEYS: &[&str] = &["x", "x_coords", "xCoords", "x_axis", "xAxis", "lon", "longitudes"];
const Y_KEYS: &[&str] = &["y", "y_coords", "yCoords", "y_axis", "yAxis", "lat", "latitudes"];
const BOUNDS_KEYS: &[&str] = &["bounds", "bbox", "extent"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationGrid {
    /// One position per column.
    pub x: Vec<f64>,
    /// One position per row.
    pub y: Vec<f64>,
    /// Row-major, rectangular.
    pub elevation: Matrix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<Matrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rim_elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_y: Option<f64>,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "m".to_string()
}

impl VisualizationGrid {
    /// Build a grid from a backend visualization record.
    ///
    /// Returns `None` when the elevation matrix is missing, empty, or ragged;
    /// a ragged grid is treated as absent rather than padded.
    pub fn from_json(value: &Value) -> Option<Self> {
        let elevation = pick(value, ELEVATION_KEYS).and_then(parse_matrix)?;
        let rows = elevation.len();
        let columns = elevation[0].len();

        let depth = pick(value, DEPTH_KEYS).and_then(parse_matrix).filter(|d| {
            let same_shape = d.len() == rows && d[0].len() == columns;
            if !same_shape {
                log::debug!("Depth matrix shape differs from elevation {}x{}; dropping it", rows, columns);
            }
            same_shape
        });

        let (resolution_x, resolution_y) = read_resolution(value);
        let bounds = pick(value, BOUNDS_KEYS).and_then(normalize_bounds_tuple);

        let x_extent = AxisExtent::new(
            pick_number(value, &["x_min", "xMin", "min_x"]).or(bounds.map(|b| b.min_lon)),
            pick_number(value, &["x_max", "xMax", "max_x"]).or(bounds.map(|b| b.max_lon)),
            resolution_x,
        );
        let y_extent = AxisExtent::new(
            pick_number(value, &["y_min", "yMin", "min_y"]).or(bounds.map(|b| b.min_lat)),
            pick_number(value, &["y_max", "yMax", "max_y"]).or(bounds.map(|b| b.max_lat)),
            resolution_y,
        );

        let provided_x = pick(value, X_KEYS).and_then(axis_values_from_json);
        let provided_y = pick(value, Y_KEYS).and_then(axis_values_from_json);

        Some(Self {
            x: compute_axis_positions(provided_x.as_deref(), columns, &x_extent),
            y: compute_axis_positions(provided_y.as_deref(), rows, &y_extent),
            elevation,
            depth,
            rim_elevation: pick_number(value, &["rim_elevation", "rimElevation", "rim_elevation_m"]),
            resolution_x,
            resolution_y,
            unit: pick_string(value, &["unit", "units"]).unwrap_or_else(default_unit),
        })
    }

    pub fn rows(&self) -> usize {
        self.elevation.len()
    }

    pub fn columns(&self) -> usize {
        self.elevation.first().map_or(0, Vec::len)
    }

    pub fn has_elevation(&self) -> bool {
        self.rows() > 0 && self.columns() > 0
    }

    /// Finite min/max of the elevation surface, for colour-scale ranging.
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        value_range(&self.elevation)
    }

    pub fn depth_range(&self) -> Option<(f64, f64)> {
        self.depth.as_ref().and_then(|d| value_range(d))
    }
}

/// Parse a JSON 2D array into a rectangular matrix of nullable cells.
pub fn parse_matrix(value: &Value) -> Option<Matrix> {
    let rows = value.as_array()?;
    let matrix: Matrix = rows
        .iter()
        .map(|row| row.as_array().map(|cells| cells.iter().map(as_finite).collect()))
        .collect::<Option<Matrix>>()?;

    let columns = matrix.first().map_or(0, Vec::len);
    if columns == 0 || matrix.iter().any(|row| row.len() != columns) {
        log::debug!("Rejecting empty or ragged matrix with {} rows", matrix.len());
        return None;
    }
    Some(matrix)
}

pub fn value_range(matrix: &Matrix) -> Option<(f64, f64)> {
    matrix
        .iter()
        .flatten()
        .flatten()
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Resolution may arrive as separate fields, a scalar, `[rx, ry]`, or `{x, y}`.
fn read_resolution(value: &Value) -> (Option<f64>, Option<f64>) {
    let mut rx = pick_number(value, &["resolution_x", "resolutionX", "res_x"]);
    let mut ry = pick_number(value, &["resolution_y", "resolutionY", "res_y"]);
    if let Some(shared) = pick(value, &["resolution", "res"]) {
        match shared {
            Value::Array(items) => {
                rx = rx.or_else(|| items.first().and_then(as_finite));
                ry = ry.or_else(|| items.get(1).and_then(as_finite));
            }
            Value::Object(_) => {
                rx = rx.or_else(|| pick_number(shared, &["x"]));
                ry = ry.or_else(|| pick_number(shared, &["y"]));
            }
            other => {
                let scalar = as_finite(other);
                rx = rx.or(scalar);
                ry = ry.or(scalar);
            }
        }
    }
    (rx, ry)
}
