//! Map plot-interaction points back to exact grid cells.
//!
//! Plot libraries report hover/click points inconsistently: sometimes a
//! `[row, col]` pair, sometimes `[col, row]`, sometimes a flat index, and
//! sometimes only the raw data coordinates. Resolution tries the cheap exact
//! hints first and falls back to nearest-axis matching per dimension.

use crate::fields::{as_finite, lookup, pick_number};
use crate::grid::{Matrix, VisualizationGrid};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const INDEX_HINT_KEYS: &[&str] = &["pointIndex", "point_index", "pointNumber", "point_number", "index"];

/// An interaction point as reported by the plotting surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoverPoint {
    /// Paired index hints, in the order they were reported.
    pub index_pairs: Vec<[f64; 2]>,
    pub linear_index: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl HoverPoint {
    pub fn at(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Default::default() }
    }

    pub fn with_indices(row: usize, column: usize) -> Self {
        Self { index_pairs: vec![[row as f64, column as f64]], ..Default::default() }
    }

    pub fn from_json(value: &Value) -> Self {
        let mut point = Self::default();
        for key in INDEX_HINT_KEYS {
            match lookup(value, key) {
                Some(Value::Array(items)) if items.len() == 2 => {
                    if let (Some(a), Some(b)) = (as_finite(&items[0]), as_finite(&items[1])) {
                        point.index_pairs.push([a, b]);
                    }
                }
                Some(other) => {
                    if point.linear_index.is_none() {
                        point.linear_index = as_finite(other);
                    }
                }
                None => {}
            }
        }
        point.x = pick_number(value, &["x", "lon"]);
        point.y = pick_number(value, &["y", "lat"]);
        point
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridIndex {
    pub row: Option<usize>,
    pub column: Option<usize>,
}

impl GridIndex {
    pub fn resolved(&self) -> Option<(usize, usize)> {
        Some((self.row?, self.column?))
    }
}

/// Resolve `point` to a row/column of a `row_count x column_count` grid.
///
/// Order: an explicit index pair (either orientation), then a linear index
/// when nothing was resolved from a pair, then nearest-axis matching for
/// whichever half is still missing.
pub fn infer_grid_indices(
    point: &HoverPoint,
    row_count: usize,
    column_count: usize,
    axis_x: &[f64],
    axis_y: &[f64],
    x_candidate: Option<f64>,
    y_candidate: Option<f64>,
) -> GridIndex {
    let mut index = GridIndex::default();

    for &[a, b] in &point.index_pairs {
        let direct = (valid_index(a, row_count), valid_index(b, column_count));
        let swapped = (valid_index(b, row_count), valid_index(a, column_count));
        let (row, column) = match (direct, swapped) {
            ((Some(r), Some(c)), _) => (Some(r), Some(c)),
            (_, (Some(r), Some(c))) => (Some(r), Some(c)),
            ((r, c), _) if r.is_some() || c.is_some() => (r, c),
            (_, partial) => partial,
        };
        index.row = index.row.or(row);
        index.column = index.column.or(column);
        if index.resolved().is_some() {
            return index;
        }
    }

    if index.row.is_none() && index.column.is_none() && column_count > 0 {
        if let Some(linear) = point.linear_index.and_then(|v| valid_index(v, row_count * column_count)) {
            return GridIndex {
                row: Some(linear / column_count),
                column: Some(linear % column_count),
            };
        }
    }

    if index.row.is_none() {
        index.row = find_closest_axis_index(y_candidate, axis_y).filter(|&r| r < row_count);
    }
    if index.column.is_none() {
        index.column = find_closest_axis_index(x_candidate, axis_x).filter(|&c| c < column_count);
    }
    index
}

/// Index of the finite axis entry nearest to `value`; ties keep the lowest
/// index.
pub fn find_closest_axis_index(value: Option<f64>, axis: &[f64]) -> Option<usize> {
    let value = value.filter(|v| v.is_finite())?;
    let mut best: Option<(usize, f64)> = None;
    for (i, &position) in axis.iter().enumerate() {
        if !position.is_finite() {
            continue;
        }
        let distance = (position - value).abs();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

pub fn get_matrix_value(matrix: &Matrix, row: Option<usize>, column: Option<usize>) -> Option<f64> {
    matrix
        .get(row?)?
        .get(column?)
        .copied()
        .flatten()
        .filter(|v| v.is_finite())
}

fn valid_index(value: f64, count: usize) -> Option<usize> {
    let integral = value.is_finite() && value.fract() == 0.0 && value >= 0.0;
    (integral && (value as usize) < count).then_some(value as usize)
}

/// Everything a hover tooltip shows for one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverReadout {
    pub row: usize,
    pub column: usize,
    pub x: f64,
    pub y: f64,
    pub elevation: Option<f64>,
    pub depth: Option<f64>,
}

pub fn resolve_hover(grid: &VisualizationGrid, point: &HoverPoint) -> Option<HoverReadout> {
    let index = infer_grid_indices(
        point,
        grid.rows(),
        grid.columns(),
        &grid.x,
        &grid.y,
        point.x,
        point.y,
    );
    let (row, column) = index.resolved()?;
    Some(HoverReadout {
        row,
        column,
        x: *grid.x.get(column)?,
        y: *grid.y.get(row)?,
        elevation: get_matrix_value(&grid.elevation, Some(row), Some(column)),
        depth: grid
            .depth
            .as_ref()
            .and_then(|d| get_matrix_value(d, Some(row), Some(column))),
    })
}
