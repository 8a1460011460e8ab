//! Coordinate axes for dense elevation/depth grids.
//!
//! Backends ship axes in every state of completeness: full, partially
//! null, absent with an extent, absent with only a resolution. The
//! reconstruction below always yields `count` finite values.

use crate::fields::as_finite;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What is known about one axis besides its explicit values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisExtent {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub resolution: Option<f64>,
}

impl AxisExtent {
    pub fn new(min: Option<f64>, max: Option<f64>, resolution: Option<f64>) -> Self {
        Self {
            min: min.filter(|v| v.is_finite()),
            max: max.filter(|v| v.is_finite()),
            resolution: resolution.filter(|v| v.is_finite()),
        }
    }

    fn step(&self) -> Option<f64> {
        self.resolution.map(f64::abs).filter(|r| r.is_finite() && *r > 0.0)
    }
}

/// Read an axis from JSON, keeping nulls and garbage as `None` so that the
/// positions still line up with matrix columns.
pub fn axis_values_from_json(value: &Value) -> Option<Vec<Option<f64>>> {
    value
        .as_array()
        .map(|items| items.iter().map(as_finite).collect())
}

/// Derive `count` ordered axis positions.
///
/// Priority: complete `provided` values, then an arithmetic sequence from the
/// resolution anchored at `min` (or ending at `max`), then linear
/// interpolation between `min` and `max`, then gap-filling a partially known
/// `provided`, and finally the index sequence `0..count`.
pub fn compute_axis_positions(
    provided: Option<&[Option<f64>]>,
    count: usize,
    extent: &AxisExtent,
) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }

    let provided = provided.filter(|p| p.len() == count);

    if let Some(values) = provided {
        if let Some(complete) = values
            .iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect::<Option<Vec<f64>>>()
        {
            return complete;
        }
    }

    if let Some(step) = extent.step() {
        if let Some(min) = extent.min {
            return (0..count).map(|i| min + step * i as f64).collect();
        }
        if let Some(max) = extent.max {
            let start = max - step * (count - 1) as f64;
            return (0..count).map(|i| start + step * i as f64).collect();
        }
    }

    if let (Some(min), Some(max)) = (extent.min, extent.max) {
        if count == 1 {
            return vec![min];
        }
        let step = (max - min) / (count - 1) as f64;
        return (0..count)
            .map(|i| if i == count - 1 { max } else { min + step * i as f64 })
            .collect();
    }

    if let Some(filled) = provided.and_then(gap_fill) {
        return filled;
    }

    (0..count).map(|i| i as f64).collect()
}

/// Interpolate interior gaps linearly, flat-fill the leading gap with the
/// first known value and the trailing gap with the last one.
fn gap_fill(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();

    let &(first_idx, first_val) = known.first()?;
    let &(last_idx, last_val) = known.last()?;

    let mut out = vec![f64::NAN; values.len()];
    for slot in out.iter_mut().take(first_idx) {
        *slot = first_val;
    }
    for pair in known.windows(2) {
        let (a, va) = pair[0];
        let (b, vb) = pair[1];
        out[a] = va;
        let span = (b - a) as f64;
        for (i, slot) in out.iter_mut().enumerate().take(b).skip(a + 1) {
            *slot = va + (vb - va) * (i - a) as f64 / span;
        }
    }
    for slot in out.iter_mut().skip(last_idx) {
        *slot = last_val;
    }

    out.iter().all(|v| v.is_finite()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_complete_axis_is_returned_unchanged() {
        let provided = some(&[3.0, 1.0, 7.5]);
        let out = compute_axis_positions(Some(provided.as_slice()), 3, &AxisExtent::new(Some(0.0), Some(1.0), Some(0.5)));
        assert_eq!(out, vec![3.0, 1.0, 7.5]);
    }

    #[test]
    fn test_resolution_from_min() {
        let out = compute_axis_positions(None, 4, &AxisExtent::new(Some(100.0), None, Some(-2.5)));
        assert_eq!(out, vec![100.0, 102.5, 105.0, 107.5]);
    }

    #[test]
    fn test_resolution_backward_from_max() {
        let out = compute_axis_positions(None, 3, &AxisExtent::new(None, Some(10.0), Some(2.0)));
        assert_eq!(out, vec![6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_interpolates_between_extents() {
        let out = compute_axis_positions(None, 5, &AxisExtent::new(Some(0.0), Some(1.0), None));
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let single = compute_axis_positions(None, 1, &AxisExtent::new(Some(4.0), Some(9.0), None));
        assert_eq!(single, vec![4.0]);
    }

    #[test]
    fn test_gap_fill_interior_and_edges() {
        let provided = vec![None, Some(2.0), None, None, Some(8.0), None];
        let out = compute_axis_positions(Some(provided.as_slice()), 6, &AxisExtent::default());
        assert_eq!(out, vec![2.0, 2.0, 4.0, 6.0, 8.0, 8.0]);
    }

    #[test]
    fn test_extent_outranks_gap_fill() {
        let provided = vec![Some(5.0), None, Some(7.0)];
        let out = compute_axis_positions(Some(provided.as_slice()), 3, &AxisExtent::new(Some(0.0), Some(2.0), None));
        assert_eq!(out, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_index_fallback() {
        let all_missing = vec![None, None, None];
        assert_eq!(compute_axis_positions(Some(all_missing.as_slice()), 3, &AxisExtent::default()), vec![0.0, 1.0, 2.0]);
        let wrong_len = some(&[1.0, 2.0]);
        assert_eq!(compute_axis_positions(Some(wrong_len.as_slice()), 3, &AxisExtent::new(Some(1.0), None, None)), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert!(compute_axis_positions(None, 0, &AxisExtent::new(Some(0.0), Some(1.0), Some(1.0))).is_empty());
    }

    #[test]
    fn test_zero_resolution_is_ignored() {
        let out = compute_axis_positions(None, 3, &AxisExtent::new(Some(0.0), Some(4.0), Some(0.0)));
        assert_eq!(out, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_axis_values_from_json_keeps_positions() {
        let v = serde_json::json!([1.0, null, "3", "x"]);
        assert_eq!(axis_values_from_json(&v), Some(vec![Some(1.0), None, Some(3.0), None]));
    }
}
