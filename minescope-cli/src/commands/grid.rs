//! Grid command - inspect a block's elevation grid and resolve hover points

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::{cell, load_snapshot, print_json, OutputFormat};
use crate::config::Config;
use crate::error::{CliError, CliResult};
use minescope_core::grid::VisualizationGrid;
use minescope_core::{resolve_hover, HoverPoint, HoverReadout};

#[derive(Debug, Serialize)]
pub struct GridReport {
    pub block: String,
    pub rows: usize,
    pub columns: usize,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub elevation_range: Option<(f64, f64)>,
    pub depth_range: Option<(f64, f64)>,
    pub rim_elevation: Option<f64>,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<HoverReadout>,
}

pub fn execute(
    config: &Config,
    snapshot: PathBuf,
    block: String,
    at: Option<String>,
    index: Option<String>,
    format: Option<OutputFormat>,
) -> Result<()> {
    let snapshot = load_snapshot(&snapshot)?;
    let metric = snapshot
        .find_block(&block)
        .ok_or_else(|| CliError::block_not_found(block.as_str()))?;
    let grid = metric
        .visualization
        .as_ref()
        .ok_or_else(|| CliError::validation(format!("Block {} has no elevation grid", block)))?;

    let point = hover_point(at.as_deref(), index.as_deref())?;
    let hover = match &point {
        Some(p) => {
            let readout = resolve_hover(grid, p);
            if readout.is_none() {
                log::warn!("Point does not resolve to a cell of a {}x{} grid", grid.rows(), grid.columns());
            }
            readout
        }
        None => None,
    };

    let report = build_report(metric.display_label(), grid, hover);
    match OutputFormat::resolve(format, &config.display.format) {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print!("{}", render(&report)),
    }
    Ok(())
}

pub fn build_report(block: String, grid: &VisualizationGrid, hover: Option<HoverReadout>) -> GridReport {
    GridReport {
        block,
        rows: grid.rows(),
        columns: grid.columns(),
        x_range: axis_range(&grid.x),
        y_range: axis_range(&grid.y),
        elevation_range: grid.elevation_range(),
        depth_range: grid.depth_range(),
        rim_elevation: grid.rim_elevation,
        unit: grid.unit.clone(),
        hover,
    }
}

/// `--at x,y` resolves by coordinates, `--index r,c` by cell.
pub fn hover_point(at: Option<&str>, index: Option<&str>) -> CliResult<Option<HoverPoint>> {
    match (at, index) {
        (Some(_), Some(_)) => Err(CliError::validation("Use either --at or --index, not both")),
        (Some(at), None) => {
            let (x, y) = parse_pair(at)?;
            Ok(Some(HoverPoint::at(x, y)))
        }
        (None, Some(index)) => {
            let (row, column) = parse_pair(index)?;
            if row < 0.0 || column < 0.0 || row.fract() != 0.0 || column.fract() != 0.0 {
                return Err(CliError::validation(format!("Grid index must be two non-negative integers: {}", index)));
            }
            Ok(Some(HoverPoint::with_indices(row as usize, column as usize)))
        }
        (None, None) => Ok(None),
    }
}

fn parse_pair(text: &str) -> CliResult<(f64, f64)> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let parsed: Option<Vec<f64>> = parts.iter().map(|p| p.parse::<f64>().ok().filter(|v| v.is_finite())).collect();
    match parsed.as_deref() {
        Some([a, b]) => Ok((*a, *b)),
        _ => Err(CliError::validation(format!("Expected two comma-separated numbers, got '{}'", text))),
    }
}

fn axis_range(axis: &[f64]) -> Option<(f64, f64)> {
    Some((*axis.first()?, *axis.last()?))
}

fn range_cell(range: Option<(f64, f64)>) -> String {
    range.map_or_else(|| "-".to_string(), |(lo, hi)| format!("{:.3} .. {:.3}", lo, hi))
}

pub fn render(report: &GridReport) -> String {
    let mut out = format!(
        "Block:      {}\nGrid:       {} rows x {} columns\nX axis:     {}\nY axis:     {}\nElevation:  {} {}\nDepth:      {} {}\nRim:        {}\n",
        report.block,
        report.rows,
        report.columns,
        range_cell(report.x_range),
        range_cell(report.y_range),
        range_cell(report.elevation_range),
        report.unit,
        range_cell(report.depth_range),
        report.unit,
        cell(report.rim_elevation, 2),
    );
    if let Some(h) = &report.hover {
        out.push_str(&format!(
            "\nCell [{}, {}] at ({:.6}, {:.6})\n  elevation: {}\n  depth:     {}\n",
            h.row,
            h.column,
            h.x,
            h.y,
            cell(h.elevation, 2),
            cell(h.depth, 2)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grid() -> VisualizationGrid {
        VisualizationGrid::from_json(&json!({
            "elevation": [[10, 11, 12], [13, 14, 15]],
            "depth": [[0, 1, 2], [3, 4, 5]],
            "x_min": 100.0,
            "resolution": 0.5,
            "y": [0, 1]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("1.5, -2").unwrap(), (1.5, -2.0));
        assert!(parse_pair("1,2,3").is_err());
        assert!(parse_pair("a,b").is_err());
    }

    #[test]
    fn test_hover_point_modes() {
        assert!(hover_point(None, None).unwrap().is_none());
        assert!(hover_point(Some("1,2"), Some("0,0")).is_err());
        assert!(hover_point(None, Some("1.5,0")).is_err());
        let p = hover_point(None, Some("1,2")).unwrap().unwrap();
        assert_eq!(p.index_pairs, vec![[1.0, 2.0]]);
    }

    #[test]
    fn test_report_with_hover() {
        let g = grid();
        let hover = resolve_hover(&g, &HoverPoint::at(100.6, 0.9));
        let report = build_report("Pit".into(), &g, hover);
        assert_eq!((report.rows, report.columns), (2, 3));
        assert_eq!(report.x_range, Some((100.0, 101.0)));
        assert_eq!(report.elevation_range, Some((10.0, 15.0)));
        let h = report.hover.as_ref().unwrap();
        assert_eq!((h.row, h.column), (1, 1));
        assert_eq!(h.depth, Some(4.0));
        assert!(render(&report).contains("Cell [1, 1]"));
    }
}
