//! Rows command - reconciled block table for one analysis

use anyhow::Result;
use std::path::PathBuf;

use super::{cell, load_results, load_snapshot, print_json, OutputFormat};
use crate::config::Config;
use minescope_core::{reconcile_blocks, MineBlockRow};

pub fn execute(
    config: &Config,
    results: PathBuf,
    snapshot: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> Result<()> {
    let result = load_results(&results)?;
    let snapshot = snapshot.as_deref().map(load_snapshot).transpose()?;

    let rows = reconcile_blocks(&result, snapshot.as_ref());
    log::info!("Reconciled {} block rows", rows.len());

    match OutputFormat::resolve(format, &config.display.format) {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => print!("{}", render_table(&rows, config.display.max_rows)),
    }
    Ok(())
}

pub fn render_table(rows: &[MineBlockRow], max_rows: usize) -> String {
    let mut out = format!(
        "{:<24} {:<20} {:<7} {:<10} {:>10} {:>7} {:>10} {:>14}\n",
        "ID", "LABEL", "SOURCE", "TILE", "AREA (ha)", "CONF %", "MAX DEPTH", "VOLUME (m3)"
    );
    let shown = if max_rows == 0 { rows.len() } else { rows.len().min(max_rows) };
    for row in &rows[..shown] {
        let volumetrics = row.volumetrics.as_ref();
        out.push_str(&format!(
            "{:<24} {:<20} {:<7} {:<10} {:>10.2} {:>7} {:>10} {:>14}\n",
            truncate(&row.id, 24),
            truncate(&row.label, 20),
            row.source.id_prefix(),
            truncate(row.tile_id.as_deref().unwrap_or("-"), 10),
            row.area_hectares,
            cell(row.confidence, 1),
            cell(volumetrics.and_then(|v| v.max_depth), 2),
            cell(volumetrics.and_then(|v| v.volume_cubic_meters), 0),
        ));
    }
    if shown < rows.len() {
        out.push_str(&format!("... {} more rows (use --format json for all)\n", rows.len() - shown));
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
