//! Summary command - detection statistics and quantitative totals

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::{cell, load_results, load_snapshot, print_json, OutputFormat};
use crate::config::Config;
use minescope_core::snapshot::{ExecutiveSummary, SnapshotSummary};
use minescope_core::{reconcile_blocks, SummaryStats};

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub analysis_id: Option<String>,
    pub detection: SummaryStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantitative: Option<SnapshotSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<ExecutiveSummary>,
    pub fresh: Option<bool>,
}

pub fn execute(
    config: &Config,
    results: PathBuf,
    snapshot: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> Result<()> {
    let result = load_results(&results)?;
    let snapshot = snapshot.as_deref().map(load_snapshot).transpose()?;
    let rows = reconcile_blocks(&result, snapshot.as_ref());

    let report = SummaryReport {
        analysis_id: result.analysis_id.clone(),
        detection: result.summary().with_rows(&rows),
        fresh: snapshot.as_ref().map(|s| s.is_fresh()),
        quantitative: snapshot.as_ref().map(|s| s.summary.clone()),
        executive_summary: snapshot.and_then(|s| s.executive_summary),
    };

    match OutputFormat::resolve(format, &config.display.format) {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print!("{}", render(&report)),
    }
    Ok(())
}

pub fn render(report: &SummaryReport) -> String {
    let d = &report.detection;
    let mut lines = vec![
        format!("Analysis:            {}", report.analysis_id.as_deref().unwrap_or("-")),
        format!("Tiles:               {}", d.tile_count),
        format!("Blocks:              {}", d.block_count.map_or_else(|| "-".to_string(), |n| n.to_string())),
        format!("Total area (m2):     {}", cell(d.total_area_m2, 0)),
        format!("Mining area (m2):    {}", cell(d.mining_area_m2, 0)),
        format!("Mining coverage (%): {}", cell(d.mining_percentage, 2)),
        format!("Avg confidence (%):  {}", cell(d.average_confidence, 1)),
    ];

    if let Some(q) = &report.quantitative {
        lines.push(String::new());
        lines.push(format!(
            "Quantitative ({})",
            if report.fresh == Some(true) { "complete" } else { "incomplete" }
        ));
        lines.push(format!("  Blocks measured:   {}", q.block_count));
        lines.push(format!("  Total volume (m3): {}", cell(q.total_volume_cubic_meters, 0)));
        lines.push(format!("  Total area (ha):   {}", cell(q.total_area_hectares, 2)));
        lines.push(format!("  Avg max depth (m): {}", cell(q.average_max_depth, 2)));
        lines.push(format!("  Max depth (m):     {}", cell(q.max_depth, 2)));
        if let Some(deepest) = &q.deepest_block {
            lines.push(format!("  Deepest block:     {} ({:.2} m)", deepest.label, deepest.value));
        }
        if let Some(largest) = &q.largest_block {
            lines.push(format!("  Largest block:     {} ({:.2} ha)", largest.label, largest.value));
        }
    }

    if let Some(exec) = &report.executive_summary {
        lines.push(String::new());
        if let Some(headline) = &exec.headline {
            lines.push(headline.clone());
        }
        if let Some(text) = &exec.text {
            lines.push(text.clone());
        }
        lines.extend(exec.highlights.iter().map(|h| format!("  • {}", h)));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use minescope_core::{AnalysisResult, QuantitativeSnapshot};
    use serde_json::json;

    #[test]
    fn test_render_detection_only() {
        let result = AnalysisResult::from_json(&json!({
            "analysis_id": "a1",
            "tiles": [{}],
            "summary": { "total_area_m2": 1000, "mining_area_m2": 250 }
        }));
        let report = SummaryReport {
            analysis_id: result.analysis_id.clone(),
            detection: result.summary(),
            quantitative: None,
            executive_summary: None,
            fresh: None,
        };
        let text = render(&report);
        assert!(text.contains("Analysis:            a1"));
        assert!(text.contains("Mining coverage (%): 25.00"));
        assert!(!text.contains("Quantitative"));
    }

    #[test]
    fn test_render_with_snapshot() {
        let snapshot = QuantitativeSnapshot::from_response(&json!({
            "executiveSummary": { "headline": "One pit", "highlights": ["deep"] },
            "blocks": [{ "label": "Pit A", "max_depth": 12.5, "volume_m3": 800, "area_ha": 2.0 }]
        }));
        let report = SummaryReport {
            analysis_id: None,
            detection: SummaryStats::default(),
            fresh: Some(snapshot.is_fresh()),
            quantitative: Some(snapshot.summary.clone()),
            executive_summary: snapshot.executive_summary.clone(),
        };
        let text = render(&report);
        assert!(text.contains("Quantitative (incomplete)"));
        assert!(text.contains("Deepest block:     Pit A (12.50 m)"));
        assert!(text.contains("One pit"));
        assert!(text.contains("• deep"));
    }
}
