//! Command implementations for the MineScope CLI

pub mod rows;
pub mod summary;
pub mod grid;
pub mod quant;
pub mod config;

use crate::error::{CliError, CliResult};
use clap::ValueEnum;
use minescope_core::{AnalysisResult, QuantitativeSnapshot};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    /// Explicit flag, else the configured default.
    pub fn resolve(flag: Option<OutputFormat>, configured: &str) -> Self {
        flag.unwrap_or_else(|| match configured.to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        })
    }
}

pub fn read_json(path: &Path) -> CliResult<Value> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CliError::parse(path.display().to_string(), e.to_string()))
}

pub fn load_results(path: &Path) -> CliResult<AnalysisResult> {
    let value = read_json(path)?;
    let result = AnalysisResult::from_json(&value);
    log::info!(
        "Loaded {} tiles ({} tile blocks, {} merged blocks) from {}",
        result.tiles.len(),
        result.tile_block_count(),
        result.merged_blocks.as_ref().map_or(0, Vec::len),
        path.display()
    );
    Ok(result)
}

pub fn load_snapshot(path: &Path) -> CliResult<QuantitativeSnapshot> {
    let snapshot = QuantitativeSnapshot::from_stored(&read_json(path)?);
    log::info!("Loaded snapshot with {} blocks from {}", snapshot.blocks.len(), path.display());
    Ok(snapshot)
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Fixed-precision cell, `-` when absent.
pub(crate) fn cell(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.*}", precision, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_output_format_resolution() {
        assert_eq!(OutputFormat::resolve(None, "JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::resolve(None, "whatever"), OutputFormat::Table);
        assert_eq!(OutputFormat::resolve(Some(OutputFormat::Table), "json"), OutputFormat::Table);
    }

    #[test]
    fn test_read_json_errors() {
        let missing = read_json(Path::new("/definitely/not/here.json"));
        assert!(matches!(missing, Err(CliError::FileNotFound { .. })));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(read_json(file.path()), Err(CliError::Parse { .. })));
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(cell(Some(1.23456), 2), "1.23");
        assert_eq!(cell(None, 2), "-");
    }
}
