//! Detection baseline: tiles, per-tile block features, the optional merged
//! block collection, and summary statistics.

use crate::blocks::MineBlockRow;
use crate::fields::{lookup, pick, pick_number, pick_percentage, pick_string};
use crate::geometry::{normalize_bounds_tuple, BoundingBox};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TILE_KEYS: &[&str] = &["tiles", "tile_results", "tileResults", "results.tiles"];
const TILE_BLOCK_KEYS: &[&str] = &[
    "mine_blocks",
    "mineBlocks",
    "mine_block_geojson",
    "mineBlockGeojson",
    "blocks",
    "features",
];
const MERGED_BLOCK_KEYS: &[&str] = &[
    "merged_blocks",
    "mergedBlocks",
    "merged_block_geojson",
    "mergedBlockGeojson",
    "results.merged_blocks",
];

/// Summary field synonyms are probed at the root first, then inside
/// `summary` and `statistics`.
const SUMMARY_SCOPES: &[&str] = &["", "summary.", "statistics.", "stats."];

const TOTAL_AREA_KEYS: &[&str] = &[
    "total_tile_area_m2",
    "totalTileAreaM2",
    "total_area_m2",
    "totalAreaM2",
    "processedAreaM2",
    "processed_area_m2",
];
const MINING_AREA_KEYS: &[&str] = &[
    "mining_area_m2",
    "miningAreaM2",
    "total_mining_area_m2",
    "totalMiningAreaM2",
    "mine_area_m2",
];
const MINING_PERCENT_KEYS: &[&str] = &[
    "mining_percentage",
    "miningPercentage",
    "mining_percent",
    "miningPercent",
    "coverage_percentage",
    "coveragePercentage",
];
const BLOCK_COUNT_KEYS: &[&str] = &["total_blocks", "totalBlocks", "block_count", "blockCount", "num_blocks"];
const CONFIDENCE_KEYS: &[&str] = &[
    "average_confidence",
    "averageConfidence",
    "mean_confidence",
    "meanConfidence",
    "avg_confidence",
];

/// A block feature as delivered: geometry plus a free-form properties bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBlockFeature {
    pub geometry: Value,
    pub properties: Value,
}

impl RawBlockFeature {
    /// Accept a GeoJSON Feature or a flat record that carries its own
    /// `geometry`/`coordinates` next to the properties.
    pub fn from_json(value: &Value) -> Self {
        let geometry = value
            .get("geometry")
            .or_else(|| value.get("coordinates"))
            .cloned()
            .unwrap_or(Value::Null);
        let properties = match value.get("properties") {
            Some(props @ Value::Object(_)) => props.clone(),
            _ => match value {
                Value::Object(map) => {
                    let flat: Map<String, Value> = map
                        .iter()
                        .filter(|(k, _)| !matches!(k.as_str(), "geometry" | "coordinates" | "type"))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    Value::Object(flat)
                }
                _ => Value::Object(Map::new()),
            },
        };
        Self { geometry, properties }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTile {
    pub id: String,
    pub index: usize,
    pub bounds: Option<BoundingBox>,
    pub blocks: Vec<RawBlockFeature>,
    /// Original record, for imagery and any field not modelled here.
    pub raw: Value,
}

impl AnalysisTile {
    pub fn from_json(value: &Value, index: usize) -> Self {
        let blocks = pick(value, TILE_BLOCK_KEYS)
            .map(features_of)
            .unwrap_or_default();
        Self {
            id: pick_string(value, &["tile_id", "tileId", "id", "name"]).unwrap_or_else(|| format!("tile_{}", index)),
            index,
            bounds: pick(value, &["bounds", "bbox", "tile_bounds", "tileBounds"]).and_then(normalize_bounds_tuple),
            blocks,
            raw: value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub analysis_id: Option<String>,
    pub tiles: Vec<AnalysisTile>,
    pub merged_blocks: Option<Vec<RawBlockFeature>>,
    pub raw: Value,
}

impl AnalysisResult {
    pub fn from_json(value: &Value) -> Self {
        let tiles = pick(value, TILE_KEYS)
            .and_then(Value::as_array)
            .map(|items| items.iter().enumerate().map(|(i, t)| AnalysisTile::from_json(t, i)).collect())
            .unwrap_or_default();
        Self {
            analysis_id: pick_string(value, &["analysis_id", "analysisId", "id"]),
            tiles,
            merged_blocks: pick(value, MERGED_BLOCK_KEYS).map(features_of),
            raw: value.clone(),
        }
    }

    pub fn tile(&self, id: &str) -> Option<&AnalysisTile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    pub fn tile_block_count(&self) -> usize {
        self.tiles.iter().map(|t| t.blocks.len()).sum()
    }

    pub fn summary(&self) -> SummaryStats {
        SummaryStats::from_result(self)
    }
}

/// A FeatureCollection, a bare feature array, or a single feature.
fn features_of(value: &Value) -> Vec<RawBlockFeature> {
    let items: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => match lookup(value, "features").and_then(Value::as_array) {
            Some(items) => items.as_slice(),
            None if value.get("geometry").is_some() => std::slice::from_ref(value),
            None => &[],
        },
        _ => &[],
    };
    items.iter().map(RawBlockFeature::from_json).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_area_m2: Option<f64>,
    pub mining_area_m2: Option<f64>,
    /// 0–100.
    pub mining_percentage: Option<f64>,
    pub block_count: Option<usize>,
    pub tile_count: usize,
    /// 0–100.
    pub average_confidence: Option<f64>,
}

impl SummaryStats {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let raw = &result.raw;
        let total_area_m2 = probe(raw, TOTAL_AREA_KEYS);
        let mining_area_m2 = probe(raw, MINING_AREA_KEYS);
        let mining_percentage = probe_with(raw, MINING_PERCENT_KEYS, pick_percentage)
            .or_else(|| match (mining_area_m2, total_area_m2) {
                (Some(mining), Some(total)) if total > 0.0 => Some((mining / total * 100.0).clamp(0.0, 100.0)),
                _ => None,
            });
        Self {
            total_area_m2,
            mining_area_m2,
            mining_percentage,
            block_count: probe(raw, BLOCK_COUNT_KEYS).filter(|n| *n >= 0.0).map(|n| n as usize),
            tile_count: result.tiles.len(),
            average_confidence: probe_with(raw, CONFIDENCE_KEYS, pick_percentage),
        }
    }

    /// Fill fields the backend left out from reconciled rows.
    pub fn with_rows(mut self, rows: &[MineBlockRow]) -> Self {
        if self.block_count.is_none() {
            self.block_count = Some(rows.len());
        }
        if self.mining_area_m2.is_none() && !rows.is_empty() {
            self.mining_area_m2 = Some(rows.iter().map(|r| r.area_hectares * 10_000.0).sum());
        }
        if self.average_confidence.is_none() {
            let scores: Vec<f64> = rows.iter().filter_map(|r| r.confidence).collect();
            if !scores.is_empty() {
                self.average_confidence = Some(scores.iter().sum::<f64>() / scores.len() as f64);
            }
        }
        if self.mining_percentage.is_none() {
            if let (Some(mining), Some(total)) = (self.mining_area_m2, self.total_area_m2) {
                if total > 0.0 {
                    self.mining_percentage = Some((mining / total * 100.0).clamp(0.0, 100.0));
                }
            }
        }
        self
    }
}

fn probe(raw: &Value, keys: &[&str]) -> Option<f64> {
    probe_with(raw, keys, pick_number)
}

/// Try `keys` at the root, then inside each nested summary object.
fn probe_with(raw: &Value, keys: &[&str], picker: fn(&Value, &[&str]) -> Option<f64>) -> Option<f64> {
    let candidates: Vec<String> = SUMMARY_SCOPES
        .iter()
        .flat_map(|scope| keys.iter().map(move |k| format!("{}{}", scope, k)))
        .collect();
    let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
    picker(raw, &refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tiles_and_merged_collections() {
        let v = json!({
            "analysis_id": "a-1",
            "tiles": [
                { "tile_id": "t0", "bounds": [0, 0, 1, 1], "mine_blocks": { "type": "FeatureCollection", "features": [
                    { "type": "Feature", "geometry": null, "properties": { "block_id": "b1" } }
                ] } },
                { "blocks": [ { "block_id": "b2", "area_m2": 50 } ] }
            ],
            "merged_blocks": { "features": [ { "geometry": { "type": "Polygon", "coordinates": [] }, "properties": {} } ] }
        });
        let result = AnalysisResult::from_json(&v);
        assert_eq!(result.analysis_id.as_deref(), Some("a-1"));
        assert_eq!(result.tiles.len(), 2);
        assert_eq!(result.tiles[1].id, "tile_1");
        assert_eq!(result.tile_block_count(), 2);
        assert_eq!(result.tiles[1].blocks[0].properties["area_m2"], json!(50));
        assert_eq!(result.merged_blocks.as_ref().map(Vec::len), Some(1));
        assert!(result.tile("t0").is_some());
    }

    #[test]
    fn test_missing_merged_is_none() {
        let result = AnalysisResult::from_json(&json!({ "tiles": [] }));
        assert!(result.merged_blocks.is_none());
        assert!(result.tiles.is_empty());
    }

    #[test]
    fn test_summary_synonyms_and_scopes() {
        let v = json!({
            "tiles": [{}, {}],
            "summary": { "totalAreaM2": 200000.0, "mining_area_m2": 5000.0, "blockCount": 3 },
            "statistics": { "mean_confidence": 0.72 }
        });
        let stats = AnalysisResult::from_json(&v).summary();
        assert_eq!(stats.total_area_m2, Some(200000.0));
        assert_eq!(stats.mining_area_m2, Some(5000.0));
        assert_eq!(stats.mining_percentage, Some(2.5));
        assert_eq!(stats.block_count, Some(3));
        assert_eq!(stats.tile_count, 2);
        assert_eq!(stats.average_confidence, Some(72.0));
    }

    #[test]
    fn test_nested_fraction_is_read_as_percent() {
        let v = json!({ "tiles": [], "statistics": { "mining_percentage": 0.25, "mean_confidence": 64 } });
        let stats = AnalysisResult::from_json(&v).summary();
        assert_eq!(stats.mining_percentage, Some(25.0));
        assert_eq!(stats.average_confidence, Some(64.0));
    }

    #[test]
    fn test_root_spelling_beats_nested() {
        let v = json!({ "total_tile_area_m2": 10.0, "summary": { "total_tile_area_m2": 99.0 }, "mining_percentage": 140 });
        let stats = AnalysisResult::from_json(&v).summary();
        assert_eq!(stats.total_area_m2, Some(10.0));
        assert_eq!(stats.mining_percentage, Some(100.0));
    }
}
