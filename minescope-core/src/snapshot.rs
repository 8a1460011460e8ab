//! Normalized quantitative (DEM/volume) snapshot for one analysis.

use crate::fields::{as_key_string, lookup, pick, pick_array, pick_number, pick_string};
use crate::geometry::{normalize_bounds_tuple, BoundingBox};
use crate::metrics::{MetricsIndex, QuantitativeBlockMetric};
use crate::types::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

static NO_SUMMARY: Value = Value::Null;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemDescriptor {
    pub crs: Option<String>,
    pub resolution: Option<f64>,
    pub tile_count: Option<usize>,
    pub bounds: Option<BoundingBox>,
    pub source: Option<String>,
}

impl DemDescriptor {
    fn from_json(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Some(Self {
            crs: pick_string(value, &["crs", "epsg", "srs"]),
            resolution: pick_number(value, &["resolution", "resolution_m", "resolutionM", "pixel_size"]),
            tile_count: pick_number(value, &["tile_count", "tileCount", "tiles"]).map(|n| n.max(0.0) as usize),
            bounds: pick(value, &["bounds", "bbox", "extent"]).and_then(normalize_bounds_tuple),
            source: pick_string(value, &["source", "provider", "dataset"]),
        })
    }
}

/// A block singled out in the summary (deepest, largest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHighlight {
    pub label: String,
    pub persistent_id: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub block_count: usize,
    pub total_volume_cubic_meters: Option<f64>,
    pub total_area_hectares: Option<f64>,
    pub average_max_depth: Option<f64>,
    pub average_mean_depth: Option<f64>,
    pub max_depth: Option<f64>,
    pub deepest_block: Option<BlockHighlight>,
    pub largest_block: Option<BlockHighlight>,
}

impl SnapshotSummary {
    /// Backend-supplied totals where present, otherwise derived from blocks.
    fn from_json(value: &Value, blocks: &[QuantitativeBlockMetric]) -> Self {
        let summary = pick(value, &["summary"]).unwrap_or(&NO_SUMMARY);
        let derived = Self::derive(blocks);
        Self {
            block_count: pick_number(value, &["blockCount", "block_count"])
                .or_else(|| pick_number(summary, &["block_count", "blockCount", "total_blocks"]))
                .map(|n| n.max(0.0) as usize)
                .unwrap_or(derived.block_count),
            total_volume_cubic_meters: pick_number(
                summary,
                &["total_volume_m3", "totalVolumeCubicMeters", "total_volume_cubic_meters", "totalVolume"],
            )
            .or(derived.total_volume_cubic_meters),
            total_area_hectares: pick_number(summary, &["total_area_ha", "totalAreaHectares", "total_area_hectares"])
                .or_else(|| pick_number(summary, &["total_area_m2", "totalAreaSquareMeters"]).map(|m2| m2 / 10_000.0))
                .or(derived.total_area_hectares),
            average_max_depth: pick_number(summary, &["average_max_depth", "averageMaxDepth", "avg_max_depth"])
                .or(derived.average_max_depth),
            average_mean_depth: pick_number(summary, &["average_mean_depth", "averageMeanDepth", "average_depth", "averageDepth"])
                .or(derived.average_mean_depth),
            max_depth: pick_number(summary, &["max_depth", "maxDepth", "deepest_depth"]).or(derived.max_depth),
            deepest_block: highlight_from_json(summary, &["deepest_block", "deepestBlock"], &["max_depth", "maxDepth", "depth", "value"])
                .or(derived.deepest_block),
            largest_block: highlight_from_json(
                summary,
                &["largest_block", "largestBlock"],
                &["area_ha", "areaHectares", "area_hectares", "value"],
            )
            .or(derived.largest_block),
        }
    }

    pub fn derive(blocks: &[QuantitativeBlockMetric]) -> Self {
        let sum = |f: fn(&QuantitativeBlockMetric) -> Option<f64>| -> Option<f64> {
            let values: Vec<f64> = blocks.iter().filter_map(f).collect();
            (!values.is_empty()).then(|| values.iter().sum())
        };
        let mean = |f: fn(&QuantitativeBlockMetric) -> Option<f64>| -> Option<f64> {
            let values: Vec<f64> = blocks.iter().filter_map(f).collect();
            (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
        };
        let extreme = |f: fn(&QuantitativeBlockMetric) -> Option<f64>| -> Option<BlockHighlight> {
            blocks
                .iter()
                .filter_map(|b| f(b).map(|v| (b, v)))
                .fold(None::<(&QuantitativeBlockMetric, f64)>, |best, (b, v)| match best {
                    Some((_, bv)) if bv >= v => best,
                    _ => Some((b, v)),
                })
                .map(|(b, v)| BlockHighlight {
                    label: b.display_label(),
                    persistent_id: b.persistent_id.clone(),
                    value: v,
                })
        };

        let deepest_block = extreme(|b| b.max_depth);
        Self {
            block_count: blocks.len(),
            total_volume_cubic_meters: sum(|b| b.volume_cubic_meters),
            total_area_hectares: sum(QuantitativeBlockMetric::hectares),
            average_max_depth: mean(|b| b.max_depth),
            average_mean_depth: mean(|b| b.mean_depth),
            max_depth: deepest_block.as_ref().map(|h| h.value),
            deepest_block,
            largest_block: extreme(QuantitativeBlockMetric::hectares),
        }
    }
}

fn highlight_from_json(summary: &Value, keys: &[&str], value_keys: &[&str]) -> Option<BlockHighlight> {
    let record = pick(summary, keys)?;
    Some(BlockHighlight {
        label: pick_string(record, &["label", "name", "block_label", "blockLabel", "block_id", "blockId"])?,
        persistent_id: pick_string(record, &["persistent_id", "persistentId"]),
        value: pick_number(record, value_keys)?,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub headline: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl ExecutiveSummary {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self {
                text: Some(s.trim().to_string()),
                ..Default::default()
            }),
            Value::Object(_) => {
                let summary = Self {
                    headline: pick_string(value, &["headline", "title"]),
                    text: pick_string(value, &["text", "summary", "body", "narrative"]),
                    highlights: pick_array(value, &["highlights", "key_findings", "keyFindings", "bullets"])
                        .map(|items| items.iter().filter_map(as_key_string).collect())
                        .unwrap_or_default(),
                };
                (summary.headline.is_some() || summary.text.is_some() || !summary.highlights.is_empty()).then_some(summary)
            }
            _ => None,
        }
    }
}

/// One entry of the backend's processing log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLog {
    pub name: String,
    pub status: Option<String>,
    pub message: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl StepLog {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self {
                name: s.clone(),
                status: None,
                message: None,
                duration_seconds: None,
            }),
            Value::Object(_) => Some(Self {
                name: pick_string(value, &["name", "step", "title"]).unwrap_or_else(|| "step".to_string()),
                status: pick_string(value, &["status", "state"]),
                message: pick_string(value, &["message", "detail", "details"]),
                duration_seconds: pick_number(value, &["duration_seconds", "durationSeconds", "duration", "elapsed"]),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeSnapshot {
    pub analysis_id: Option<String>,
    pub status: String,
    pub blocks: Vec<QuantitativeBlockMetric>,
    pub summary: SnapshotSummary,
    pub executive_summary: Option<ExecutiveSummary>,
    pub dem: Option<DemDescriptor>,
    #[serde(default)]
    pub steps: Vec<StepLog>,
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub persisted: bool,
}

impl QuantitativeSnapshot {
    /// Normalize a compute response (or a stored snapshot in any of the
    /// historical spellings). The result starts out unpersisted.
    pub fn from_response(value: &Value) -> Self {
        let blocks: Vec<QuantitativeBlockMetric> = pick_array(value, &["blocks", "block_metrics", "blockMetrics"])
            .map(|items| items.iter().map(QuantitativeBlockMetric::from_json).collect())
            .unwrap_or_default();
        let summary = SnapshotSummary::from_json(value, &blocks);

        Self {
            analysis_id: pick_string(value, &["analysis_id", "analysisId"]),
            status: pick_string(value, &["status"]).unwrap_or_else(|| "unknown".to_string()),
            executive_summary: pick(value, &["executiveSummary", "executive_summary"]).and_then(ExecutiveSummary::from_json),
            dem: pick(value, &["dem", "dem_info", "demInfo"]).and_then(DemDescriptor::from_json),
            steps: pick_array(value, &["steps", "step_log", "stepLog"])
                .map(|items| items.iter().filter_map(StepLog::from_json).collect())
                .unwrap_or_default(),
            source: pick_string(value, &["source"]),
            metadata: pick(value, &["metadata", "meta"]).cloned().unwrap_or(Value::Null),
            executed_at: ["executedAt", "executed_at", "computed_at", "computedAt"]
                .iter()
                .filter_map(|k| lookup(value, k))
                .find_map(parse_timestamp),
            persisted: false,
            blocks,
            summary,
        }
    }

    /// Read a stored snapshot. Records written by this crate carry the
    /// `persisted` field and deserialize directly; anything else is treated
    /// as a raw compute response. Either way the result counts as persisted.
    pub fn from_stored(value: &Value) -> Self {
        let native = value.get("persisted").and_then(|_| {
            serde_json::from_value::<Self>(value.clone())
                .map_err(|err| log::warn!("Stored snapshot is malformed ({}); normalizing", err))
                .ok()
        });
        let mut snapshot = native.unwrap_or_else(|| Self::from_response(value));
        snapshot.persisted = true;
        snapshot
    }

    /// Fresh means complete enough to visualize: at least one block, a DEM
    /// descriptor, and at least one block with a non-empty elevation grid.
    pub fn is_fresh(&self) -> bool {
        !self.blocks.is_empty()
            && self.dem.is_some()
            && self.blocks.iter().any(QuantitativeBlockMetric::has_elevation_grid)
    }

    pub fn metrics_index(&self) -> MetricsIndex {
        MetricsIndex::build(&self.blocks)
    }

    /// Find a block by persistent id, block id, or label.
    pub fn find_block(&self, key: &str) -> Option<&QuantitativeBlockMetric> {
        let by = |f: fn(&QuantitativeBlockMetric) -> Option<&str>| self.blocks.iter().find(|b| f(b) == Some(key));
        by(|b| b.persistent_id.as_deref())
            .or_else(|| by(|b| b.block_id.as_deref()))
            .or_else(|| by(|b| b.label.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> Value {
        json!({
            "status": "success",
            "blockCount": 2,
            "steps": ["fetch dem", { "name": "volume", "status": "ok", "duration": 1.5 }],
            "executiveSummary": { "headline": "Two pits", "highlights": ["deep", "wide"] },
            "dem": { "crs": "EPSG:32648", "resolution": 30, "tile_count": 4, "bounds": [100, 0, 101, 1] },
            "blocks": [
                { "persistent_id": "p1", "label": "A", "area_m2": 20000, "max_depth": 12.0, "mean_depth": 4.0, "volume_m3": 5000,
                  "visualization": { "elevation": [[1.0, 2.0], [3.0, 4.0]] } },
                { "persistent_id": "p2", "label": "B", "area_ha": 5.0, "max_depth": 30.0, "mean_depth": 8.0, "volume_m3": 7000 }
            ],
            "executedAt": "2024-05-01T10:00:00Z"
        })
    }

    #[test]
    fn test_normalizes_response() {
        let snap = QuantitativeSnapshot::from_response(&response());
        assert_eq!(snap.status, "success");
        assert_eq!(snap.blocks.len(), 2);
        assert_eq!(snap.steps.len(), 2);
        assert_eq!(snap.steps[1].duration_seconds, Some(1.5));
        assert_eq!(snap.dem.as_ref().and_then(|d| d.tile_count), Some(4));
        assert_eq!(snap.executive_summary.as_ref().map(|e| e.highlights.len()), Some(2));
        assert!(snap.executed_at.is_some());
        assert!(!snap.persisted);
        assert!(snap.is_fresh());
    }

    #[test]
    fn test_summary_derived_from_blocks() {
        let snap = QuantitativeSnapshot::from_response(&response());
        let s = &snap.summary;
        assert_eq!(s.block_count, 2);
        assert_eq!(s.total_volume_cubic_meters, Some(12000.0));
        assert_eq!(s.total_area_hectares, Some(7.0));
        assert_eq!(s.average_max_depth, Some(21.0));
        assert_eq!(s.max_depth, Some(30.0));
        assert_eq!(s.deepest_block.as_ref().map(|b| b.label.as_str()), Some("B"));
        assert_eq!(s.largest_block.as_ref().map(|b| b.label.as_str()), Some("B"));
    }

    #[test]
    fn test_backend_summary_wins() {
        let mut v = response();
        v["summary"] = json!({ "total_volume_m3": 1.0, "deepest_block": { "label": "A", "max_depth": 99.0 } });
        let snap = QuantitativeSnapshot::from_response(&v);
        assert_eq!(snap.summary.total_volume_cubic_meters, Some(1.0));
        assert_eq!(snap.summary.deepest_block.as_ref().map(|b| b.value), Some(99.0));
    }

    #[test]
    fn test_from_stored_accepts_both_shapes() {
        let native = serde_json::to_value(QuantitativeSnapshot::from_response(&response())).unwrap();
        let restored = QuantitativeSnapshot::from_stored(&native);
        assert!(restored.persisted);
        assert_eq!(restored.blocks.len(), 2);
        assert!(restored.is_fresh());

        let raw = QuantitativeSnapshot::from_stored(&json!({ "status": "success", "blocks": [{ "blockId": "b1" }] }));
        assert!(raw.persisted);
        assert_eq!(raw.blocks[0].block_id.as_deref(), Some("b1"));
    }

    #[test]
    fn test_freshness_requires_dem_and_grid() {
        let mut v = response();
        v.as_object_mut().unwrap().remove("dem");
        assert!(!QuantitativeSnapshot::from_response(&v).is_fresh());

        let mut v = response();
        v["blocks"][0].as_object_mut().unwrap().remove("visualization");
        assert!(!QuantitativeSnapshot::from_response(&v).is_fresh());

        assert!(!QuantitativeSnapshot::from_response(&json!({ "dem": {}, "blocks": [] })).is_fresh());
    }

    #[test]
    fn test_serde_roundtrip_keeps_freshness() {
        let mut snap = QuantitativeSnapshot::from_response(&response());
        snap.persisted = true;
        let back: QuantitativeSnapshot = serde_json::from_value(serde_json::to_value(&snap).unwrap()).unwrap();
        assert_eq!(back, snap);
        assert!(back.is_fresh());
    }

    #[test]
    fn test_find_block_by_any_key() {
        let snap = QuantitativeSnapshot::from_response(&response());
        assert_eq!(snap.find_block("p2").and_then(|b| b.label.as_deref()), Some("B"));
        assert_eq!(snap.find_block("A").and_then(|b| b.persistent_id.as_deref()), Some("p1"));
        assert!(snap.find_block("zzz").is_none());
    }
}
