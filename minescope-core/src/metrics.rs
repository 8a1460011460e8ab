//! Per-block volumetric metrics as returned by the quantitative backend.

use crate::fields::{lookup, pick, pick_bool, pick_number, pick_string};
use crate::geometry::{normalize_coordinate, LonLat};
use crate::grid::VisualizationGrid;
use crate::index::KeyedIndex;
use crate::types::{parse_timestamp, BlockKeys, BlockSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeBlockMetric {
    pub block_id: Option<String>,
    pub label: Option<String>,
    pub persistent_id: Option<String>,
    pub source: Option<BlockSource>,
    pub tile_id: Option<String>,
    pub block_index: Option<i64>,
    pub area_square_meters: Option<f64>,
    pub area_hectares: Option<f64>,
    pub rim_elevation: Option<f64>,
    pub max_depth: Option<f64>,
    pub mean_depth: Option<f64>,
    pub median_depth: Option<f64>,
    pub volume_cubic_meters: Option<f64>,
    /// Volume of material below the rim plane only, when reported separately.
    pub cut_volume_cubic_meters: Option<f64>,
    pub centroid: Option<LonLat>,
    pub visualization: Option<VisualizationGrid>,
    pub computed_at: Option<DateTime<Utc>>,
}

impl QuantitativeBlockMetric {
    pub fn from_json(value: &Value) -> Self {
        let block_id = pick_string(value, &["block_id", "blockId", "id"]);
        let persistent_id = pick_string(value, &["persistent_id", "persistentId"]);
        let merged_flag = pick_bool(value, &["is_merged", "isMerged", "merged"]);
        let marker = pick_string(value, &["source", "block_source", "blockSource"]);
        let source = match (merged_flag, marker) {
            (Some(true), _) => Some(BlockSource::Merged),
            (_, Some(m)) => Some(BlockSource::from_marker(&m)),
            (Some(false), None) => Some(BlockSource::Tile),
            (None, None) => block_id
                .as_deref()
                .or(persistent_id.as_deref())
                .filter(|id| id.to_ascii_lowercase().contains("merged"))
                .map(|_| BlockSource::Merged),
        };

        let visualization = pick(value, &["visualization", "grid", "visualization_grid", "visualizationGrid"])
            .and_then(VisualizationGrid::from_json);
        let rim_elevation = pick_number(value, &["rim_elevation", "rimElevation", "rim_elevation_m", "rimElevationM"])
            .or_else(|| visualization.as_ref().and_then(|g| g.rim_elevation));

        Self {
            label: pick_string(value, &["label", "name", "block_label", "blockLabel", "block_name"]),
            tile_id: pick_string(value, &["tile_id", "tileId"]),
            block_index: pick_number(value, &["block_index", "blockIndex"]).map(|n| n as i64),
            area_square_meters: pick_number(value, &["area_m2", "areaSquareMeters", "area_square_meters", "areaM2"]),
            area_hectares: pick_number(value, &["area_ha", "areaHectares", "area_hectares"]),
            rim_elevation,
            max_depth: pick_number(value, &["max_depth", "maxDepth", "max_depth_m", "maxDepthM"]),
            mean_depth: pick_number(value, &["mean_depth", "meanDepth", "mean_depth_m", "avg_depth", "averageDepth"]),
            median_depth: pick_number(value, &["median_depth", "medianDepth", "median_depth_m"]),
            volume_cubic_meters: pick_number(value, &["volume_m3", "volumeCubicMeters", "volume_cubic_meters", "volume"]),
            cut_volume_cubic_meters: pick_number(value, &["cut_volume_m3", "cutVolumeCubicMeters", "volume_below_rim_m3"]),
            centroid: pick(value, &["centroid", "label_position", "labelPosition"]).and_then(normalize_coordinate),
            visualization,
            computed_at: ["computed_at", "computedAt", "timestamp"]
                .iter()
                .filter_map(|k| lookup(value, k))
                .find_map(parse_timestamp),
            block_id,
            persistent_id,
            source,
        }
    }

    pub fn keys(&self) -> BlockKeys {
        BlockKeys::new(self.persistent_id.clone(), self.block_id.clone(), self.label.clone())
    }

    /// Hectares, derived from square metres when only those are known.
    pub fn hectares(&self) -> Option<f64> {
        self.area_hectares
            .or_else(|| self.area_square_meters.map(|m2| m2 / SQUARE_METRES_PER_HECTARE))
    }

    pub fn has_elevation_grid(&self) -> bool {
        self.visualization.as_ref().is_some_and(VisualizationGrid::has_elevation)
    }

    /// Human-facing name with the same fallbacks rows use.
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .or_else(|| self.block_id.clone())
            .or_else(|| self.persistent_id.clone())
            .unwrap_or_else(|| "Unnamed block".to_string())
    }
}

/// Metrics keyed by persistent id → block id → label. When two metrics
/// claim the same key, a merged-source metric displaces a tile-source one;
/// otherwise the first one wins.
#[derive(Debug, Clone, Default)]
pub struct MetricsIndex {
    inner: KeyedIndex<QuantitativeBlockMetric>,
    len: usize,
}

impl MetricsIndex {
    pub fn build<'a, I>(metrics: I) -> Self
    where
        I: IntoIterator<Item = &'a QuantitativeBlockMetric>,
    {
        let mut index = Self::default();
        for metric in metrics {
            index.inner.insert_with(&metric.keys(), metric.clone(), |existing, candidate| {
                existing.source != Some(BlockSource::Merged) && candidate.source == Some(BlockSource::Merged)
            });
            index.len += 1;
        }
        index
    }

    pub fn lookup<'a>(&'a self, keys: &'a BlockKeys) -> Option<&'a QuantitativeBlockMetric> {
        self.inner.lookup(keys)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of metrics fed into the index, duplicates included.
    pub fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_synonyms() {
        let m = QuantitativeBlockMetric::from_json(&json!({
            "blockId": "b1",
            "persistentId": "p1",
            "name": "Pit North",
            "areaSquareMeters": 25000,
            "rimElevation": 312.5,
            "maxDepth": 14.2,
            "meanDepth": "6.1",
            "volume_m3": 98000,
            "centroid": [101.2, 0.5],
            "computedAt": "2024-05-01T10:00:00Z",
            "source": "merged_mosaic"
        }));
        assert_eq!(m.block_id.as_deref(), Some("b1"));
        assert_eq!(m.label.as_deref(), Some("Pit North"));
        assert_eq!(m.hectares(), Some(2.5));
        assert_eq!(m.mean_depth, Some(6.1));
        assert_eq!(m.source, Some(BlockSource::Merged));
        assert_eq!(m.centroid, Some([101.2, 0.5]));
        assert!(m.computed_at.is_some());
        assert!(!m.has_elevation_grid());
    }

    #[test]
    fn test_rim_elevation_from_grid() {
        let m = QuantitativeBlockMetric::from_json(&json!({
            "block_id": "b2",
            "visualization": { "elevation": [[1.0]], "rim_elevation": 40.0 }
        }));
        assert_eq!(m.rim_elevation, Some(40.0));
        assert!(m.has_elevation_grid());
    }

    #[test]
    fn test_source_from_id_marker() {
        let m = QuantitativeBlockMetric::from_json(&json!({ "block_id": "merged-3" }));
        assert_eq!(m.source, Some(BlockSource::Merged));
        let t = QuantitativeBlockMetric::from_json(&json!({ "block_id": "7" }));
        assert_eq!(t.source, None);
    }

    #[test]
    fn test_index_prefers_merged() {
        let tile = QuantitativeBlockMetric::from_json(&json!({ "persistent_id": "p", "source": "tile", "max_depth": 1.0 }));
        let merged = QuantitativeBlockMetric::from_json(&json!({ "persistent_id": "p", "source": "merged", "max_depth": 2.0 }));
        let index = MetricsIndex::build([&tile, &merged]);
        let keys = BlockKeys::new(Some("p".into()), None, None);
        assert_eq!(index.lookup(&keys).and_then(|m| m.max_depth), Some(2.0));
        assert_eq!(index.len(), 2);

        let reversed = MetricsIndex::build([&merged, &tile]);
        assert_eq!(reversed.lookup(&keys).and_then(|m| m.max_depth), Some(2.0));
    }
}
