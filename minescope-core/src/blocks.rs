//! Reconcile merged-mosaic and tile-level block detections into one ordered
//! list of canonical rows, enriched with volumetric metrics and imagery.

use crate::analysis::{AnalysisResult, AnalysisTile, RawBlockFeature};
use crate::fields::{pick, pick_bool, pick_number, pick_percentage, pick_string};
use crate::geometry::{bounds_from_polygon, normalize_bounds_tuple, normalize_coordinate, normalize_polygon_rings, BoundingBox, LonLat};
use crate::imagery::{BlockImagery, ImageryIndex};
use crate::metrics::{MetricsIndex, QuantitativeBlockMetric};
use crate::snapshot::QuantitativeSnapshot;
use crate::types::{BlockKeys, BlockSource};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

const BLOCK_ID_KEYS: &[&str] = &["block_id", "blockId", "mine_block_id", "id"];
const LABEL_KEYS: &[&str] = &["name", "label", "block_name", "blockName", "block_label"];
const AREA_M2_KEYS: &[&str] = &["area_m2", "areaM2", "area_sq_m", "area_square_meters", "areaSquareMeters"];
const AREA_HA_KEYS: &[&str] = &["area_ha", "areaHa", "area_hectares", "areaHectares"];
const CONFIDENCE_KEYS: &[&str] = &["confidence", "mean_confidence", "avg_confidence", "score", "probability"];
const LABEL_POSITION_KEYS: &[&str] = &["label_position", "labelPosition", "label_point", "centroid"];
const MERGE_FLAG_KEYS: &[&str] = &["is_merged", "isMerged", "merged"];

/// Depth and volume figures copied onto a row from its metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Volumetrics {
    pub rim_elevation: Option<f64>,
    pub max_depth: Option<f64>,
    pub mean_depth: Option<f64>,
    pub median_depth: Option<f64>,
    pub volume_cubic_meters: Option<f64>,
}

impl Volumetrics {
    pub fn from_metric(metric: &QuantitativeBlockMetric) -> Option<Self> {
        let v = Self {
            rim_elevation: metric.rim_elevation,
            max_depth: metric.max_depth,
            mean_depth: metric.mean_depth,
            median_depth: metric.median_depth,
            volume_cubic_meters: metric.volume_cubic_meters,
        };
        (v != Self::default()).then_some(v)
    }
}

/// One canonical block as shown in tables and on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MineBlockRow {
    /// `merged-<blockId>` or `tile-<blockId>`.
    pub id: String,
    pub label: String,
    pub tile_id: Option<String>,
    pub area_hectares: f64,
    /// 0–100, `None` when no detection confidence exists.
    pub confidence: Option<f64>,
    pub source: BlockSource,
    pub persistent_id: String,
    pub block_index: Option<i64>,
    pub centroid: Option<LonLat>,
    pub bounds: Option<BoundingBox>,
    pub volumetrics: Option<Volumetrics>,
    pub imagery: Option<BlockImagery>,
}

/// Canonical order: block index ascending when present, then merged before
/// tile, then larger area first.
///
/// Rows carrying a block index sort ahead of rows without one so the
/// comparison stays a total order when the two kinds are mixed.
pub fn compare_rows(a: &MineBlockRow, b: &MineBlockRow) -> Ordering {
    a.block_index
        .is_none()
        .cmp(&b.block_index.is_none())
        .then_with(|| a.block_index.cmp(&b.block_index))
        .then_with(|| a.source.rank().cmp(&b.source.rank()))
        .then_with(|| b.area_hectares.total_cmp(&a.area_hectares))
}

pub fn sort_rows(rows: &mut [MineBlockRow]) {
    rows.sort_by(compare_rows);
}

pub struct BlockReconciler<'a> {
    metrics: &'a [QuantitativeBlockMetric],
    metrics_index: MetricsIndex,
    imagery: ImageryIndex,
}

impl<'a> BlockReconciler<'a> {
    pub fn new(metrics: &'a [QuantitativeBlockMetric], imagery: ImageryIndex) -> Self {
        Self {
            metrics,
            metrics_index: MetricsIndex::build(metrics),
            imagery,
        }
    }

    /// Reconciler for a baseline and an optional quantitative snapshot, with
    /// imagery indexed from the baseline's tiles.
    pub fn for_result(result: &AnalysisResult, snapshot: Option<&'a QuantitativeSnapshot>) -> Self {
        let metrics = snapshot.map_or(&[][..], |s| s.blocks.as_slice());
        Self::new(metrics, ImageryIndex::from_tiles(&result.tiles))
    }

    pub fn reconcile(&self, result: &AnalysisResult) -> Vec<MineBlockRow> {
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        if let Some(merged) = &result.merged_blocks {
            for (ordinal, feature) in merged.iter().enumerate() {
                let row = self.row_from_feature(feature, BlockSource::Merged, None, ordinal);
                push_unique(&mut rows, &mut seen, row);
            }
        }

        for tile in &result.tiles {
            for (ordinal, feature) in tile.blocks.iter().enumerate() {
                let row = self.row_from_feature(feature, BlockSource::Tile, Some(tile), ordinal);
                if row.source == BlockSource::Tile && seen.contains(&row.persistent_id) {
                    let shadowed_by_merged = rows
                        .iter()
                        .any(|r: &MineBlockRow| r.source == BlockSource::Merged && r.persistent_id == row.persistent_id);
                    if shadowed_by_merged {
                        log::debug!("Tile block {} already represented by a merged block", row.persistent_id);
                        continue;
                    }
                }
                push_unique(&mut rows, &mut seen, row);
            }
        }

        if rows.is_empty() && !self.metrics.is_empty() {
            log::info!(
                "No detection blocks in baseline; synthesizing {} rows from quantitative metrics",
                self.metrics.len()
            );
            let mut ordered: Vec<&QuantitativeBlockMetric> = self.metrics.iter().collect();
            ordered.sort_by_key(|m| m.source.map_or(BlockSource::Tile.rank(), BlockSource::rank));
            for (ordinal, metric) in ordered.into_iter().enumerate() {
                let row = self.row_from_metric(metric, ordinal);
                if seen.contains(&row.persistent_id) {
                    log::debug!("Metric for {} already represented", row.persistent_id);
                    continue;
                }
                push_unique(&mut rows, &mut seen, row);
            }
        }

        sort_rows(&mut rows);
        rows
    }

    fn row_from_feature(
        &self,
        feature: &RawBlockFeature,
        collection: BlockSource,
        tile: Option<&AnalysisTile>,
        ordinal: usize,
    ) -> MineBlockRow {
        let props = &feature.properties;
        let source = match pick_bool(props, MERGE_FLAG_KEYS) {
            Some(true) => BlockSource::Merged,
            _ => collection,
        };
        let tile_id = tile
            .map(|t| t.id.clone())
            .or_else(|| pick_string(props, &["tile_id", "tileId", "source_tile", "sourceTile"]));

        let block_id = pick_string(props, BLOCK_ID_KEYS).unwrap_or_else(|| match &tile_id {
            Some(t) if collection == BlockSource::Tile => format!("{}_{}", t, ordinal),
            _ => format!("{}", ordinal + 1),
        });
        let persistent_id = pick_string(props, &["persistent_id", "persistentId"]).unwrap_or_else(|| block_id.clone());
        let explicit_label = pick_string(props, LABEL_KEYS);

        let keys = BlockKeys::new(Some(persistent_id.clone()), Some(block_id.clone()), explicit_label.clone());
        let metric = self.metrics_index.lookup(&keys);
        if metric.is_none() && !self.metrics.is_empty() {
            log::debug!("No quantitative metric for block {}", persistent_id);
        }

        let area_hectares = pick_number(props, AREA_M2_KEYS)
            .map(|m2| m2 / SQUARE_METRES_PER_HECTARE)
            .or_else(|| pick_number(props, AREA_HA_KEYS))
            .or_else(|| metric.and_then(QuantitativeBlockMetric::hectares))
            .unwrap_or(0.0);

        let rings = normalize_polygon_rings(&feature.geometry);
        if rings.is_none() && !feature.geometry.is_null() {
            log::debug!("Block {} has unusable geometry", block_id);
        }
        let bounds = pick(props, &["bbox", "bounds"])
            .and_then(normalize_bounds_tuple)
            .or_else(|| rings.as_deref().and_then(bounds_from_polygon));

        MineBlockRow {
            id: row_id(source, &block_id),
            label: explicit_label
                .clone()
                .or_else(|| metric.and_then(|m| m.label.clone()))
                .unwrap_or_else(|| format!("Block {}", block_id)),
            tile_id: tile_id.clone(),
            area_hectares,
            confidence: pick_percentage(props, CONFIDENCE_KEYS),
            source,
            block_index: pick_number(props, &["block_index", "blockIndex"])
                .map(|n| n as i64)
                .or_else(|| metric.and_then(|m| m.block_index)),
            centroid: pick(props, LABEL_POSITION_KEYS)
                .and_then(normalize_coordinate)
                .or_else(|| metric.and_then(|m| m.centroid))
                .or_else(|| bounds.map(|b| b.center())),
            bounds,
            volumetrics: metric.and_then(Volumetrics::from_metric),
            imagery: self.imagery.lookup(&keys, tile_id.as_deref()),
            persistent_id,
        }
    }

    fn row_from_metric(&self, metric: &QuantitativeBlockMetric, ordinal: usize) -> MineBlockRow {
        let source = match metric.source {
            Some(BlockSource::Merged) => BlockSource::Merged,
            _ => BlockSource::Tile,
        };
        let block_id = metric
            .block_id
            .clone()
            .or_else(|| metric.persistent_id.clone())
            .unwrap_or_else(|| format!("{}", ordinal + 1));
        let persistent_id = metric.persistent_id.clone().unwrap_or_else(|| block_id.clone());
        let keys = BlockKeys::new(Some(persistent_id.clone()), Some(block_id.clone()), metric.label.clone());

        MineBlockRow {
            id: row_id(source, &block_id),
            label: metric.display_label(),
            tile_id: metric.tile_id.clone(),
            area_hectares: metric.hectares().unwrap_or(0.0),
            confidence: None,
            source,
            block_index: metric.block_index,
            centroid: metric.centroid,
            bounds: None,
            volumetrics: Volumetrics::from_metric(metric),
            imagery: self.imagery.lookup(&keys, metric.tile_id.as_deref()),
            persistent_id,
        }
    }
}

/// Convenience wrapper: index imagery from `result`, attach metrics from
/// `snapshot`, and return the ordered rows.
pub fn reconcile_blocks(result: &AnalysisResult, snapshot: Option<&QuantitativeSnapshot>) -> Vec<MineBlockRow> {
    BlockReconciler::for_result(result, snapshot).reconcile(result)
}

/// `{source}-{block_id}`, without doubling a prefix the id already carries.
fn row_id(source: BlockSource, block_id: &str) -> String {
    let bare = [BlockSource::Merged, BlockSource::Tile]
        .iter()
        .map(|s| format!("{}-", s.id_prefix()))
        .find_map(|prefix| {
            block_id
                .get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(&prefix))
                .map(|_| &block_id[prefix.len()..])
        })
        .filter(|rest| !rest.is_empty())
        .unwrap_or(block_id);
    format!("{}-{}", source.id_prefix(), bare)
}

/// Keep persistent ids unique. Colliding rows get the owning tile appended,
/// then a counter if that is still not enough.
fn push_unique(rows: &mut Vec<MineBlockRow>, seen: &mut HashSet<String>, mut row: MineBlockRow) {
    if seen.contains(&row.persistent_id) {
        let base = match &row.tile_id {
            Some(tile) => format!("{}@{}", row.persistent_id, tile),
            None => row.persistent_id.clone(),
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{}#{}", base, n);
            n += 1;
        }
        log::warn!("Duplicate persistent id {}; using {}", row.persistent_id, candidate);
        row.id = row_id(row.source, &candidate);
        row.persistent_id = candidate;
    }
    seen.insert(row.persistent_id.clone());
    rows.push(row);
}
