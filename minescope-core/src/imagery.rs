//! Per-block satellite and probability imagery, with whole-tile fallback.

use crate::analysis::AnalysisTile;
use crate::fields::{as_finite, pick, pick_array, pick_bool, pick_string};
use crate::geometry::{normalize_bounds_tuple, BoundingBox};
use crate::index::KeyedIndex;
use crate::types::{BlockKeys, BlockSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const BLOCK_IMAGERY_KEYS: &[&str] = &[
    "block_images",
    "blockImages",
    "block_imagery",
    "blockImagery",
    "mine_block_images",
];
const SATELLITE_KEYS: &[&str] = &[
    "satellite_image",
    "satelliteImage",
    "rgb_image",
    "rgbImage",
    "image_base64",
    "image",
];
const PROBABILITY_KEYS: &[&str] = &[
    "probability_image",
    "probabilityImage",
    "probability_map",
    "probabilityMap",
    "mask_image",
    "maskImage",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageryOrigin {
    Block,
    Tile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockImagery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    pub origin: ImageryOrigin,
    #[serde(skip)]
    source: Option<BlockSource>,
}

impl BlockImagery {
    fn from_json(value: &Value, origin: ImageryOrigin) -> Option<Self> {
        let imagery = Self {
            satellite_image: pick_string(value, SATELLITE_KEYS),
            probability_image: pick_string(value, PROBABILITY_KEYS),
            bounds: pick(value, &["bounds", "bbox", "image_bounds", "imageBounds"])
                .and_then(normalize_bounds_tuple),
            transform: pick_array(value, &["transform", "geotransform", "geoTransform"])
                .and_then(|items| items.iter().map(as_finite).collect()),
            crs: pick_string(value, &["crs", "epsg", "srs"]),
            origin,
            source: None,
        };
        (imagery.has_image() || imagery.bounds.is_some()).then_some(imagery)
    }

    pub fn has_image(&self) -> bool {
        self.satellite_image.is_some() || self.probability_image.is_some()
    }
}

/// Block-level imagery keyed like the metrics index, plus whole-tile
/// imagery keyed by tile id.
#[derive(Debug, Clone, Default)]
pub struct ImageryIndex {
    blocks: KeyedIndex<BlockImagery>,
    tiles: HashMap<String, BlockImagery>,
}

impl ImageryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tiles(tiles: &[AnalysisTile]) -> Self {
        let mut index = Self::new();
        for tile in tiles {
            if let Some(records) = pick_array(&tile.raw, BLOCK_IMAGERY_KEYS) {
                for record in records {
                    index.insert_record(record);
                }
            }
            if let Some(mut whole) = BlockImagery::from_json(&tile.raw, ImageryOrigin::Tile) {
                whole.bounds = whole.bounds.or(tile.bounds);
                index.tiles.insert(tile.id.clone(), whole);
            }
        }
        index
    }

    /// Register one per-block imagery record. Records without any key or
    /// without either an image or bounds are ignored.
    pub fn insert_record(&mut self, record: &Value) {
        let keys = BlockKeys::new(
            pick_string(record, &["persistent_id", "persistentId"]),
            pick_string(record, &["block_id", "blockId", "id"]),
            pick_string(record, &["label", "name", "block_name", "blockName"]),
        );
        if keys.is_empty() {
            log::debug!("Skipping imagery record without block keys");
            return;
        }
        let Some(mut imagery) = BlockImagery::from_json(record, ImageryOrigin::Block) else {
            return;
        };
        let merged = pick_bool(record, &["is_merged", "isMerged", "merged"]).unwrap_or(false)
            || pick_string(record, &["source"]).is_some_and(|s| BlockSource::from_marker(&s) == BlockSource::Merged);
        imagery.source = Some(if merged { BlockSource::Merged } else { BlockSource::Tile });
        self.insert_block(&keys, imagery);
    }

    pub fn insert_block(&mut self, keys: &BlockKeys, imagery: BlockImagery) {
        self.blocks.insert_with(keys, imagery, |existing, candidate| {
            if candidate.has_image() != existing.has_image() {
                return candidate.has_image();
            }
            existing.source != Some(BlockSource::Merged) && candidate.source == Some(BlockSource::Merged)
        });
    }

    pub fn insert_tile(&mut self, tile_id: impl Into<String>, imagery: BlockImagery) {
        self.tiles.insert(tile_id.into(), imagery);
    }

    /// Block-level match (preferring one with an actual image), else the
    /// owning tile's whole-tile imagery.
    pub fn lookup(&self, keys: &BlockKeys, tile_id: Option<&str>) -> Option<BlockImagery> {
        self.blocks
            .lookup_preferring(keys, BlockImagery::has_image)
            .or_else(|| tile_id.and_then(|id| self.tiles.get(id)))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.tiles.is_empty()
    }
}
