use minescope_core::imagery::ImageryOrigin;
use minescope_core::{
    reconcile_blocks, resolve_hover, AnalysisResult, BlockSource, HoverPoint, QuantitativeSnapshot,
};
use serde_json::{json, Value};
use std::collections::HashSet;

fn baseline() -> Value {
    json!({
        "analysis_id": "a-42",
        "summary": { "total_area_m2": 1000000, "mining_percentage": 0.05 },
        "merged_blocks": {
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [0.4, 0], [0.4, 0.2], [0, 0]]] },
                "properties": { "persistent_id": "m1", "block_id": "mb1", "area_m2": 30000, "confidence": 0.9 }
            }]
        },
        "tiles": [{
            "tile_id": "t0",
            "bounds": [0, 0, 1, 1],
            "satellite_image": "t0.png",
            "mine_blocks": [
                { "properties": { "persistent_id": "m1", "block_id": "tb1", "area_m2": 10000 } },
                { "properties": { "block_id": "tb2", "area_ha": 5, "confidence": 70, "block_index": 1 } }
            ],
            "block_images": [
                { "persistent_id": "m1", "image": "tile-m1.png" },
                { "persistent_id": "m1", "image": "merged-m1.png", "is_merged": true }
            ]
        }]
    })
}

fn snapshot() -> QuantitativeSnapshot {
    QuantitativeSnapshot::from_response(&json!({
        "status": "success",
        "dem": { "crs": "EPSG:4326", "resolution": 30 },
        "blocks": [
            { "persistent_id": "m1", "source": "tile", "max_depth": 5.0 },
            {
                "persistent_id": "m1",
                "source": "merged",
                "max_depth": 12.0,
                "volume_m3": 4200,
                "visualization": {
                    "elevation": [[1, 2, 3], [4, 5, 6]],
                    "depth": [[0, 0, 0], [1, 2, 3]],
                    "bounds": [0, 0, 20, 10]
                }
            }
        ]
    }))
}

#[test]
fn baseline_and_snapshot_reconcile_into_canonical_rows() {
    let result = AnalysisResult::from_json(&baseline());
    let snap = snapshot();
    assert!(snap.is_fresh());

    let rows = reconcile_blocks(&result, Some(&snap));
    assert_eq!(rows.len(), 2);

    let unique: HashSet<_> = rows.iter().map(|r| r.persistent_id.as_str()).collect();
    assert_eq!(unique.len(), rows.len());

    // Block index wins over source.
    assert_eq!(rows[0].id, "tile-tb2");
    assert_eq!(rows[0].confidence, Some(70.0));
    assert_eq!(rows[1].id, "merged-mb1");
    assert_eq!(rows[1].source, BlockSource::Merged);
    assert_eq!(rows[1].area_hectares, 3.0);
    assert_eq!(rows[1].confidence, Some(90.0));

    let volumetrics = rows[1].volumetrics.as_ref().expect("merged metric attached");
    assert_eq!(volumetrics.max_depth, Some(12.0));
    assert_eq!(volumetrics.volume_cubic_meters, Some(4200.0));

    let merged_imagery = rows[1].imagery.as_ref().expect("block imagery");
    assert_eq!(merged_imagery.satellite_image.as_deref(), Some("merged-m1.png"));
    assert_eq!(merged_imagery.origin, ImageryOrigin::Block);

    let tile_imagery = rows[0].imagery.as_ref().expect("tile fallback imagery");
    assert_eq!(tile_imagery.origin, ImageryOrigin::Tile);
    assert_eq!(tile_imagery.satellite_image.as_deref(), Some("t0.png"));
}

#[test]
fn summary_is_completed_from_rows() {
    let result = AnalysisResult::from_json(&baseline());
    let rows = reconcile_blocks(&result, None);
    let stats = result.summary().with_rows(&rows);
    assert_eq!(stats.mining_percentage, Some(5.0));
    assert_eq!(stats.block_count, Some(2));
    assert_eq!(stats.mining_area_m2, Some(80000.0));
    assert_eq!(stats.average_confidence, Some(80.0));
    assert_eq!(stats.tile_count, 1);
}

#[test]
fn hover_resolves_against_reconstructed_axes() {
    let snap = snapshot();
    let grid = snap
        .blocks
        .iter()
        .find_map(|m| m.visualization.as_ref())
        .expect("grid present");
    assert_eq!(grid.x, vec![0.0, 10.0, 20.0]);
    assert_eq!(grid.y, vec![0.0, 10.0]);

    let readout = resolve_hover(grid, &HoverPoint::at(12.0, 9.0)).expect("resolved");
    assert_eq!((readout.row, readout.column), (1, 1));
    assert_eq!(readout.elevation, Some(5.0));
    assert_eq!(readout.depth, Some(2.0));

    let by_index = resolve_hover(grid, &HoverPoint::with_indices(0, 2)).expect("resolved");
    assert_eq!(by_index.elevation, Some(3.0));
}

#[test]
fn empty_baseline_falls_back_to_metric_rows() {
    let result = AnalysisResult::from_json(&json!({ "tiles": [] }));
    let rows = reconcile_blocks(&result, Some(&snapshot()));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source, BlockSource::Merged);
    assert_eq!(rows[0].confidence, None);
}
