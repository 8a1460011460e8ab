use criterion::{black_box, criterion_group, criterion_main, Criterion};
use minescope_core::{reconcile_blocks, AnalysisResult, QuantitativeSnapshot};
use serde_json::{json, Value};

fn synthetic_baseline(tiles: usize, blocks_per_tile: usize) -> Value {
    let tiles: Vec<Value> = (0..tiles)
        .map(|t| {
            let blocks: Vec<Value> = (0..blocks_per_tile)
                .map(|b| {
                    let x = t as f64 + b as f64 * 0.01;
                    json!({
                        "type": "Feature",
                        "geometry": {
                            "type": "Polygon",
                            "coordinates": [[[x, 0.0], [x + 0.005, 0.0], [x + 0.005, 0.005], [x, 0.0]]]
                        },
                        "properties": {
                            "persistent_id": format!("p{}_{}", t, b),
                            "area_m2": 1000.0 + b as f64,
                            "confidence": 0.5
                        }
                    })
                })
                .collect();
            json!({ "tile_id": format!("t{}", t), "bounds": [t, 0, t + 1, 1], "mine_blocks": blocks })
        })
        .collect();
    json!({ "tiles": tiles })
}

fn synthetic_snapshot(tiles: usize, blocks_per_tile: usize) -> QuantitativeSnapshot {
    let blocks: Vec<Value> = (0..tiles)
        .flat_map(|t| (0..blocks_per_tile).map(move |b| (t, b)))
        .map(|(t, b)| json!({ "persistent_id": format!("p{}_{}", t, b), "max_depth": b as f64, "volume_m3": 10.0 }))
        .collect();
    QuantitativeSnapshot::from_response(&json!({ "blocks": blocks }))
}

fn bench_reconcile(c: &mut Criterion) {
    let result = AnalysisResult::from_json(&synthetic_baseline(20, 50));
    let snapshot = synthetic_snapshot(20, 50);

    c.bench_function("reconcile_1000_blocks", |b| {
        b.iter(|| {
            let rows = reconcile_blocks(black_box(&result), Some(black_box(&snapshot)));
            black_box(rows)
        })
    });
}

fn bench_parse_baseline(c: &mut Criterion) {
    let raw = synthetic_baseline(20, 50);

    c.bench_function("parse_baseline_1000_blocks", |b| {
        b.iter(|| black_box(AnalysisResult::from_json(black_box(&raw))))
    });
}

criterion_group!(benches, bench_reconcile, bench_parse_baseline);
criterion_main!(benches);
