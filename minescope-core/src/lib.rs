//! MineScope Core Library
//!
//! Geometry normalization, elevation grid reconstruction, hover resolution,
//! block reconciliation and the quantitative compute state machine.

pub mod fields;
pub mod geometry;
pub mod axis;
pub mod grid;
pub mod hover;
pub mod types;
pub mod index;
pub mod imagery;
pub mod analysis;
pub mod metrics;
pub mod snapshot;
pub mod blocks;
pub mod orchestrator;

// Re-export commonly used types and functions
pub use types::{BlockKeys, BlockSource};
pub use geometry::{normalize_bounds_tuple, normalize_coordinate, normalize_polygon_rings, BoundingBox, LonLat};
pub use axis::{compute_axis_positions, AxisExtent};
pub use grid::VisualizationGrid;
pub use hover::{find_closest_axis_index, infer_grid_indices, resolve_hover, HoverPoint, HoverReadout};
pub use analysis::{AnalysisResult, SummaryStats};
pub use metrics::{MetricsIndex, QuantitativeBlockMetric};
pub use imagery::{BlockImagery, ImageryIndex};
pub use snapshot::QuantitativeSnapshot;
pub use blocks::{reconcile_blocks, BlockReconciler, MineBlockRow};
pub use orchestrator::{Command, Event, Phase, PersistState, QuantOrchestrator, RunId};

/// Version information for the MineScope core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
