//! MineScope Service Library
//!
//! External collaborators of the quantitative pipeline: baseline sources,
//! the compute client, snapshot persistence, and the session driver that
//! runs the orchestrator against them.

pub mod error;
mod http;
pub mod baseline;
pub mod compute;
pub mod store;
pub mod session;

pub use error::{ServiceError, ServiceResult};
pub use baseline::{BaselineChain, BaselineFetch, BaselineSource, HistoryBaselineSource, HttpBaselineSource};
pub use compute::{HttpComputeClient, QuantCompute};
pub use store::{FileSnapshotStore, SnapshotStore};
pub use session::QuantSession;
