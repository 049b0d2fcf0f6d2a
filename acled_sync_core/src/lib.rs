//! Core orchestration for the ACLED live feature-layer sync: canonical
//! models, the `Feed` and `FeatureStore` seams, and the full-refresh engine.

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod feeds;
pub mod models;
pub mod recency;
pub mod store;

pub use config::{StoreCredentials, SyncConfig};
pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use feeds::Feed;
pub use models::{
    EditSummary, EventAttributes, Feature, FeedOutcome, Geometry, PhaseSummary, RunReport,
    Session, SyncTrigger,
};
pub use recency::RecencyWindow;
pub use store::{FeatureStore, ObjectId};
