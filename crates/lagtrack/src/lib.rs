//! `lagtrack`: cloud announcement ↔ IaC provider release reconciliation.
//!
//! Pure engine crate: receives pre-acquired feature and release records,
//! returns reconciled and merged output records. No CLI or network.

pub mod backfill;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod output;
pub mod summary;
pub mod timestamp;
pub mod tokenize;

pub use config::TrackerConfig;
pub use engine::{reconcile, reconcile_all, ReconcileContext};
pub use error::TrackerError;
pub use merge::merge;
pub use model::{Cloud, FeatureRecord, ReleaseRecord, SupportStatus};
pub use output::OutputRecord;
