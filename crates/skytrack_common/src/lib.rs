//! SkyTrack Common - progression model and snapshot store.
//!
//! The core is pure and synchronous: breakpoint tables, level resolution,
//! bestiary aggregation and the windowed progress engine, all reading from an
//! append-only SQLite snapshot store. The daemon owns all network I/O.

pub mod bestiary;
pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod levels;
pub mod progress;
pub mod store;
pub mod thresholds;

pub use bestiary::{aggregate_all, aggregate_family, FamilyLevels, SubgroupLevel};
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use history::{profile_series_since, series_since, ProfileSeries, SeriesPoint};
pub use ingest::{parse_profile, SnapshotBatch};
pub use levels::{collection_tier, resolve_level, skill_level};
pub use progress::{compute_progress, ProgressEntry, Window};
pub use store::{ProfileStats, SeriesTable, SnapshotStore};
pub use thresholds::{BestiaryBracket, FamilyDef, MetricCategory, ThresholdRegistry};
