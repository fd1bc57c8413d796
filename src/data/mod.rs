//! Data ingestion and storage
//!
//! CSV loading, SQLite persistence and the streaming training-table builder.

pub mod database;
pub mod dataset;
pub mod loader;

pub use database::{Database, DatabaseStats};
pub use dataset::{Baselines, DatasetBuilder, TrainingTable};
pub use loader::{load_matches, load_teams, LoadedMatches};
