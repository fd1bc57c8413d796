//! Prediction-time features
//!
//! Recompute a fixture's features on demand from the full match log.

pub mod inference;

pub use inference::{season_start, PredictionFeatureBuilder};
