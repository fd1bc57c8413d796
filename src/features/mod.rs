//! Feature extraction
//!
//! Rolling team history, form statistics, competition inference and the
//! match-level feature vector built from them.

pub mod assembler;
pub mod history;
pub mod league;
pub mod window_stats;

pub use assembler::{assemble, FeatureVector, COLUMNS};
pub use history::{EntityHistoryStore, OutcomeStat, RollingWindow};
pub use league::{CompetitionLog, LeagueInferrer};
pub use window_stats::{AggregateStats, WindowedStatsCalculator};
