//! Football form features
//!
//! Turns a chronologically ordered log of match results into fixed-width
//! form features for a pair of teams, either in one streaming pass over the
//! whole log (training table) or on demand for a single fixture (inference).

pub mod data;
pub mod features;
pub mod predict;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Identifier of a competition (league)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompetitionId(pub i64);

impl CompetitionId {
    /// Returned when a team has no earlier match to vote with
    pub const UNKNOWN: CompetitionId = CompetitionId(0);

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl fmt::Display for CompetitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A team as listed in the team table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: EntityId,
    pub long_name: String,
    pub short_name: String,
}

impl Team {
    pub fn matches_name(&self, name: &str) -> bool {
        let name_lower = name.trim().to_lowercase();
        self.long_name.to_lowercase() == name_lower
            || (!self.short_name.is_empty() && self.short_name.to_lowercase() == name_lower)
    }
}

/// A single finished match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub timestamp: NaiveDateTime,
    pub home_team: EntityId,
    pub away_team: EntityId,
    pub home_goals: u16,
    pub away_goals: u16,
    pub competition: CompetitionId,
    pub season: String,
}

impl MatchRecord {
    /// Outcome from the home side's point of view
    pub fn outcome(&self) -> MatchOutcome {
        MatchOutcome::from_goals(self.home_goals, self.away_goals)
    }

    /// Check if a team played in this match
    pub fn involves(&self, team: EntityId) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Get goals scored by a specific team
    pub fn goals_for(&self, team: EntityId) -> Option<u16> {
        if team == self.home_team {
            Some(self.home_goals)
        } else if team == self.away_team {
            Some(self.away_goals)
        } else {
            None
        }
    }

    /// Get goals conceded by a specific team
    pub fn goals_against(&self, team: EntityId) -> Option<u16> {
        if team == self.home_team {
            Some(self.away_goals)
        } else if team == self.away_team {
            Some(self.home_goals)
        } else {
            None
        }
    }
}

/// Three-way match result, encoded as the training label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    AwayWin = 0,
    Draw = 1,
    HomeWin = 2,
}

impl MatchOutcome {
    pub const ALL: [MatchOutcome; 3] = [MatchOutcome::AwayWin, MatchOutcome::Draw, MatchOutcome::HomeWin];

    /// Derive the outcome purely from the goal counts
    pub fn from_goals(home_goals: u16, away_goals: u16) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => MatchOutcome::HomeWin,
            std::cmp::Ordering::Less => MatchOutcome::AwayWin,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    /// Map a class index from a 3-way scorer back to an outcome
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            MatchOutcome::AwayWin => "A",
            MatchOutcome::Draw => "D",
            MatchOutcome::HomeWin => "H",
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::AwayWin => write!(f, "Away win"),
            MatchOutcome::Draw => write!(f, "Draw"),
            MatchOutcome::HomeWin => write!(f, "Home win"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No matches found for season {0}")]
    UnknownSeason(String),

    #[error("Insufficient history for {entity}: has {matches} matches, need {required}")]
    InsufficientHistory {
        entity: EntityId,
        matches: usize,
        required: usize,
    },

    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord { line: u64, message: String },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FormError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub features: FeatureConfig,
    pub data: DataConfig,
}

/// Window sizes shared by the training and inference paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Capacity of each team's rolling window
    pub window: usize,
    /// Matches required before a team's form is defined
    pub min_history: usize,
    /// Matches scanned when inferring a team's competition
    pub league_lookback: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            window: 5,
            min_history: 5,
            league_lookback: 30,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(FormError::Config("features.window must be at least 1".to_string()));
        }
        if self.min_history == 0 || self.min_history > self.window {
            return Err(FormError::Config(format!(
                "features.min_history must be between 1 and window ({}), got {}",
                self.window, self.min_history
            )));
        }
        if self.league_lookback == 0 {
            return Err(FormError::Config(
                "features.league_lookback must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub matches_csv: String,
    pub teams_csv: String,
    pub dataset_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/football.db".to_string(),
            matches_csv: "data/raw/Match.csv".to_string(),
            teams_csv: "data/raw/Team.csv".to_string(),
            dataset_path: "data/processed/dataset.csv".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FormError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| FormError::Config(format!("Failed to parse config: {}", e)))?;
        config.features.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FormError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
