//! Match-level feature vector
//!
//! Both teams' form, their differences, the inferred competition and the
//! season, in a fixed column order shared with the model trainer.

use crate::features::window_stats::AggregateStats;
use crate::{CompetitionId, EntityId, FormError, MatchOutcome, Result};
use serde::Serialize;

/// Column names of the training table, in order
pub const COLUMNS: [&str; 16] = [
    "LeagueId",
    "Season",
    "HomeAvgGoalsFor",
    "HomeAvgGoalsAgainst",
    "HomePointsPerGame",
    "HomeWinRate",
    "AwayAvgGoalsFor",
    "AwayAvgGoalsAgainst",
    "AwayPointsPerGame",
    "AwayWinRate",
    "AvgGoalsForDiff",
    "AvgGoalsAgainstDiff",
    "PointsPerGameDiff",
    "WinRateDiff",
    "GoalDiffDiff",
    "Result",
];

/// Form features for one fixture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub competition: CompetitionId,
    pub season: String,

    // Home team form (4)
    pub home_avg_goals_for: f32,
    pub home_avg_goals_against: f32,
    pub home_points_per_game: f32,
    pub home_win_rate: f32,

    // Away team form (4)
    pub away_avg_goals_for: f32,
    pub away_avg_goals_against: f32,
    pub away_points_per_game: f32,
    pub away_win_rate: f32,

    // Differentials, home minus away (5)
    pub avg_goals_for_diff: f32,
    pub avg_goals_against_diff: f32,
    pub points_per_game_diff: f32,
    pub win_rate_diff: f32,
    /// (home GF - home GA) - (away GF - away GA)
    pub goal_diff_diff: f32,

    /// Actual result; only set on training rows
    pub label: Option<MatchOutcome>,
}

impl FeatureVector {
    /// Number of numeric model inputs (competition plus 13 form values)
    pub const NUMERIC_DIM: usize = 14;

    /// Attach the actual result
    pub fn with_label(mut self, outcome: MatchOutcome) -> Self {
        self.label = Some(outcome);
        self
    }

    pub fn home_stats(&self) -> AggregateStats {
        AggregateStats {
            avg_goals_for: self.home_avg_goals_for,
            avg_goals_against: self.home_avg_goals_against,
            points_per_game: self.home_points_per_game,
            win_rate: self.home_win_rate,
        }
    }

    pub fn away_stats(&self) -> AggregateStats {
        AggregateStats {
            avg_goals_for: self.away_avg_goals_for,
            avg_goals_against: self.away_avg_goals_against,
            points_per_game: self.away_points_per_game,
            win_rate: self.away_win_rate,
        }
    }

    /// Numeric inputs in column order, season excluded
    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.competition.0 as f32,
            self.home_avg_goals_for,
            self.home_avg_goals_against,
            self.home_points_per_game,
            self.home_win_rate,
            self.away_avg_goals_for,
            self.away_avg_goals_against,
            self.away_points_per_game,
            self.away_win_rate,
            self.avg_goals_for_diff,
            self.avg_goals_against_diff,
            self.points_per_game_diff,
            self.win_rate_diff,
            self.goal_diff_diff,
        ]
    }

    /// One row of the training table, matching [`COLUMNS`]
    ///
    /// Commas in the season label are replaced so the row stays 16 fields.
    /// An unset label is written as an empty field.
    pub fn to_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(COLUMNS.len());
        record.push(self.competition.0.to_string());
        record.push(self.season.replace(',', "_"));
        record.extend(self.to_vec().into_iter().skip(1).map(|v| v.to_string()));
        record.push(
            self.label
                .map(|l| l.index().to_string())
                .unwrap_or_default(),
        );
        record
    }
}

/// Combine two teams' form into a [`FeatureVector`]
///
/// The label is left unset; training rows add it with
/// [`FeatureVector::with_label`].
pub fn assemble(
    home_team: EntityId,
    home: &AggregateStats,
    away_team: EntityId,
    away: &AggregateStats,
    competition: CompetitionId,
    season: &str,
) -> Result<FeatureVector> {
    if home_team == away_team {
        return Err(FormError::InvalidInput(format!(
            "home and away team must differ (both are {})",
            home_team
        )));
    }

    Ok(FeatureVector {
        competition,
        season: season.to_string(),
        home_avg_goals_for: home.avg_goals_for,
        home_avg_goals_against: home.avg_goals_against,
        home_points_per_game: home.points_per_game,
        home_win_rate: home.win_rate,
        away_avg_goals_for: away.avg_goals_for,
        away_avg_goals_against: away.avg_goals_against,
        away_points_per_game: away.points_per_game,
        away_win_rate: away.win_rate,
        avg_goals_for_diff: home.avg_goals_for - away.avg_goals_for,
        avg_goals_against_diff: home.avg_goals_against - away.avg_goals_against,
        points_per_game_diff: home.points_per_game - away.points_per_game,
        win_rate_diff: home.win_rate - away.win_rate,
        goal_diff_diff: home.goal_diff() - away.goal_diff(),
        label: None,
    })
}
