//! Form statistics over a rolling window

use crate::features::history::RollingWindow;
use crate::{FormError, Result};

/// Averages and rates over a team's recent matches
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregateStats {
    pub avg_goals_for: f32,
    pub avg_goals_against: f32,
    pub points_per_game: f32,
    /// Share of matches won; draws do not count
    pub win_rate: f32,
}

impl AggregateStats {
    /// Average goal difference per match
    pub fn goal_diff(&self) -> f32 {
        self.avg_goals_for - self.avg_goals_against
    }
}

/// Reduces a rolling window to [`AggregateStats`]
#[derive(Debug, Clone, Copy)]
pub struct WindowedStatsCalculator {
    min_history: usize,
}

impl WindowedStatsCalculator {
    pub fn new(min_history: usize) -> Self {
        WindowedStatsCalculator { min_history }
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Compute form over every entry of `window`
    ///
    /// Sums are accumulated oldest to newest, so two windows holding the same
    /// outcomes always yield bit-identical results.
    pub fn compute(&self, window: &RollingWindow) -> Result<AggregateStats> {
        if window.len() < self.min_history {
            return Err(FormError::InsufficientHistory {
                entity: window.entity(),
                matches: window.len(),
                required: self.min_history,
            });
        }

        let games = window.len() as f32;
        let mut goals_for = 0.0f32;
        let mut goals_against = 0.0f32;
        let mut points = 0.0f32;
        let mut wins = 0.0f32;

        for stat in window.iter() {
            goals_for += stat.goals_for as f32;
            goals_against += stat.goals_against as f32;
            points += stat.points as f32;
            if stat.is_win() {
                wins += 1.0;
            }
        }

        Ok(AggregateStats {
            avg_goals_for: goals_for / games,
            avg_goals_against: goals_against / games,
            points_per_game: points / games,
            win_rate: wins / games,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::history::OutcomeStat;
    use crate::EntityId;

    fn window_of(results: &[(u16, u16)]) -> RollingWindow {
        let mut window = RollingWindow::new(EntityId(7), 5);
        for &(gf, ga) in results {
            window.push(OutcomeStat::new(gf, ga));
        }
        window
    }

    #[test]
    fn test_form_over_five_matches() {
        let window = window_of(&[(2, 0), (1, 0), (3, 1), (1, 1), (0, 2)]);
        let stats = WindowedStatsCalculator::new(5).compute(&window).unwrap();

        assert!((stats.avg_goals_for - 1.4).abs() < 1e-6);
        assert!((stats.avg_goals_against - 0.8).abs() < 1e-6);
        assert!((stats.points_per_game - 2.0).abs() < 1e-6);
        assert!((stats.win_rate - 0.6).abs() < 1e-6);
        assert!((stats.goal_diff() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_four_matches_is_insufficient() {
        let window = window_of(&[(2, 0), (1, 0), (3, 1), (1, 1)]);
        let err = WindowedStatsCalculator::new(5).compute(&window).unwrap_err();

        match err {
            FormError::InsufficientHistory {
                entity,
                matches,
                required,
            } => {
                assert_eq!(entity, EntityId(7));
                assert_eq!(matches, 4);
                assert_eq!(required, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_draws_earn_points_but_not_wins() {
        let window = window_of(&[(1, 1), (0, 0), (2, 2), (1, 1), (3, 3)]);
        let stats = WindowedStatsCalculator::new(5).compute(&window).unwrap();

        assert_eq!(stats.win_rate, 0.0);
        assert!((stats.points_per_game - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_win_rate_matches_win_count() {
        let window = window_of(&[(1, 0), (0, 1), (2, 1), (1, 1), (4, 0), (0, 3), (2, 0)]);
        let stats = WindowedStatsCalculator::new(5).compute(&window).unwrap();

        let wins = window.wins() as f32;
        assert!((stats.win_rate * window.len() as f32 - wins).abs() < 1e-5);
    }
}
