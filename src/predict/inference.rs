//! On-demand features for a single fixture
//!
//! Rebuilds both teams' windows from the raw log for one request. The result
//! must match what [`DatasetBuilder`](crate::data::dataset::DatasetBuilder)
//! produces at the same point in time.

use crate::features::{
    assemble, AggregateStats, EntityHistoryStore, FeatureVector, LeagueInferrer, OutcomeStat,
    WindowedStatsCalculator,
};
use crate::{EntityId, FeatureConfig, FormError, MatchRecord, Result};
use chrono::NaiveDateTime;

/// Kick-off time of the first match of `season`
pub fn season_start(matches: &[MatchRecord], season: &str) -> Result<NaiveDateTime> {
    matches
        .iter()
        .filter(|m| m.season == season)
        .map(|m| m.timestamp)
        .min()
        .ok_or_else(|| FormError::UnknownSeason(season.to_string()))
}

/// Builds inference features over a borrowed match log
pub struct PredictionFeatureBuilder<'a> {
    matches: &'a [MatchRecord],
    config: FeatureConfig,
    calculator: WindowedStatsCalculator,
    inferrer: LeagueInferrer,
}

impl<'a> PredictionFeatureBuilder<'a> {
    /// `matches` must be sorted ascending by timestamp
    pub fn new(matches: &'a [MatchRecord], config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(PredictionFeatureBuilder {
            matches,
            config,
            calculator: WindowedStatsCalculator::new(config.min_history),
            inferrer: LeagueInferrer::new(config.league_lookback),
        })
    }

    /// Features for `home` vs `away` as of the start of `season`
    pub fn build(&self, season: &str, home: EntityId, away: EntityId) -> Result<FeatureVector> {
        ensure_distinct(home, away)?;
        let cutoff = season_start(self.matches, season)?;
        self.features_at(home, away, cutoff, season)
    }

    /// Features for `home` vs `away` from matches strictly before `cutoff`
    pub fn features_at(
        &self,
        home: EntityId,
        away: EntityId,
        cutoff: NaiveDateTime,
        season: &str,
    ) -> Result<FeatureVector> {
        ensure_distinct(home, away)?;

        let home_stats = self.stats_before(home, cutoff)?;
        let away_stats = self.stats_before(away, cutoff)?;
        let competition = self.inferrer.infer(self.matches, home, cutoff);

        log::debug!(
            "Features for {} vs {} before {}: competition {}",
            home,
            away,
            cutoff,
            competition
        );

        assemble(home, &home_stats, away, &away_stats, competition, season)
    }

    /// Form of `team` over its last matches strictly before `cutoff`
    pub fn stats_before(&self, team: EntityId, cutoff: NaiveDateTime) -> Result<AggregateStats> {
        // Request-scoped store; the window keeps only the latest entries
        let mut store = EntityHistoryStore::new(self.config.window);
        for m in self.matches.iter().filter(|m| m.timestamp < cutoff) {
            if let Some(stat) = OutcomeStat::for_entity(m, team) {
                store.push(team, stat);
            }
        }

        self.calculator.compute(store.ensure(team))
    }
}

fn ensure_distinct(home: EntityId, away: EntityId) -> Result<()> {
    if home == away {
        return Err(FormError::InvalidInput(format!(
            "home and away team must differ (both are {})",
            home
        )));
    }
    Ok(())
}

/// Format features for display
pub fn format_features(fv: &FeatureVector, home_name: &str, away_name: &str) -> String {
    let home = fv.home_stats();
    let away = fv.away_stats();
    let competition = if fv.competition.is_unknown() {
        "unknown".to_string()
    } else {
        fv.competition.to_string()
    };

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}
│  Season {} • League {}
├─────────────────────────────────────────────────┤
│                    {:>10} {:>10} {:>8}
│  Goals for         {:>10.2} {:>10.2} {:>+8.2}
│  Goals against     {:>10.2} {:>10.2} {:>+8.2}
│  Points per game   {:>10.2} {:>10.2} {:>+8.2}
│  Win rate          {:>10.2} {:>10.2} {:>+8.2}
│  Goal diff diff    {:>32.2}
└─────────────────────────────────────────────────┘
"#,
        home_name,
        away_name,
        fv.season,
        competition,
        "home",
        "away",
        "diff",
        home.avg_goals_for,
        away.avg_goals_for,
        fv.avg_goals_for_diff,
        home.avg_goals_against,
        away.avg_goals_against,
        fv.avg_goals_against_diff,
        home.points_per_game,
        away.points_per_game,
        fv.points_per_game_diff,
        home.win_rate,
        away.win_rate,
        fv.win_rate_diff,
        fv.goal_diff_diff,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::DatasetBuilder;
    use crate::CompetitionId;
    use chrono::{Duration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn at(day: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 8, 1)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
            + Duration::days(day)
    }

    fn make_match(
        day: i64,
        home: i64,
        away: i64,
        home_goals: u16,
        away_goals: u16,
        season: &str,
    ) -> MatchRecord {
        MatchRecord {
            timestamp: at(day),
            home_team: EntityId(home),
            away_team: EntityId(away),
            home_goals,
            away_goals,
            competition: CompetitionId(1729),
            season: season.to_string(),
        }
    }

    /// Team 1's history is (2-0, 1-0, 3-1, 1-1, 0-2), team 2 draws five times
    fn corpus() -> Vec<MatchRecord> {
        let results = [(2, 0), (1, 0), (3, 1), (1, 1), (0, 2)];
        let mut matches = Vec::new();
        for (i, &(gf, ga)) in results.iter().enumerate() {
            let day = i as i64;
            if i % 2 == 0 {
                matches.push(make_match(day, 1, 10 + day, gf, ga, "2009/2010"));
            } else {
                matches.push(make_match(day, 10 + day, 1, ga, gf, "2009/2010"));
            }
            matches.push(make_match(day, 2, 20 + day, 1, 1, "2009/2010"));
        }
        matches.push(make_match(30, 1, 2, 2, 1, "2010/2011"));
        matches
    }

    #[test]
    fn test_build_for_next_season() {
        let matches = corpus();
        let builder = PredictionFeatureBuilder::new(&matches, FeatureConfig::default()).unwrap();
        let fv = builder.build("2010/2011", EntityId(1), EntityId(2)).unwrap();

        assert!((fv.home_avg_goals_for - 1.4).abs() < 1e-6);
        assert!((fv.home_avg_goals_against - 0.8).abs() < 1e-6);
        assert!((fv.home_points_per_game - 2.0).abs() < 1e-6);
        assert!((fv.home_win_rate - 0.6).abs() < 1e-6);
        assert_eq!(fv.away_win_rate, 0.0);
        assert_eq!(fv.away_points_per_game, 1.0);
        assert_eq!(fv.competition, CompetitionId(1729));
        assert_eq!(fv.season, "2010/2011");
        assert_eq!(fv.label, None);
    }

    #[test]
    fn test_identical_requests_give_identical_features() {
        let matches = corpus();
        let builder = PredictionFeatureBuilder::new(&matches, FeatureConfig::default()).unwrap();
        let first = builder.build("2010/2011", EntityId(2), EntityId(1)).unwrap();
        let second = builder.build("2010/2011", EntityId(2), EntityId(1)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_team_is_invalid_regardless_of_history() {
        let builder = PredictionFeatureBuilder::new(&[], FeatureConfig::default()).unwrap();
        let err = builder.build("1999/2000", EntityId(3), EntityId(3)).unwrap_err();
        assert!(matches!(err, FormError::InvalidInput(_)));
    }

    #[test]
    fn test_unknown_season() {
        let matches = corpus();
        let builder = PredictionFeatureBuilder::new(&matches, FeatureConfig::default()).unwrap();
        let err = builder.build("2020/2021", EntityId(1), EntityId(2)).unwrap_err();
        assert!(matches!(err, FormError::UnknownSeason(s) if s == "2020/2021"));
    }

    #[test]
    fn test_four_prior_matches_is_insufficient() {
        let mut matches = corpus();
        // Drop team 2's first draw
        matches.retain(|m| !(m.home_team == EntityId(2) && m.timestamp == at(0)));
        let builder = PredictionFeatureBuilder::new(&matches, FeatureConfig::default()).unwrap();

        let err = builder.build("2010/2011", EntityId(1), EntityId(2)).unwrap_err();
        match err {
            FormError::InsufficientHistory {
                entity,
                matches,
                required,
            } => {
                assert_eq!(entity, EntityId(2));
                assert_eq!(matches, 4);
                assert_eq!(required, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cutoff_excludes_the_season_itself() {
        let mut matches = corpus();
        // A big win on the season's opening day must not leak into its features
        matches.push(make_match(30, 3, 4, 0, 0, "2010/2011"));
        matches.push(make_match(31, 1, 5, 9, 0, "2010/2011"));
        let builder = PredictionFeatureBuilder::new(&matches, FeatureConfig::default()).unwrap();

        let fv = builder.build("2010/2011", EntityId(1), EntityId(2)).unwrap();
        assert!((fv.home_avg_goals_for - 1.4).abs() < 1e-6);
        assert_eq!(season_start(&matches, "2010/2011").unwrap(), at(30));
    }

    #[test]
    fn test_only_last_window_counts() {
        let mut matches = corpus();
        // Older heavy defeats for team 1 fall outside its five-match window
        for day in 0..3 {
            matches.insert(0, make_match(-10 - day, 40 + day, 1, 5, 0, "2008/2009"));
        }
        let builder = PredictionFeatureBuilder::new(&matches, FeatureConfig::default()).unwrap();
        let stats = builder.stats_before(EntityId(1), at(30)).unwrap();
        assert!((stats.avg_goals_for - 1.4).abs() < 1e-6);
    }

    /// Random league with every team playing at most once per day
    fn random_league(seed: u64, teams: i64, rounds: i64) -> Vec<MatchRecord> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ids: Vec<i64> = (1..=teams).collect();
        let mut matches = Vec::new();

        for round in 0..rounds {
            ids.shuffle(&mut rng);
            let season = format!("{}/{}", 2000 + round / 20, 2001 + round / 20);
            for pair in ids.chunks(2) {
                if pair.len() < 2 || rng.gen_bool(0.2) {
                    continue;
                }
                let mut m = make_match(
                    round,
                    pair[0],
                    pair[1],
                    rng.gen_range(0..5),
                    rng.gen_range(0..4),
                    &season,
                );
                m.competition = CompetitionId(if pair[0] % 3 == 0 { 7 } else { 9 });
                matches.push(m);
            }
        }
        matches
    }

    #[test]
    fn test_streaming_and_on_demand_paths_agree() {
        let matches = random_league(42, 14, 80);
        let config = FeatureConfig::default();
        let on_demand = PredictionFeatureBuilder::new(&matches, config).unwrap();
        let mut streaming = DatasetBuilder::new(&config);
        let mut compared = 0;

        for m in &matches {
            if let Ok(row) = streaming.features_for(m) {
                let expected = on_demand
                    .features_at(m.home_team, m.away_team, m.timestamp, &m.season)
                    .unwrap();
                assert_eq!(row.home_stats(), on_demand.stats_before(m.home_team, m.timestamp).unwrap());
                assert_eq!(row, expected);
                compared += 1;
            } else {
                let window = streaming.history().len(m.home_team).min(streaming.history().len(m.away_team));
                assert!(window < config.min_history);
                assert!(on_demand
                    .features_at(m.home_team, m.away_team, m.timestamp, &m.season)
                    .is_err());
            }
            streaming.process(m).unwrap();
        }

        assert!(compared > 100);
        assert_eq!(streaming.emitted(), compared);
    }
}
