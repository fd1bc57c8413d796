//! Competition inference
//!
//! A team's current competition is the one it played most often over its
//! last few matches. Ties go to the competition seen first, scanning from the
//! oldest of those matches forward.

use crate::{CompetitionId, EntityId, MatchRecord};
use chrono::NaiveDateTime;
use std::collections::{HashMap, VecDeque};

/// Majority vote over competitions given oldest first
fn majority_vote<I>(competitions: I) -> CompetitionId
where
    I: IntoIterator<Item = CompetitionId>,
{
    // (competition, count) in order of first appearance
    let mut tally: Vec<(CompetitionId, usize)> = Vec::new();
    for competition in competitions {
        match tally.iter_mut().find(|(c, _)| *c == competition) {
            Some((_, count)) => *count += 1,
            None => tally.push((competition, 1)),
        }
    }

    let mut best: Option<(CompetitionId, usize)> = None;
    for (competition, count) in tally {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((competition, count));
        }
    }

    best.map(|(c, _)| c).unwrap_or(CompetitionId::UNKNOWN)
}

/// Infers a team's competition from the raw match log
#[derive(Debug, Clone, Copy)]
pub struct LeagueInferrer {
    lookback: usize,
}

impl LeagueInferrer {
    pub fn new(lookback: usize) -> Self {
        LeagueInferrer { lookback }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Vote over the last `lookback` matches of `team` strictly before `cutoff`
    ///
    /// `history` must be sorted ascending by timestamp. Returns
    /// [`CompetitionId::UNKNOWN`] when the team has no earlier match.
    pub fn infer(
        &self,
        history: &[MatchRecord],
        team: EntityId,
        cutoff: NaiveDateTime,
    ) -> CompetitionId {
        let mut recent: VecDeque<CompetitionId> = VecDeque::with_capacity(self.lookback);
        for m in history
            .iter()
            .filter(|m| m.timestamp < cutoff && m.involves(team))
        {
            if recent.len() >= self.lookback {
                recent.pop_front();
            }
            recent.push_back(m.competition);
        }

        majority_vote(recent)
    }
}

/// Streaming counterpart of [`LeagueInferrer`]
///
/// Keeps each team's last `lookback` competitions as matches are fed in, so a
/// forward pass can vote without rescanning the log.
#[derive(Debug, Clone)]
pub struct CompetitionLog {
    lookback: usize,
    recent: HashMap<EntityId, VecDeque<CompetitionId>>,
}

impl CompetitionLog {
    pub fn new(lookback: usize) -> Self {
        CompetitionLog {
            lookback,
            recent: HashMap::new(),
        }
    }

    /// Record a finished match for both teams
    pub fn record_match(&mut self, record: &MatchRecord) {
        self.push(record.home_team, record.competition);
        self.push(record.away_team, record.competition);
    }

    fn push(&mut self, team: EntityId, competition: CompetitionId) {
        let recent = self.recent.entry(team).or_default();
        if recent.len() >= self.lookback {
            recent.pop_front();
        }
        recent.push_back(competition);
    }

    /// Vote over everything recorded so far for `team`
    pub fn infer(&self, team: EntityId) -> CompetitionId {
        match self.recent.get(&team) {
            Some(recent) => majority_vote(recent.iter().copied()),
            None => CompetitionId::UNKNOWN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(day: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(day)
    }

    fn make_match(day: i64, home: i64, away: i64, competition: i64) -> MatchRecord {
        MatchRecord {
            timestamp: at(day),
            home_team: EntityId(home),
            away_team: EntityId(away),
            home_goals: 1,
            away_goals: 0,
            competition: CompetitionId(competition),
            season: "2014/2015".to_string(),
        }
    }

    #[test]
    fn test_most_frequent_competition() {
        let history = vec![
            make_match(0, 1, 2, 10),
            make_match(1, 3, 1, 20),
            make_match(2, 1, 4, 20),
            make_match(3, 5, 6, 30),
        ];
        let inferrer = LeagueInferrer::new(30);
        assert_eq!(inferrer.infer(&history, EntityId(1), at(10)), CompetitionId(20));
    }

    #[test]
    fn test_no_history_is_unknown() {
        let history = vec![make_match(5, 1, 2, 10)];
        let inferrer = LeagueInferrer::new(30);

        assert!(inferrer.infer(&history, EntityId(9), at(10)).is_unknown());
        // The cutoff itself is excluded
        assert!(inferrer.infer(&history, EntityId(1), at(5)).is_unknown());
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        // Two matches each in 40 and 7; 40 appears first in time
        let history = vec![
            make_match(0, 1, 2, 40),
            make_match(1, 1, 3, 7),
            make_match(2, 4, 1, 7),
            make_match(3, 1, 5, 40),
        ];
        let inferrer = LeagueInferrer::new(30);
        assert_eq!(inferrer.infer(&history, EntityId(1), at(10)), CompetitionId(40));

        let mut log = CompetitionLog::new(30);
        for m in &history {
            log.record_match(m);
        }
        assert_eq!(log.infer(EntityId(1)), CompetitionId(40));
    }

    #[test]
    fn test_lookback_limits_the_vote() {
        // Old matches in competition 1, the last three in competition 2
        let mut history = Vec::new();
        for day in 0..5 {
            history.push(make_match(day, 1, 2, 1));
        }
        for day in 5..8 {
            history.push(make_match(day, 1, 2, 2));
        }

        assert_eq!(LeagueInferrer::new(30).infer(&history, EntityId(1), at(20)), CompetitionId(1));
        assert_eq!(LeagueInferrer::new(3).infer(&history, EntityId(1), at(20)), CompetitionId(2));
    }

    #[test]
    fn test_streaming_log_agrees_with_scan() {
        let history: Vec<MatchRecord> = (0..60)
            .map(|day| make_match(day, day % 3, 3 + day % 2, 100 + (day / 7) % 3))
            .collect();
        let inferrer = LeagueInferrer::new(30);
        let mut log = CompetitionLog::new(30);

        for m in &history {
            for team in [m.home_team, m.away_team] {
                assert_eq!(log.infer(team), inferrer.infer(&history, team, m.timestamp));
            }
            log.record_match(m);
        }
    }
}
