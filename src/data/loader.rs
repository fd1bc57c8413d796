//! CSV loading for the match and team tables
//!
//! Rows with missing or unparsable fields are dropped and counted; a missing
//! required column fails the whole load.

use crate::{CompetitionId, EntityId, FormError, MatchRecord, Result, Team};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Matches that survived parsing, plus the number of rows dropped
#[derive(Debug, Clone, Default)]
pub struct LoadedMatches {
    pub matches: Vec<MatchRecord>,
    pub skipped: usize,
}

/// Load `Match.csv`, sorted ascending by timestamp
pub fn load_matches<P: AsRef<Path>>(path: P) -> Result<LoadedMatches> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        FormError::Config(format!("Match file not found: {} ({})", path.display(), e))
    })?;
    let loaded = read_matches(file)?;

    if loaded.skipped > 0 {
        log::warn!(
            "Dropped {} malformed match rows from {}",
            loaded.skipped,
            path.display()
        );
    }
    log::info!("Loaded {} matches from {}", loaded.matches.len(), path.display());
    Ok(loaded)
}

/// Parse match rows from any reader
pub fn read_matches<R: Read>(reader: R) -> Result<LoadedMatches> {
    let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
    let header = csv.headers()?.clone();

    let columns = MatchColumns::from_header(&header)?;
    let mut loaded = LoadedMatches::default();

    for result in csv.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::debug!("Unreadable match row: {}", e);
                loaded.skipped += 1;
                continue;
            }
        };

        match columns.parse(&record) {
            Some(m) => loaded.matches.push(m),
            None => {
                log::debug!(
                    "Skipping malformed match row at line {}",
                    record.position().map(|p| p.line()).unwrap_or(0)
                );
                loaded.skipped += 1;
            }
        }
    }

    // Stable: rows sharing a timestamp keep their file order
    loaded.matches.sort_by_key(|m| m.timestamp);
    Ok(loaded)
}

/// Load `Team.csv`, deduplicated by id and sorted by long name
pub fn load_teams<P: AsRef<Path>>(path: P) -> Result<Vec<Team>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        FormError::Config(format!("Team file not found: {} ({})", path.display(), e))
    })?;
    let teams = read_teams(file)?;
    log::info!("Loaded {} teams from {}", teams.len(), path.display());
    Ok(teams)
}

/// Parse team rows from any reader
pub fn read_teams<R: Read>(reader: R) -> Result<Vec<Team>> {
    let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
    let header = csv.headers()?.clone();

    let idx_id = column(&header, "team_api_id")?;
    let idx_long = column(&header, "team_long_name")?;
    let idx_short = column(&header, "team_short_name")?;

    let mut seen = HashSet::new();
    let mut teams = Vec::new();

    for record in csv.records().filter_map(|r| r.ok()) {
        let Some(id) = field(&record, idx_id).and_then(|s| s.parse::<i64>().ok()) else {
            continue;
        };
        let Some(long_name) = field(&record, idx_long) else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }

        teams.push(Team {
            id: EntityId(id),
            long_name: long_name.to_string(),
            short_name: field(&record, idx_short).unwrap_or_default().to_string(),
        });
    }

    teams.sort_by(|a, b| a.long_name.cmp(&b.long_name));
    Ok(teams)
}

/// Distinct season labels, ascending
pub fn seasons(matches: &[MatchRecord]) -> Vec<String> {
    let mut seasons: Vec<String> = matches
        .iter()
        .map(|m| m.season.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    seasons.sort();
    seasons
}

/// Accepts `2008-08-17 00:00:00` or a bare `2008-08-17`
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Positions of the required match columns
struct MatchColumns {
    date: usize,
    home: usize,
    away: usize,
    home_goals: usize,
    away_goals: usize,
    league: usize,
    season: usize,
}

impl MatchColumns {
    fn from_header(header: &StringRecord) -> Result<Self> {
        Ok(MatchColumns {
            date: column(header, "date")?,
            home: column(header, "home_team_api_id")?,
            away: column(header, "away_team_api_id")?,
            home_goals: column(header, "home_team_goal")?,
            away_goals: column(header, "away_team_goal")?,
            league: column(header, "league_id")?,
            season: column(header, "season")?,
        })
    }

    fn parse(&self, record: &StringRecord) -> Option<MatchRecord> {
        Some(MatchRecord {
            timestamp: parse_timestamp(field(record, self.date)?)?,
            home_team: EntityId(field(record, self.home)?.parse().ok()?),
            away_team: EntityId(field(record, self.away)?.parse().ok()?),
            home_goals: field(record, self.home_goals)?.parse().ok()?,
            away_goals: field(record, self.away_goals)?.parse().ok()?,
            competition: CompetitionId(field(record, self.league)?.parse().ok()?),
            season: field(record, self.season)?.to_string(),
        })
    }
}

fn column(header: &StringRecord, name: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| FormError::MalformedRecord {
            line: 1,
            message: format!("column '{}' not found in CSV header", name),
        })
}

/// Trimmed, non-empty field
fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MATCHES: &str = "\
id,country_id,league_id,season,stage,date,match_api_id,home_team_api_id,away_team_api_id,home_team_goal,away_team_goal
2,1,1,2008/2009,1,2008-08-17 00:00:00,492474,10000,9994,0,0
1,1,1,2008/2009,1,2008-08-16 00:00:00,492473,9987,9993,1,1
3,1,1,2008/2009,1,2008-08-16 00:00:00,492475,9984,8635,,3
4,1,1,2008/2009,1,not a date,492476,9991,9998,5,0
5,1729,1729,2008/2009,1,2008-08-17,489042,10260,10261,1,1
";

    #[test]
    fn test_read_matches() {
        let loaded = read_matches(MATCHES.as_bytes()).unwrap();

        assert_eq!(loaded.matches.len(), 3);
        assert_eq!(loaded.skipped, 2);

        let first = &loaded.matches[0];
        assert_eq!(first.home_team, EntityId(9987));
        assert_eq!(first.away_team, EntityId(9993));
        assert_eq!(first.timestamp, parse_timestamp("2008-08-16").unwrap());
        assert_eq!(first.season, "2008/2009");

        // Same timestamp keeps file order
        assert_eq!(loaded.matches[1].home_team, EntityId(10000));
        assert_eq!(loaded.matches[2].competition, CompetitionId(1729));
        assert!(loaded
            .matches
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_missing_column() {
        let err = read_matches("date,home_team_api_id\n2008-08-16,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, FormError::MalformedRecord { .. }));
    }

    #[test]
    fn test_header_is_case_insensitive() {
        let csv = "DATE,Home_Team_Api_Id,AWAY_TEAM_API_ID,home_team_goal,away_team_goal,League_Id,Season\n\
                   2010-01-02 00:00:00,1,2,3,0,7,2009/2010\n";
        let loaded = read_matches(csv.as_bytes()).unwrap();
        assert_eq!(loaded.matches.len(), 1);
        assert_eq!(loaded.matches[0].home_goals, 3);
    }

    #[test]
    fn test_load_teams_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Team.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "id,team_api_id,team_fifa_api_id,team_long_name,team_short_name").unwrap();
        writeln!(file, "1,9987,673,KRC Genk,GEN").unwrap();
        writeln!(file, "2,9993,675,Beerschot AC,BAC").unwrap();
        writeln!(file, "3,9987,673,KRC Genk duplicate,GEN").unwrap();
        writeln!(file, "4,abc,1,Broken,BRK").unwrap();
        writeln!(file, "5,8635,2,,AND").unwrap();
        drop(file);

        let teams = load_teams(&path).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].long_name, "Beerschot AC");
        assert_eq!(teams[1].id, EntityId(9987));
        assert_eq!(teams[1].short_name, "GEN");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_matches("/nonexistent/Match.csv"),
            Err(FormError::Config(_))
        ));
    }

    #[test]
    fn test_seasons_sorted_and_distinct() {
        let loaded = read_matches(MATCHES.as_bytes()).unwrap();
        let mut matches = loaded.matches;
        matches[0].season = "2009/2010".to_string();
        assert_eq!(seasons(&matches), vec!["2008/2009", "2009/2010"]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2015-05-17 00:00:00").unwrap();
        let b = parse_timestamp("2015-05-17").unwrap();
        let c = parse_timestamp("2015-05-17T00:00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(parse_timestamp("17/05/2015").is_none());
    }
}
