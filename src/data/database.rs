//! SQLite storage for teams and matches

use crate::{CompetitionId, EntityId, FormError, MatchRecord, Result, Team};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY,
                long_name TEXT NOT NULL,
                short_name TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                home_team_id INTEGER NOT NULL,
                away_team_id INTEGER NOT NULL,
                home_goals INTEGER NOT NULL,
                away_goals INTEGER NOT NULL,
                league_id INTEGER NOT NULL,
                season TEXT NOT NULL,
                UNIQUE(timestamp, home_team_id, away_team_id)
            );

            CREATE INDEX IF NOT EXISTS idx_matches_timestamp ON matches(timestamp);
            CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
            CREATE INDEX IF NOT EXISTS idx_teams_long_name ON teams(long_name);
            "#,
        )?;
        Ok(())
    }

    // ==================== Team Operations ====================

    /// Insert or update a team, keyed by its API id
    pub fn upsert_team(&self, team: &Team) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO teams (id, long_name, short_name) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                long_name = excluded.long_name,
                short_name = excluded.short_name
            "#,
            params![team.id.0, team.long_name, team.short_name],
        )?;
        Ok(())
    }

    /// Insert multiple teams in one transaction
    pub fn upsert_teams(&mut self, teams: &[Team]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO teams (id, long_name, short_name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                     long_name = excluded.long_name,
                     short_name = excluded.short_name",
            )?;
            for team in teams {
                stmt.execute(params![team.id.0, team.long_name, team.short_name])?;
            }
        }
        tx.commit()?;
        Ok(teams.len())
    }

    /// Get team by ID
    pub fn get_team(&self, id: EntityId) -> Result<Team> {
        self.conn
            .query_row(
                "SELECT id, long_name, short_name FROM teams WHERE id = ?1",
                params![id.0],
                Self::row_to_team,
            )
            .optional()?
            .ok_or_else(|| FormError::UnknownTeam(id.to_string()))
    }

    /// Find a team by long or short name, case-insensitive
    pub fn find_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        let name_lower = name.trim().to_lowercase();

        let team = self
            .conn
            .query_row(
                "SELECT id, long_name, short_name FROM teams WHERE LOWER(long_name) = ?1
                 ORDER BY id LIMIT 1",
                params![&name_lower],
                Self::row_to_team,
            )
            .optional()?;

        if team.is_some() {
            return Ok(team);
        }

        // Short names are not unique, so only fall back to them
        Ok(self
            .get_all_teams()?
            .into_iter()
            .find(|t| t.matches_name(name)))
    }

    /// Get all teams, ordered by long name
    pub fn get_all_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, long_name, short_name FROM teams ORDER BY long_name, id")?;

        let teams = stmt
            .query_map([], Self::row_to_team)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(teams)
    }

    fn row_to_team(row: &rusqlite::Row) -> rusqlite::Result<Team> {
        Ok(Team {
            id: EntityId(row.get(0)?),
            long_name: row.get(1)?,
            short_name: row.get(2)?,
        })
    }

    // ==================== Match Operations ====================

    /// Insert or update a match record
    pub fn upsert_match(&self, record: &MatchRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO matches (timestamp, home_team_id, away_team_id, home_goals, away_goals,
                                 league_id, season)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(timestamp, home_team_id, away_team_id) DO UPDATE SET
                home_goals = excluded.home_goals,
                away_goals = excluded.away_goals,
                league_id = excluded.league_id,
                season = excluded.season
            "#,
            params![
                record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                record.home_team.0,
                record.away_team.0,
                record.home_goals,
                record.away_goals,
                record.competition.0,
                record.season,
            ],
        )?;
        Ok(())
    }

    /// Insert multiple match records in one transaction
    pub fn upsert_matches(&mut self, records: &[MatchRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO matches (timestamp, home_team_id, away_team_id, home_goals, away_goals,
                                      league_id, season)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(timestamp, home_team_id, away_team_id) DO UPDATE SET
                     home_goals = excluded.home_goals,
                     away_goals = excluded.away_goals,
                     league_id = excluded.league_id,
                     season = excluded.season",
            )?;
            for record in records {
                stmt.execute(params![
                    record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    record.home_team.0,
                    record.away_team.0,
                    record.home_goals,
                    record.away_goals,
                    record.competition.0,
                    record.season,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Get all matches in chronological order; ties keep insertion order
    pub fn get_all_matches(&self) -> Result<Vec<MatchRecord>> {
        self.get_matches_query(
            "SELECT timestamp, home_team_id, away_team_id, home_goals, away_goals, league_id, season
             FROM matches
             ORDER BY timestamp, id",
            params![],
        )
    }

    /// Get matches for a team
    pub fn get_team_matches(&self, team_id: EntityId) -> Result<Vec<MatchRecord>> {
        self.get_matches_query(
            "SELECT timestamp, home_team_id, away_team_id, home_goals, away_goals, league_id, season
             FROM matches
             WHERE home_team_id = ?1 OR away_team_id = ?1
             ORDER BY timestamp, id",
            params![team_id.0],
        )
    }

    /// Distinct season labels, ascending
    pub fn seasons(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT season FROM matches ORDER BY season")?;
        let seasons = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(seasons)
    }

    fn get_matches_query<P: rusqlite::Params>(
        &self,
        query: &str,
        params: P,
    ) -> Result<Vec<MatchRecord>> {
        let mut stmt = self.conn.prepare(query)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, u16>(3)?,
                    row.get::<_, u16>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(ts, home, away, home_goals, away_goals, league, season)| {
                let timestamp = NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT)
                    .map_err(|e| FormError::Parse(format!("bad timestamp '{}': {}", ts, e)))?;
                Ok(MatchRecord {
                    timestamp,
                    home_team: EntityId(home),
                    away_team: EntityId(away),
                    home_goals,
                    away_goals,
                    competition: CompetitionId(league),
                    season,
                })
            })
            .collect()
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let team_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?;

        let match_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;

        let season_count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT season) FROM matches",
            [],
            |row| row.get(0),
        )?;

        let min_ts: Option<String> = self
            .conn
            .query_row("SELECT MIN(timestamp) FROM matches", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_ts: Option<String> = self
            .conn
            .query_row("SELECT MAX(timestamp) FROM matches", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            team_count: team_count as usize,
            match_count: match_count as usize,
            season_count: season_count as usize,
            earliest_match: min_ts
                .and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok()),
            latest_match: max_ts
                .and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub match_count: usize,
    pub season_count: usize,
    pub earliest_match: Option<NaiveDateTime>,
    pub latest_match: Option<NaiveDateTime>,
}
