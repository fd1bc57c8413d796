//! Training table construction
//!
//! One forward pass over the match log. Every row is built from history
//! strictly before its match; the match itself is folded into history only
//! after its row has been decided.

use crate::features::{
    assemble, CompetitionLog, EntityHistoryStore, FeatureVector, RollingWindow,
    WindowedStatsCalculator, COLUMNS,
};
use crate::{EntityId, FeatureConfig, FormError, MatchOutcome, MatchRecord, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Streaming builder for the training table
pub struct DatasetBuilder {
    history: EntityHistoryStore,
    competitions: CompetitionLog,
    calculator: WindowedStatsCalculator,
    rows: Vec<FeatureVector>,
    skipped: usize,
}

impl DatasetBuilder {
    pub fn new(config: &FeatureConfig) -> Self {
        DatasetBuilder {
            history: EntityHistoryStore::new(config.window),
            competitions: CompetitionLog::new(config.league_lookback),
            calculator: WindowedStatsCalculator::new(config.min_history),
            rows: Vec::new(),
            skipped: 0,
        }
    }

    /// Build the whole table from a log sorted ascending by timestamp
    pub fn build(matches: &[MatchRecord], config: &FeatureConfig) -> Result<TrainingTable> {
        config.validate()?;

        let mut builder = Self::new(config);
        for m in matches {
            builder.process(m)?;
        }

        let table = builder.finish();
        log::info!(
            "Built training table: {} rows written, {} matches skipped (window={}, min_history={})",
            table.rows.len(),
            table.skipped,
            config.window,
            config.min_history
        );
        Ok(table)
    }

    /// Handle one match: emit its row if both teams qualify, then record it
    pub fn process(&mut self, m: &MatchRecord) -> Result<()> {
        self.history.ensure(m.home_team);
        self.history.ensure(m.away_team);

        match self.features_for(m) {
            Ok(features) => self.rows.push(features.with_label(m.outcome())),
            Err(FormError::InsufficientHistory {
                entity,
                matches,
                required,
            }) => {
                log::debug!(
                    "Skipping {} vs {} on {}: {} has {}/{} matches",
                    m.home_team,
                    m.away_team,
                    m.timestamp,
                    entity,
                    matches,
                    required
                );
                self.skipped += 1;
            }
            Err(e) => return Err(e),
        }

        self.record_outcome(m);
        Ok(())
    }

    /// Pre-match features for `m`, without touching history
    ///
    /// Fails with `InsufficientHistory` when either team's window is below
    /// the minimum. The label is left unset.
    pub fn features_for(&self, m: &MatchRecord) -> Result<FeatureVector> {
        let home = self.calculator.compute(self.window(m.home_team)?)?;
        let away = self.calculator.compute(self.window(m.away_team)?)?;
        let competition = self.competitions.infer(m.home_team);

        assemble(m.home_team, &home, m.away_team, &away, competition, &m.season)
    }

    /// Fold a finished match into both teams' history
    pub fn record_outcome(&mut self, m: &MatchRecord) {
        self.history.record_match(m);
        self.competitions.record_match(m);
    }

    fn window(&self, team: EntityId) -> Result<&RollingWindow> {
        self.history
            .snapshot(team)
            .ok_or(FormError::InsufficientHistory {
                entity: team,
                matches: 0,
                required: self.calculator.min_history(),
            })
    }

    pub fn history(&self) -> &EntityHistoryStore {
        &self.history
    }

    pub fn emitted(&self) -> usize {
        self.rows.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> TrainingTable {
        TrainingTable {
            rows: self.rows,
            skipped: self.skipped,
        }
    }
}

/// Ordered training rows plus the number of matches that produced none
#[derive(Debug, Clone, Default)]
pub struct TrainingTable {
    pub rows: Vec<FeatureVector>,
    pub skipped: usize,
}

impl TrainingTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows emitted
    pub fn emitted(&self) -> usize {
        self.rows.len()
    }

    /// Write the table as CSV with a header row
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_writer(File::create(path)?);
        writer.write_record(COLUMNS)?;
        for row in &self.rows {
            writer.write_record(row.to_record())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Time-based split: earlier seasons train, `test_season` tests
    ///
    /// Season labels like `2014/2015` compare correctly as plain strings.
    /// Rows from later seasons are left out of both halves.
    pub fn split_by_season(&self, test_season: &str) -> (Vec<FeatureVector>, Vec<FeatureVector>) {
        let train = self
            .rows
            .iter()
            .filter(|r| r.season.as_str() < test_season)
            .cloned()
            .collect();
        let test = self
            .rows
            .iter()
            .filter(|r| r.season == test_season)
            .cloned()
            .collect();
        (train, test)
    }

    /// Rows per label
    pub fn label_counts(&self) -> HashMap<MatchOutcome, usize> {
        let mut counts = HashMap::new();
        for label in self.rows.iter().filter_map(|r| r.label) {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}

/// Accuracy of the trivial predictors a model has to beat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baselines {
    /// Always predicting a home win
    pub always_home: f64,
    /// Class predicted by the most-frequent-class baseline
    pub most_frequent: MatchOutcome,
    /// Always predicting `most_frequent`
    pub most_frequent_accuracy: f64,
}

impl Baselines {
    pub fn evaluate(train: &[FeatureVector], test: &[FeatureVector]) -> Self {
        let most_frequent = most_frequent_label(train).unwrap_or(MatchOutcome::HomeWin);

        Baselines {
            always_home: accuracy(test, MatchOutcome::HomeWin),
            most_frequent,
            most_frequent_accuracy: accuracy(test, most_frequent),
        }
    }
}

fn accuracy(rows: &[FeatureVector], predicted: MatchOutcome) -> f64 {
    if rows.is_empty() {
        0.0
    } else {
        let correct = rows.iter().filter(|r| r.label == Some(predicted)).count();
        correct as f64 / rows.len() as f64
    }
}

/// Most common label; ties go to the label seen first
fn most_frequent_label(rows: &[FeatureVector]) -> Option<MatchOutcome> {
    let mut tally: Vec<(MatchOutcome, usize)> = Vec::new();
    for label in rows.iter().filter_map(|r| r.label) {
        match tally.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => tally.push((label, 1)),
        }
    }

    let mut best: Option<(MatchOutcome, usize)> = None;
    for (label, count) in tally {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }
    best.map(|(l, _)| l)
}
