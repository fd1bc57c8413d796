//! Per-team rolling match history
//!
//! Bounded windows of each team's most recent outcomes, evicted FIFO.

use crate::{EntityId, MatchRecord};
use std::collections::{HashMap, VecDeque};

/// Result of one match from one team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeStat {
    pub goals_for: u16,
    pub goals_against: u16,
    /// 3 for a win, 1 for a draw, 0 for a loss
    pub points: u8,
}

impl OutcomeStat {
    pub const WIN_POINTS: u8 = 3;
    pub const DRAW_POINTS: u8 = 1;

    pub fn new(goals_for: u16, goals_against: u16) -> Self {
        let points = match goals_for.cmp(&goals_against) {
            std::cmp::Ordering::Greater => Self::WIN_POINTS,
            std::cmp::Ordering::Equal => Self::DRAW_POINTS,
            std::cmp::Ordering::Less => 0,
        };
        OutcomeStat {
            goals_for,
            goals_against,
            points,
        }
    }

    /// Derive the stat for `team`, or None if it did not play in `record`
    pub fn for_entity(record: &MatchRecord, team: EntityId) -> Option<Self> {
        Some(Self::new(record.goals_for(team)?, record.goals_against(team)?))
    }

    pub fn is_win(&self) -> bool {
        self.points == Self::WIN_POINTS
    }
}

/// A team's most recent outcomes, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    entity: EntityId,
    capacity: usize,
    entries: VecDeque<OutcomeStat>,
}

impl RollingWindow {
    pub fn new(entity: EntityId, capacity: usize) -> Self {
        RollingWindow {
            entity,
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an outcome, evicting the oldest one when full
    pub fn push(&mut self, stat: OutcomeStat) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(stat);
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &OutcomeStat> {
        self.entries.iter()
    }

    pub fn wins(&self) -> usize {
        self.entries.iter().filter(|s| s.is_win()).count()
    }
}

/// Rolling windows for every team seen so far
///
/// Scoped to a single dataset build or a single prediction request; nothing
/// is shared between passes.
#[derive(Debug, Clone)]
pub struct EntityHistoryStore {
    capacity: usize,
    windows: HashMap<EntityId, RollingWindow>,
}

impl EntityHistoryStore {
    pub fn new(capacity: usize) -> Self {
        EntityHistoryStore {
            capacity,
            windows: HashMap::new(),
        }
    }

    /// Create an empty window for `team` if it has none yet
    pub fn ensure(&mut self, team: EntityId) -> &mut RollingWindow {
        let capacity = self.capacity;
        self.windows
            .entry(team)
            .or_insert_with(|| RollingWindow::new(team, capacity))
    }

    /// Append an outcome to a team's window
    pub fn push(&mut self, team: EntityId, stat: OutcomeStat) {
        self.ensure(team).push(stat);
    }

    /// Push both sides of a finished match
    pub fn record_match(&mut self, record: &MatchRecord) {
        self.push(
            record.home_team,
            OutcomeStat::new(record.home_goals, record.away_goals),
        );
        self.push(
            record.away_team,
            OutcomeStat::new(record.away_goals, record.home_goals),
        );
    }

    /// Current window for a team, if one exists
    pub fn snapshot(&self, team: EntityId) -> Option<&RollingWindow> {
        self.windows.get(&team)
    }

    /// Number of outcomes currently held for a team
    pub fn len(&self, team: EntityId) -> usize {
        self.windows.get(&team).map(|w| w.len()).unwrap_or(0)
    }

    pub fn entity_count(&self) -> usize {
        self.windows.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn windows(&self) -> impl Iterator<Item = &RollingWindow> {
        self.windows.values()
    }
}
