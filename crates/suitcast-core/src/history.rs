use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

use crate::model::card::Card;
use crate::model::suit::Suit;

/// A result always lands this many games after its trigger.
pub const RESULT_OFFSET: u32 = 2;
/// Game numbers older than `newest - HISTORY_WINDOW` are forgotten.
pub const HISTORY_WINDOW: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub card: Card,
    pub seen_at: DateTime<Utc>,
}

/// One realized trigger -> outcome pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub trigger_number: u32,
    pub trigger: Card,
    pub result_number: u32,
    pub result_suit: Suit,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Same number with the same first card was already recorded.
    Duplicate,
    /// Stored in history; no trigger two games back.
    Stored,
    /// Stored and paired with the trigger two games back.
    Observed(Observation),
}

/// Sliding window of first cards plus the permanent observation list.
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    history: BTreeMap<u32, HistoryEntry>,
    collected: BTreeSet<u32>,
    observations: Vec<Observation>,
    newest: Option<u32>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from persisted parts, re-applying the window.
    pub fn from_parts(
        history: BTreeMap<u32, HistoryEntry>,
        collected: BTreeSet<u32>,
        observations: Vec<Observation>,
    ) -> Self {
        let newest = history.keys().chain(collected.iter()).max().copied();
        let mut store = Self {
            history,
            collected,
            observations,
            newest,
        };
        store.prune();
        store
    }

    pub fn record(&mut self, number: u32, first_card: Card, now: DateTime<Utc>) -> RecordOutcome {
        if self.collected.contains(&number)
            && self
                .history
                .get(&number)
                .is_some_and(|entry| entry.card == first_card)
        {
            return RecordOutcome::Duplicate;
        }

        self.history.insert(
            number,
            HistoryEntry {
                card: first_card,
                seen_at: now,
            },
        );
        self.collected.insert(number);
        self.newest = Some(self.newest.map_or(number, |newest| newest.max(number)));

        let trigger = number
            .checked_sub(RESULT_OFFSET)
            .and_then(|n| self.history.get(&n).map(|entry| (n, entry.card)));
        let outcome = match trigger {
            Some((trigger_number, trigger)) => {
                let observation = Observation {
                    trigger_number,
                    trigger,
                    result_number: number,
                    result_suit: first_card.suit,
                    observed_at: now,
                };
                self.observations.push(observation);
                event!(
                    target: "suitcast_core::history",
                    Level::DEBUG,
                    game = number,
                    trigger = %trigger,
                    result = %first_card.suit,
                    "observation recorded"
                );
                RecordOutcome::Observed(observation)
            }
            None => RecordOutcome::Stored,
        };

        self.prune();
        outcome
    }

    /// First card seen at `number`, or `None` when unknown or outside the window.
    pub fn card_at(&self, number: u32) -> Option<Card> {
        if number < self.window_floor() {
            return None;
        }
        self.history.get(&number).map(|entry| entry.card)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn history(&self) -> &BTreeMap<u32, HistoryEntry> {
        &self.history
    }

    pub fn collected(&self) -> &BTreeSet<u32> {
        &self.collected
    }

    pub fn newest(&self) -> Option<u32> {
        self.newest
    }

    fn window_floor(&self) -> u32 {
        self.newest
            .map_or(0, |newest| newest.saturating_sub(HISTORY_WINDOW))
    }

    // Observations are the training set and are never pruned here.
    fn prune(&mut self) {
        let floor = self.window_floor();
        self.history.retain(|number, _| *number >= floor);
        self.collected.retain(|number| *number >= floor);
    }
}
