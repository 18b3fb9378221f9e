use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::RESULT_OFFSET;
use crate::model::card::Card;
use crate::model::suit::Suit;
use crate::policy::RuleKind;

use super::rotation::Rotation;

/// Minimum distance between the source games of consecutive predictions.
pub const MIN_GAP: u32 = 3;
/// Length of the rolling window of predicted suits.
pub const RECENT_SUITS: usize = 3;
/// A suit already predicted this many times in the window is refused.
pub const MAX_REPEATS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Pending,
    Won,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub source: u32,
    pub target: u32,
    pub suit: Suit,
    pub trigger: Card,
    pub kind: RuleKind,
    pub status: PredictionStatus,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub resolution_offset: Option<u8>,
    /// Transport handle of the announcement, once it was delivered.
    #[serde(default)]
    pub handle: Option<u64>,
}

impl Prediction {
    pub fn is_pending(&self) -> bool {
        self.status == PredictionStatus::Pending
    }
}

/// What the gate hands back when every precondition passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub source: u32,
    pub target: u32,
    pub suit: Suit,
    pub trigger: Card,
    pub kind: RuleKind,
}

impl Proposal {
    pub fn new(source: u32, suit: Suit, trigger: Card, kind: RuleKind) -> Self {
        Self {
            source,
            target: source + RESULT_OFFSET,
            suit,
            trigger,
            kind,
        }
    }
}

/// Why no prediction was issued for an event. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    OutsideSession,
    PredictionPending { target: u32 },
    CoolingDown { until: DateTime<Utc> },
    NoGameNumber,
    TooSoon { last: u32, number: u32 },
    NoMatch,
    RepeatedSuit { suit: Suit },
    ThinSuit { suit: Suit, available: usize },
    TriggerSpent { suit: Suit, trigger: Card },
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::OutsideSession => f.write_str("outside prediction sessions"),
            Refusal::PredictionPending { target } => {
                write!(f, "prediction for game {target} still pending")
            }
            Refusal::CoolingDown { until } => write!(f, "cooling down until {until}"),
            Refusal::NoGameNumber => f.write_str("no game number"),
            Refusal::TooSoon { last, number } => {
                write!(f, "game {number} is less than {MIN_GAP} after {last}")
            }
            Refusal::NoMatch => f.write_str("no rule matched the first group"),
            Refusal::RepeatedSuit { suit } => {
                write!(f, "{} predicted too often recently", suit.name())
            }
            Refusal::ThinSuit { suit, available } => {
                write!(f, "only {available} active {} rules", suit.name())
            }
            Refusal::TriggerSpent { suit, trigger } => {
                write!(f, "{trigger} already fired for {} this cycle", suit.name())
            }
        }
    }
}

/// Pacing counters shared by every prediction the engine issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub last_predicted: Option<u32>,
    pub recent_suits: VecDeque<Suit>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub rotation: Rotation,
}

impl Pacing {
    pub fn gap_ok(&self, number: u32) -> bool {
        self.last_predicted
            .is_none_or(|last| number >= last.saturating_add(MIN_GAP))
    }

    pub fn repeats(&self, suit: Suit) -> bool {
        self.recent_suits.iter().filter(|s| **s == suit).count() >= MAX_REPEATS
    }

    pub fn cooling_down(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cooldown_until.filter(|until| now < *until)
    }

    pub fn note_issued(&mut self, source: u32, suit: Suit) {
        self.last_predicted = Some(source);
        self.recent_suits.push_back(suit);
        self.trim();
    }

    /// Keeps only the newest [`RECENT_SUITS`] entries.
    pub fn trim(&mut self) {
        while self.recent_suits.len() > RECENT_SUITS {
            self.recent_suits.pop_front();
        }
    }
}
