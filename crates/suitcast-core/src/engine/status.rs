use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Engine;
use super::prediction::PredictionStatus;
use super::session::SessionWindow;
use super::verify::MAX_RESOLUTION_OFFSET;
use crate::model::card::Card;
use crate::model::suit::Suit;
use crate::rules::{QuarantineEntry, Rule};

const OFFSET_SLOTS: usize = MAX_RESOLUTION_OFFSET as usize + 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PredictionTotals {
    /// Wins indexed by resolution offset.
    pub won: [u32; OFFSET_SLOTS],
    pub lost: u32,
    pub pending: u32,
}

impl PredictionTotals {
    pub fn won_total(&self) -> u32 {
        self.won.iter().sum()
    }

    pub fn resolved(&self) -> u32 {
        self.won_total() + self.lost
    }
}

/// One collected trigger of a suit, whether or not it made the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolEntry {
    pub trigger: Card,
    pub support: u32,
    pub rank: u32,
    /// Losses recorded against the trigger while it sits in quarantine; 0 otherwise.
    pub strikes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuitStatus {
    pub suit: Suit,
    pub active: Vec<Rule>,
    pub quarantined: Vec<QuarantineEntry>,
    pub pool: Vec<PoolEntry>,
    /// Next active trigger in rotation that has not fired this cycle.
    pub next_due: Option<Card>,
}

/// Point-in-time operator view of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Utc>,
    pub learned_mode: bool,
    pub session: Option<SessionWindow>,
    pub observations: usize,
    pub history: usize,
    pub pool: usize,
    pub suits: Vec<SuitStatus>,
    pub totals: PredictionTotals,
    pub pending_target: Option<u32>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl StatusReport {
    pub fn capture(engine: &Engine, now: DateTime<Utc>) -> Self {
        let mut totals = PredictionTotals::default();
        for prediction in engine.predictions() {
            match prediction.status {
                PredictionStatus::Pending => totals.pending += 1,
                PredictionStatus::Lost => totals.lost += 1,
                PredictionStatus::Won => {
                    let slot = prediction
                        .resolution_offset
                        .map_or(0, |offset| usize::from(offset).min(OFFSET_SLOTS - 1));
                    totals.won[slot] += 1;
                }
            }
        }

        let suits = Suit::ALL
            .into_iter()
            .map(|suit| SuitStatus {
                suit,
                active: engine.active_rules().for_suit(suit).copied().collect(),
                quarantined: engine.quarantine().for_suit(suit).copied().collect(),
                pool: engine
                    .pool()
                    .for_suit(suit)
                    .map(|rule| PoolEntry {
                        trigger: rule.trigger,
                        support: rule.support,
                        rank: rule.rank,
                        strikes: engine
                            .quarantine()
                            .for_suit(suit)
                            .find(|entry| entry.trigger == rule.trigger)
                            .map_or(0, |entry| entry.strikes),
                    })
                    .collect(),
                next_due: engine
                    .pacing()
                    .rotation
                    .next_due(suit, engine.active_rules()),
            })
            .collect();

        Self {
            generated_at: now,
            learned_mode: engine.learned_mode(),
            session: engine.config().sessions.current(now),
            observations: engine.store().observations().len(),
            history: engine.store().history().len(),
            pool: engine.pool().len(),
            suits,
            totals,
            pending_target: engine.pending().map(|prediction| prediction.target),
            last_refresh: engine.last_refresh(),
            cooldown_until: engine.pacing().cooling_down(now),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.learned_mode { "learned" } else { "static" };
        writeln!(f, "mode: {mode}")?;
        match self.session {
            Some(window) => writeln!(f, "session: {}", window.label())?,
            None => writeln!(f, "session: closed")?,
        }
        writeln!(
            f,
            "observations: {} (history {}, pool {})",
            self.observations, self.history, self.pool
        )?;
        for suit in &self.suits {
            write!(f, "{}", suit.suit)?;
            if suit.active.is_empty() {
                write!(f, " -")?;
            }
            for rule in &suit.active {
                write!(f, " {}({})", rule.trigger, rule.support)?;
            }
            if !suit.quarantined.is_empty() {
                write!(f, " | quarantined:")?;
                for entry in &suit.quarantined {
                    write!(f, " {}x{}", entry.trigger, entry.strikes)?;
                }
            }
            if let Some(next) = suit.next_due {
                write!(f, " | next {next}")?;
            }
            writeln!(f)?;
            if !suit.pool.is_empty() {
                write!(f, "  pool:")?;
                for entry in &suit.pool {
                    write!(f, " #{} {}({})", entry.rank, entry.trigger, entry.support)?;
                    if entry.strikes > 0 {
                        write!(f, "[q{}]", entry.strikes)?;
                    }
                }
                writeln!(f)?;
            }
        }
        let won = self
            .totals
            .won
            .iter()
            .enumerate()
            .map(|(offset, count)| format!("+{offset}:{count}"))
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            f,
            "won {} [{won}] lost {} pending {}",
            self.totals.won_total(),
            self.totals.lost,
            self.totals.pending
        )?;
        if let Some(target) = self.pending_target {
            write!(f, " (awaiting game {target})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, Pacing, SessionWindows};
    use crate::history::ObservationStore;
    use crate::rules::{ActiveRuleSet, Quarantine, RulePool};
    use chrono::{Duration, TimeZone};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap() + Duration::minutes(minute)
    }

    #[test]
    fn counts_outcomes_by_offset() {
        let mut engine = Engine::new(EngineConfig {
            sessions: SessionWindows::always(),
            ..EngineConfig::default()
        });
        engine.handle("#N100. (9♣)", false, at(0));
        engine.handle("#N103. ✅ (A♥)", false, at(1));

        let report = engine.status(at(2));
        assert_eq!(report.totals.won, [0, 1, 0]);
        assert_eq!(report.totals.lost, 0);
        assert_eq!(report.suits.len(), 4);
        assert!(!report.learned_mode);
    }

    #[test]
    fn lists_every_collected_trigger_with_quarantine_strikes() {
        let card = |raw: &str| -> Card { raw.parse().unwrap() };
        let rule = |trigger: &str, suit, support, rank| Rule {
            trigger: card(trigger),
            suit,
            support,
            rank,
        };
        let pool = RulePool::from_rules(vec![
            rule("9♣", Suit::Hearts, 3, 1),
            rule("K♦", Suit::Hearts, 1, 2),
            rule("2♠", Suit::Clubs, 2, 1),
        ]);
        let active = ActiveRuleSet::from_rules(vec![
            rule("K♦", Suit::Hearts, 1, 2),
            rule("2♠", Suit::Clubs, 2, 1),
        ]);
        let mut quarantine = Quarantine::new();
        quarantine.insert(Suit::Hearts, card("9♣"), at(0));
        quarantine.insert(Suit::Hearts, card("9♣"), at(1));

        let engine = Engine::from_parts(
            EngineConfig::default(),
            ObservationStore::new(),
            pool,
            active,
            quarantine,
            Vec::new(),
            Pacing::default(),
            true,
            Some(at(0)),
        );
        let report = engine.status(at(2));
        let hearts = &report.suits[Suit::Hearts.index()];
        assert_eq!(
            hearts.pool,
            vec![
                PoolEntry {
                    trigger: card("9♣"),
                    support: 3,
                    rank: 1,
                    strikes: 2,
                },
                PoolEntry {
                    trigger: card("K♦"),
                    support: 1,
                    rank: 2,
                    strikes: 0,
                },
            ]
        );
        assert_eq!(hearts.next_due, Some(card("K♦")));
        assert!(report.suits[Suit::Spades.index()].pool.is_empty());

        let text = report.to_string();
        let listing = format!("pool: #1 {}(3)[q2] #2 {}(1)", card("9♣"), card("K♦"));
        assert!(text.contains(&listing));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["suits"][1]["pool"][0]["strikes"], 2);
    }

    #[test]
    fn display_mentions_pending_target() {
        let mut engine = Engine::new(EngineConfig {
            sessions: SessionWindows::always(),
            ..EngineConfig::default()
        });
        engine.handle("#N100. (9♣)", false, at(0));
        let text = engine.status(at(1)).to_string();
        assert!(text.contains("mode: static"));
        assert!(text.contains("awaiting game 102"));
    }
}
