use serde::{Deserialize, Serialize};
use tracing::{Level, event};

use super::pool::{Rule, RulePool};
use super::quarantine::{Quarantine, QuarantineEntry};
use crate::model::suit::Suit;

pub const RULES_PER_SUIT: usize = 4;
pub const MAX_ACTIVE_RULES: usize = RULES_PER_SUIT * Suit::ALL.len();

/// The bounded working set that drives learned predictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveRuleSet {
    rules: Vec<Rule>,
}

impl ActiveRuleSet {
    /// Restores a persisted set, trimming each suit back to [`RULES_PER_SUIT`].
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let mut bounded = Vec::with_capacity(MAX_ACTIVE_RULES);
        for suit in Suit::ALL {
            let mut of_suit: Vec<Rule> = rules.iter().filter(|r| r.suit == suit).copied().collect();
            of_suit.sort_by_key(|rule| rule.rank);
            bounded.extend(of_suit.into_iter().take(RULES_PER_SUIT));
        }
        Self { rules: bounded }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn for_suit(&self, suit: Suit) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.iter().filter(move |rule| rule.suit == suit)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectOutcome {
    pub active: ActiveRuleSet,
    /// Entries taken out of quarantine to refill short suits.
    pub released: Vec<QuarantineEntry>,
}

/// Picks the top [`RULES_PER_SUIT`] non-quarantined rules of every suit.
///
/// A suit left with fewer than four candidates pulls benched triggers back
/// out of quarantine, least penalized first, until it has four or runs out.
pub fn select_active(pool: &RulePool, quarantine: &mut Quarantine) -> SelectOutcome {
    let mut outcome = SelectOutcome::default();

    for suit in Suit::ALL {
        let available = pool
            .for_suit(suit)
            .filter(|rule| !quarantine.contains(suit, rule.trigger))
            .count();

        if available < RULES_PER_SUIT {
            let candidates: Vec<QuarantineEntry> = quarantine
                .release_order(suit)
                .into_iter()
                .filter(|entry| pool.contains(suit, entry.trigger))
                .take(RULES_PER_SUIT - available)
                .collect();
            for entry in candidates {
                if let Some(released) = quarantine.release(suit, entry.trigger) {
                    event!(
                        target: "suitcast_core::rules",
                        Level::INFO,
                        trigger = %released.trigger,
                        suit = %suit,
                        strikes = released.strikes,
                        "rule released from quarantine to refill suit"
                    );
                    outcome.released.push(released);
                }
            }
        }

        outcome.active.rules.extend(
            pool.for_suit(suit)
                .filter(|rule| !quarantine.contains(suit, rule.trigger))
                .take(RULES_PER_SUIT)
                .copied(),
        );
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Observation;
    use crate::model::card::Card;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn card(raw: &str) -> Card {
        raw.parse().unwrap()
    }

    fn pool_of(pairs: &[(&str, Suit, usize)]) -> RulePool {
        let mut data = Vec::new();
        for &(trigger, suit, times) in pairs {
            for _ in 0..times {
                data.push(Observation {
                    trigger_number: 1,
                    trigger: card(trigger),
                    result_number: 3,
                    result_suit: suit,
                    observed_at: at(0),
                });
            }
        }
        RulePool::recompute(&data).expect("enough data")
    }

    #[test]
    fn keeps_at_most_four_per_suit() {
        let pool = pool_of(&[
            ("2♠", Suit::Hearts, 6),
            ("3♠", Suit::Hearts, 5),
            ("4♠", Suit::Hearts, 4),
            ("5♠", Suit::Hearts, 3),
            ("6♠", Suit::Hearts, 2),
            ("7♠", Suit::Clubs, 1),
        ]);
        let outcome = select_active(&pool, &mut Quarantine::new());
        assert_eq!(outcome.active.for_suit(Suit::Hearts).count(), 4);
        assert_eq!(outcome.active.len(), 5);
        assert!(
            outcome
                .active
                .for_suit(Suit::Hearts)
                .all(|rule| rule.trigger != card("6♠"))
        );
    }

    #[test]
    fn quarantined_trigger_yields_its_slot() {
        let pool = pool_of(&[
            ("2♠", Suit::Hearts, 6),
            ("3♠", Suit::Hearts, 5),
            ("4♠", Suit::Hearts, 4),
            ("5♠", Suit::Hearts, 3),
            ("6♠", Suit::Hearts, 2),
        ]);
        let mut quarantine = Quarantine::new();
        quarantine.insert(Suit::Hearts, card("2♠"), at(0));
        let outcome = select_active(&pool, &mut quarantine);
        let hearts: Vec<Card> = outcome
            .active
            .for_suit(Suit::Hearts)
            .map(|r| r.trigger)
            .collect();
        assert_eq!(hearts, vec![card("3♠"), card("4♠"), card("5♠"), card("6♠")]);
        assert!(outcome.released.is_empty());
        assert!(quarantine.contains(Suit::Hearts, card("2♠")));
    }

    #[test]
    fn short_suit_refills_from_least_penalized_entries() {
        let pool = pool_of(&[
            ("2♠", Suit::Diamonds, 5),
            ("3♠", Suit::Diamonds, 4),
            ("4♠", Suit::Diamonds, 3),
            ("5♠", Suit::Diamonds, 2),
            ("6♠", Suit::Diamonds, 1),
        ]);
        let mut quarantine = Quarantine::new();
        quarantine.insert(Suit::Diamonds, card("2♠"), at(0));
        quarantine.insert(Suit::Diamonds, card("2♠"), at(1));
        quarantine.insert(Suit::Diamonds, card("3♠"), at(2));
        quarantine.insert(Suit::Diamonds, card("4♠"), at(3));

        let outcome = select_active(&pool, &mut quarantine);
        let released: Vec<Card> = outcome.released.iter().map(|e| e.trigger).collect();
        assert_eq!(released, vec![card("3♠"), card("4♠")]);
        assert_eq!(outcome.active.for_suit(Suit::Diamonds).count(), 4);
        assert!(quarantine.contains(Suit::Diamonds, card("2♠")));
    }

    #[test]
    fn restore_trims_oversized_suits() {
        let pool = pool_of(&[
            ("2♠", Suit::Spades, 6),
            ("3♠", Suit::Spades, 5),
            ("4♠", Suit::Spades, 4),
            ("5♠", Suit::Spades, 3),
            ("6♠", Suit::Spades, 2),
        ]);
        let restored = ActiveRuleSet::from_rules(pool.rules().to_vec());
        assert_eq!(restored.len(), RULES_PER_SUIT);
        assert!(restored.len() <= MAX_ACTIVE_RULES);
    }
}
