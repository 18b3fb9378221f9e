use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::history::Observation;
use crate::model::card::Card;
use crate::model::suit::Suit;

/// Below this many observations the ranking is too sparse to use.
pub const MIN_OBSERVATIONS: usize = 3;

/// A learned trigger -> suit association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub trigger: Card,
    pub suit: Suit,
    /// Number of observations supporting the pair.
    pub support: u32,
    /// 1 is the most frequent trigger within `suit`.
    pub rank: u32,
}

/// The full ranked candidate pool, grouped by suit in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RulePool {
    rules: Vec<Rule>,
}

impl RulePool {
    /// Ranks every trigger per result suit; `None` below [`MIN_OBSERVATIONS`].
    ///
    /// Ties keep the order in which triggers were first seen for that suit.
    pub fn recompute(observations: &[Observation]) -> Option<Self> {
        if observations.len() < MIN_OBSERVATIONS {
            return None;
        }

        let mut counts: [Vec<(Card, u32)>; 4] = Default::default();
        let mut slots: [HashMap<Card, usize>; 4] = Default::default();
        for obs in observations {
            let idx = obs.result_suit.index();
            match slots[idx].get(&obs.trigger).copied() {
                Some(slot) => counts[idx][slot].1 += 1,
                None => {
                    slots[idx].insert(obs.trigger, counts[idx].len());
                    counts[idx].push((obs.trigger, 1));
                }
            }
        }

        let mut rules = Vec::new();
        for suit in Suit::ALL {
            let triggers = &mut counts[suit.index()];
            triggers.sort_by(|a, b| b.1.cmp(&a.1));
            rules.extend(
                triggers
                    .iter()
                    .enumerate()
                    .map(|(pos, &(trigger, support))| Rule {
                        trigger,
                        suit,
                        support,
                        rank: pos as u32 + 1,
                    }),
            );
        }
        Some(Self { rules })
    }

    /// Restores a persisted pool, re-establishing suit/rank order.
    pub fn from_rules(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|rule| (rule.suit.index(), rule.rank));
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn for_suit(&self, suit: Suit) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.iter().filter(move |rule| rule.suit == suit)
    }

    pub fn contains(&self, suit: Suit, trigger: Card) -> bool {
        self.for_suit(suit).any(|rule| rule.trigger == trigger)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn card(raw: &str) -> Card {
        raw.parse().unwrap()
    }

    fn obs(trigger: &str, suit: Suit) -> Observation {
        Observation {
            trigger_number: 1,
            trigger: card(trigger),
            result_number: 3,
            result_suit: suit,
            observed_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn refuses_sparse_data() {
        let sparse = vec![obs("5♣", Suit::Hearts), obs("9♦", Suit::Hearts)];
        assert!(RulePool::recompute(&sparse).is_none());
    }

    #[test]
    fn ties_keep_discovery_order() {
        let mut data = Vec::new();
        for _ in 0..3 {
            data.push(obs("5♣", Suit::Hearts));
        }
        for _ in 0..3 {
            data.push(obs("9♦", Suit::Hearts));
        }
        let pool = RulePool::recompute(&data).unwrap();
        let hearts: Vec<_> = pool.for_suit(Suit::Hearts).collect();
        assert_eq!(hearts[0].trigger, card("5♣"));
        assert_eq!(hearts[0].rank, 1);
        assert_eq!(hearts[1].trigger, card("9♦"));
        assert_eq!(hearts[1].rank, 2);
    }

    #[test]
    fn ranks_by_support_within_each_suit() {
        let data = vec![
            obs("2♠", Suit::Clubs),
            obs("K♦", Suit::Clubs),
            obs("K♦", Suit::Clubs),
            obs("A♥", Suit::Spades),
        ];
        let pool = RulePool::recompute(&data).unwrap();
        assert_eq!(pool.len(), 3);
        let clubs: Vec<_> = pool.for_suit(Suit::Clubs).collect();
        assert_eq!(clubs[0].trigger, card("K♦"));
        assert_eq!(clubs[0].support, 2);
        assert_eq!(clubs[1].rank, 2);
        // spades come first in priority order
        assert_eq!(pool.rules()[0].suit, Suit::Spades);
    }
}
