//! Round-robin use of the learned rules of each suit.
//!
//! A learned trigger fires at most once per cycle. The cycle of a suit ends
//! when every active trigger of that suit has fired, and a refresh starts a
//! new cycle for all suits.

use serde::{Deserialize, Serialize};

use crate::model::card::Card;
use crate::model::suit::Suit;
use crate::rules::{ActiveRuleSet, RULES_PER_SUIT};

/// Why a learned match may not fire right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationBlock {
    /// The suit has fewer than [`RULES_PER_SUIT`] active rules.
    ThinSuit { available: usize },
    /// The trigger already fired in the current cycle.
    Spent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotation {
    /// Per suit, index into that suit's active rules of the next one due.
    cursors: [usize; 4],
    /// Per suit, triggers fired in the current cycle.
    used: [Vec<Card>; 4],
}

impl Rotation {
    pub fn admit(
        &self,
        suit: Suit,
        trigger: Card,
        active: &ActiveRuleSet,
    ) -> Result<(), RotationBlock> {
        let available = active.for_suit(suit).count();
        if available < RULES_PER_SUIT {
            return Err(RotationBlock::ThinSuit { available });
        }
        if self.is_used(suit, trigger) {
            return Err(RotationBlock::Spent);
        }
        Ok(())
    }

    /// Marks `trigger` as fired and moves the cursor past it. Once every active
    /// trigger of the suit fired, the suit starts a new cycle.
    pub fn note_used(&mut self, suit: Suit, trigger: Card, active: &ActiveRuleSet) {
        let idx = suit.index();
        if !self.used[idx].contains(&trigger) {
            self.used[idx].push(trigger);
        }

        let triggers: Vec<Card> = active.for_suit(suit).map(|rule| rule.trigger).collect();
        if let Some(pos) = triggers.iter().position(|t| *t == trigger) {
            self.cursors[idx] = (pos + 1) % triggers.len();
        }
        if !triggers.is_empty() && triggers.iter().all(|t| self.used[idx].contains(t)) {
            self.used[idx].clear();
        }
    }

    /// First trigger at or after the cursor that has not fired this cycle.
    pub fn next_due(&self, suit: Suit, active: &ActiveRuleSet) -> Option<Card> {
        let triggers: Vec<Card> = active.for_suit(suit).map(|rule| rule.trigger).collect();
        let start = self.cursors[suit.index()];
        (0..triggers.len())
            .map(|step| triggers[(start + step) % triggers.len()])
            .find(|trigger| !self.is_used(suit, *trigger))
    }

    pub fn is_used(&self, suit: Suit, trigger: Card) -> bool {
        self.used[suit.index()].contains(&trigger)
    }

    pub fn used(&self, suit: Suit) -> &[Card] {
        &self.used[suit.index()]
    }

    pub fn cursor(&self, suit: Suit) -> usize {
        self.cursors[suit.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;

    fn card(raw: &str) -> Card {
        raw.parse().unwrap()
    }

    fn hearts(triggers: &[&str]) -> ActiveRuleSet {
        ActiveRuleSet::from_rules(
            triggers
                .iter()
                .enumerate()
                .map(|(pos, trigger)| Rule {
                    trigger: card(trigger),
                    suit: Suit::Hearts,
                    support: 10 - pos as u32,
                    rank: pos as u32 + 1,
                })
                .collect(),
        )
    }

    #[test]
    fn thin_suit_is_blocked() {
        let active = hearts(&["2♣", "3♣", "4♣"]);
        assert_eq!(
            Rotation::default().admit(Suit::Hearts, card("2♣"), &active),
            Err(RotationBlock::ThinSuit { available: 3 })
        );
    }

    #[test]
    fn trigger_fires_once_per_cycle() {
        let active = hearts(&["2♣", "3♣", "4♣", "5♣"]);
        let mut rotation = Rotation::default();
        assert_eq!(rotation.admit(Suit::Hearts, card("3♣"), &active), Ok(()));
        rotation.note_used(Suit::Hearts, card("3♣"), &active);
        assert_eq!(
            rotation.admit(Suit::Hearts, card("3♣"), &active),
            Err(RotationBlock::Spent)
        );
        assert_eq!(rotation.cursor(Suit::Hearts), 2);
        assert_eq!(rotation.next_due(Suit::Hearts, &active), Some(card("4♣")));
    }

    #[test]
    fn cycle_restarts_once_every_trigger_fired() {
        let active = hearts(&["2♣", "3♣", "4♣", "5♣"]);
        let mut rotation = Rotation::default();
        for trigger in ["2♣", "3♣", "4♣"] {
            rotation.note_used(Suit::Hearts, card(trigger), &active);
        }
        assert_eq!(rotation.used(Suit::Hearts).len(), 3);
        assert_eq!(rotation.next_due(Suit::Hearts, &active), Some(card("5♣")));

        rotation.note_used(Suit::Hearts, card("5♣"), &active);
        assert!(rotation.used(Suit::Hearts).is_empty());
        assert_eq!(rotation.cursor(Suit::Hearts), 0);
        assert_eq!(rotation.admit(Suit::Hearts, card("2♣"), &active), Ok(()));
    }

    #[test]
    fn other_suits_keep_their_own_cycle() {
        let active = hearts(&["2♣", "3♣", "4♣", "5♣"]);
        let mut rotation = Rotation::default();
        rotation.note_used(Suit::Hearts, card("2♣"), &active);
        assert!(rotation.used(Suit::Spades).is_empty());
        assert_eq!(rotation.cursor(Suit::Spades), 0);
    }
}
