mod fallback;

pub use fallback::StaticRules;

use serde::{Deserialize, Serialize};

use crate::model::card::Card;
use crate::model::suit::Suit;
use crate::rules::ActiveRuleSet;

/// Where a prediction's trigger -> suit association came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Learned,
    Static,
}

/// Which cards of the first group may fire a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    #[default]
    AnyCard,
    FirstCard,
}

impl MatchScope {
    pub fn cards(self, cards: &[Card]) -> &[Card] {
        match self {
            MatchScope::AnyCard => cards,
            MatchScope::FirstCard => &cards[..cards.len().min(1)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerMatch {
    pub trigger: Card,
    pub suit: Suit,
    pub kind: RuleKind,
}

/// Maps the cards of a trigger hand to a predicted suit.
pub trait TriggerMatcher {
    fn kind(&self) -> RuleKind;

    fn find(&self, cards: &[Card], scope: MatchScope) -> Option<TriggerMatch>;
}

impl TriggerMatcher for ActiveRuleSet {
    fn kind(&self) -> RuleKind {
        RuleKind::Learned
    }

    /// First rule in suit-priority order whose trigger is in the scoped hand.
    fn find(&self, cards: &[Card], scope: MatchScope) -> Option<TriggerMatch> {
        let hand = scope.cards(cards);
        self.rules()
            .iter()
            .find(|rule| hand.contains(&rule.trigger))
            .map(|rule| TriggerMatch {
                trigger: rule.trigger,
                suit: rule.suit,
                kind: RuleKind::Learned,
            })
    }
}
