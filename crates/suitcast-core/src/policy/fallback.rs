use super::{MatchScope, RuleKind, TriggerMatch, TriggerMatcher};
use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::Suit;

/// Hand-picked trigger table used whenever learned mode is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRules {
    table: Vec<(Card, Suit)>,
}

impl StaticRules {
    pub fn new(table: Vec<(Card, Suit)>) -> Self {
        Self { table }
    }

    pub fn lookup(&self, card: Card) -> Option<Suit> {
        self.table
            .iter()
            .find(|(trigger, _)| *trigger == card)
            .map(|(_, suit)| *suit)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for StaticRules {
    fn default() -> Self {
        use Rank::*;
        use Suit::*;
        let table = [
            (Ten, Diamonds, Spades),
            (Ten, Spades, Hearts),
            (Nine, Clubs, Hearts),
            (Nine, Diamonds, Spades),
            (Eight, Clubs, Spades),
            (Eight, Spades, Clubs),
            (Seven, Spades, Spades),
            (Seven, Clubs, Clubs),
            (Six, Diamonds, Clubs),
            (Six, Clubs, Diamonds),
            (Ace, Hearts, Hearts),
            (Five, Hearts, Hearts),
            (Five, Spades, Spades),
        ];
        Self::new(
            table
                .into_iter()
                .map(|(rank, suit, predicted)| (Card::new(rank, suit), predicted))
                .collect(),
        )
    }
}

impl TriggerMatcher for StaticRules {
    fn kind(&self) -> RuleKind {
        RuleKind::Static
    }

    /// First card of the scoped hand, left to right, that the table knows.
    fn find(&self, cards: &[Card], scope: MatchScope) -> Option<TriggerMatch> {
        scope.cards(cards).iter().find_map(|&card| {
            self.lookup(card).map(|suit| TriggerMatch {
                trigger: card,
                suit,
                kind: RuleKind::Static,
            })
        })
    }
}
