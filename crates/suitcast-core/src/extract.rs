//! Turns loosely formatted feed text into a game number and the cards of the
//! first parenthesized group.
//!
//! Absence is routine here: every function reports "nothing found" through
//! `Option` or an empty list, never through an error.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::{Suit, normalize_glyphs};

pub const MIN_GAME_NUMBER: u32 = 1;
pub const MAX_GAME_NUMBER: u32 = 9_999;

/// Numbering conventions, most specific first.
const SEQUENCE_PATTERNS: [&str; 8] = [
    r"#N(\d+)\.",
    r"🔵(\d+)🔵",
    r"Jeu\s*(\d+)",
    r"J\s*(\d+)",
    r"GAME\s*(\d+)",
    r"N°\s*(\d+)",
    r"#(\d+)",
    r"\b(\d{1,4})\b",
];

static SEQUENCE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SEQUENCE_PATTERNS
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("sequence pattern")
        })
        .collect()
});

static GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("group pattern"));

static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(10|[2-9]|[AKQJ])([♠❤♦♣])").expect("card pattern"));

/// A feed message reduced to the parts the engine reasons about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
    number: u32,
    cards: Vec<Card>,
    finalized: bool,
}

impl GameEvent {
    /// Returns `None` when `cards` is empty: an event always has a first card.
    pub fn new(number: u32, cards: Vec<Card>, finalized: bool) -> Option<Self> {
        if cards.is_empty() {
            return None;
        }
        Some(Self {
            number,
            cards,
            finalized,
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn first_card(&self) -> Card {
        self.cards[0]
    }

    pub fn finalized(&self) -> bool {
        self.finalized
    }

    pub fn has_suit(&self, suit: Suit) -> bool {
        self.cards.iter().any(|card| card.suit == suit)
    }
}

/// Marker sets deciding whether a message carries a final result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    pub completion: Vec<String>,
    pub pending: Vec<String>,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            completion: vec!["✅".to_string(), "🔰".to_string()],
            pending: vec![
                "⏰".to_string(),
                "▶".to_string(),
                "🕐".to_string(),
                "⌛".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    markers: Markers,
}

impl Extractor {
    pub fn new(markers: Markers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Full extraction; `None` means "skip this message".
    pub fn extract(&self, text: &str) -> Option<GameEvent> {
        let number = sequence_number(text)?;
        let cards = first_group_cards(text);
        GameEvent::new(number, cards, self.is_finalized(text))
    }

    /// A message is final once it shows a completion marker and no in-progress marker.
    pub fn is_finalized(&self, text: &str) -> bool {
        let completed = self
            .markers
            .completion
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(marker.as_str()));
        let in_flight = self
            .markers
            .pending
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(marker.as_str()));
        completed && !in_flight
    }
}

/// Prioritized game-number search. Only the first match of each pattern
/// counts; when it is out of range the next pattern is tried.
pub fn sequence_number(text: &str) -> Option<u32> {
    SEQUENCE_RES.iter().find_map(|re| {
        re.captures(text)?
            .get(1)?
            .as_str()
            .parse::<u32>()
            .ok()
            .filter(|n| (MIN_GAME_NUMBER..=MAX_GAME_NUMBER).contains(n))
    })
}

/// Content of the first `( ... )` group, if any.
pub fn first_group(text: &str) -> Option<&str> {
    GROUP_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn first_group_cards(text: &str) -> Vec<Card> {
    first_group(text).map(parse_cards).unwrap_or_default()
}

/// Cards in left-to-right order after glyph normalization and whitespace removal.
pub fn parse_cards(content: &str) -> Vec<Card> {
    let compact: String = normalize_glyphs(content)
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect();
    CARD_RE
        .captures_iter(&compact)
        .filter_map(|caps| {
            let rank = Rank::from_token(caps.get(1)?.as_str())?;
            let symbol = caps.get(2)?.as_str().chars().next()?;
            Some(Card::new(rank, Suit::from_symbol(symbol)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(raw: &str) -> Card {
        raw.parse().unwrap()
    }

    #[test]
    fn extracts_number_and_first_group_only() {
        let event = Extractor::default()
            .extract("#N42. Résultat (K♣ 9♥) (A♠ 2♦ 3♣)")
            .expect("event");
        assert_eq!(event.number(), 42);
        assert_eq!(event.cards(), &[card("K♣"), card("9♥")]);
    }

    #[test]
    fn sequence_patterns_follow_priority() {
        assert_eq!(sequence_number("Jeu 15 puis #N88. fin"), Some(88));
        assert_eq!(sequence_number("🔵107🔵 something"), Some(107));
        assert_eq!(sequence_number("game   7"), Some(7));
        assert_eq!(sequence_number("no digits here"), None);
    }

    #[test]
    fn out_of_range_numbers_fall_through_to_the_next_pattern() {
        assert_eq!(sequence_number("#N0. Jeu 12"), Some(12));
        assert_eq!(sequence_number("#N12345."), None);
    }

    #[test]
    fn later_matches_of_the_same_pattern_are_ignored() {
        assert_eq!(sequence_number("#N0. (K♣) #N12."), None);
        assert_eq!(sequence_number("0 then 12"), None);
    }

    #[test]
    fn splits_values_from_glyphs_with_inner_spaces() {
        let cards = parse_cards("10 ♦️ j♠ A ❤️");
        assert_eq!(cards, vec![card("10♦"), card("J♠"), card("A♥")]);
    }

    #[test]
    fn missing_or_empty_group_is_no_data() {
        let extractor = Extractor::default();
        assert!(extractor.extract("#N10. nothing to see").is_none());
        assert!(extractor.extract("#N10. () (A♠)").is_none());
        assert!(extractor.extract("(A♠) but no number").is_none());
        assert!(extractor.extract("Jeu 3 (A♠)").is_some());
    }

    #[test]
    fn finalized_requires_completion_without_pending_marker() {
        let extractor = Extractor::default();
        assert!(extractor.is_finalized("#N5. ✅ (A♠)"));
        assert!(!extractor.is_finalized("#N5. ⏰ (A♠)"));
        assert!(!extractor.is_finalized("#N5. ✅ ⏰ (A♠)"));
        assert!(!extractor.is_finalized("#N5. (A♠)"));
    }
}
