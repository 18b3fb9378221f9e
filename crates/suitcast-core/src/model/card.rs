use crate::model::rank::Rank;
use crate::model::suit::{Suit, VARIATION_SELECTOR};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardParseError {
    #[error("card '{0}' has no suit symbol")]
    MissingSuit(String),
    #[error("card '{0}' has an unknown value")]
    BadValue(String),
    #[error("card '{0}' has trailing characters")]
    Trailing(String),
}

impl FromStr for Card {
    type Err = CardParseError;

    /// Accepts any suit glyph variant, e.g. `9♥`, `9♥\u{FE0F}` and `9❤\u{FE0F}`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        let Some((split, symbol)) = text
            .char_indices()
            .find(|(_, ch)| Suit::from_symbol(*ch).is_some())
        else {
            return Err(CardParseError::MissingSuit(raw.to_string()));
        };
        let rank = Rank::from_token(text[..split].trim())
            .ok_or_else(|| CardParseError::BadValue(raw.to_string()))?;
        let rest = &text[split + symbol.len_utf8()..];
        if !(rest.is_empty() || rest.chars().all(|ch| ch == VARIATION_SELECTOR)) {
            return Err(CardParseError::Trailing(raw.to_string()));
        }
        let suit = Suit::from_symbol(symbol)
            .ok_or_else(|| CardParseError::MissingSuit(raw.to_string()))?;
        Ok(Card::new(rank, suit))
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
