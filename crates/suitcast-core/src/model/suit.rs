use core::fmt;
use serde::{Deserialize, Serialize};

/// Emoji presentation selector appended to every canonical suit glyph.
pub const VARIATION_SELECTOR: char = '\u{FE0F}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Suit {
    Spades = 0,
    Hearts = 1,
    Diamonds = 2,
    Clubs = 3,
}

impl Suit {
    /// Suit-priority order used wherever rules are scanned suit by suit.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Suit::Spades),
            1 => Some(Suit::Hearts),
            2 => Some(Suit::Diamonds),
            3 => Some(Suit::Clubs),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Maps every accepted visual variant of a suit symbol onto its suit.
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '♠' | '♤' => Some(Suit::Spades),
            '♥' | '❤' | '♡' => Some(Suit::Hearts),
            '♦' | '♢' => Some(Suit::Diamonds),
            '♣' | '♧' => Some(Suit::Clubs),
            _ => None,
        }
    }

    /// Base symbol of the canonical glyph, without the variation selector.
    pub const fn symbol(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '❤',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }

    /// Canonical glyph: base symbol followed by U+FE0F.
    pub const fn glyph(self) -> &'static str {
        match self {
            Suit::Spades => "♠\u{FE0F}",
            Suit::Hearts => "❤\u{FE0F}",
            Suit::Diamonds => "♦\u{FE0F}",
            Suit::Clubs => "♣\u{FE0F}",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Suit::Spades => "spades",
            Suit::Hearts => "hearts",
            Suit::Diamonds => "diamonds",
            Suit::Clubs => "clubs",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Rewrites every suit symbol variant in `text` to its canonical glyph.
///
/// A variation selector already trailing a symbol is absorbed, so the output
/// never carries a doubled selector.
pub fn normalize_glyphs(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match Suit::from_symbol(ch) {
            Some(suit) => {
                out.push_str(suit.glyph());
                if chars.peek() == Some(&VARIATION_SELECTOR) {
                    chars.next();
                }
            }
            None => out.push(ch),
        }
    }
    out
}
