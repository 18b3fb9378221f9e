//! Announcement texts. The token layout is consumed by downstream readers
//! and must stay byte-for-byte stable.

use super::prediction::{Prediction, PredictionStatus};
use crate::model::suit::Suit;

pub const PENDING_MARK: &str = "⏳";
pub const LOST_MARK: &str = "❌";
pub const WON_MARK: &str = "✅";
const KEYCAP: &str = "\u{FE0F}\u{20E3}";

fn token(target: u32, suit: Suit, status: &str) -> String {
    format!("🔵{target}🔵:{} statut :{status}", suit.glyph())
}

pub fn pending_text(target: u32, suit: Suit) -> String {
    token(target, suit, PENDING_MARK)
}

pub fn won_text(target: u32, suit: Suit, offset: u8) -> String {
    token(target, suit, &format!("{WON_MARK}{offset}{KEYCAP}"))
}

pub fn lost_text(target: u32, suit: Suit) -> String {
    token(target, suit, LOST_MARK)
}

/// Current text for a prediction in whatever state it is in.
pub fn status_text(prediction: &Prediction) -> String {
    match (prediction.status, prediction.resolution_offset) {
        (PredictionStatus::Pending, _) => pending_text(prediction.target, prediction.suit),
        (PredictionStatus::Won, offset) => {
            won_text(prediction.target, prediction.suit, offset.unwrap_or(0))
        }
        (PredictionStatus::Lost, _) => lost_text(prediction.target, prediction.suit),
    }
}
