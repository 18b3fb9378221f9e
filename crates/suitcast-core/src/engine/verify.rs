use super::prediction::{Prediction, PredictionStatus};
use crate::extract::GameEvent;

/// Highest offset past the target that may still resolve a prediction.
pub const MAX_RESOLUTION_OFFSET: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Index into the prediction ledger.
    pub index: usize,
    pub status: PredictionStatus,
    pub offset: u8,
}

/// Finds the single pending prediction this event resolves, if any.
///
/// Offsets are tried in order 0, 1, 2 past the target. The predicted suit
/// anywhere in the first group wins; a miss at the last offset loses; a miss
/// earlier leaves the prediction pending. Non-final events never resolve.
pub fn resolve(ledger: &[Prediction], event: &GameEvent) -> Option<Verdict> {
    if !event.finalized() {
        return None;
    }

    for (index, prediction) in ledger.iter().enumerate() {
        if !prediction.is_pending() {
            continue;
        }
        for offset in 0..=MAX_RESOLUTION_OFFSET {
            if event.number() != prediction.target.saturating_add(u32::from(offset)) {
                continue;
            }
            if event.has_suit(prediction.suit) {
                return Some(Verdict {
                    index,
                    status: PredictionStatus::Won,
                    offset,
                });
            }
            if offset == MAX_RESOLUTION_OFFSET {
                return Some(Verdict {
                    index,
                    status: PredictionStatus::Lost,
                    offset,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::Card;
    use crate::model::suit::Suit;
    use crate::policy::RuleKind;
    use chrono::{TimeZone, Utc};

    fn card(raw: &str) -> Card {
        raw.parse().unwrap()
    }

    fn pending(target: u32, suit: Suit) -> Prediction {
        Prediction {
            source: target - 2,
            target,
            suit,
            trigger: card("9♣"),
            kind: RuleKind::Learned,
            status: PredictionStatus::Pending,
            issued_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            resolution_offset: None,
            handle: None,
        }
    }

    fn event(number: u32, cards: &[&str], finalized: bool) -> GameEvent {
        GameEvent::new(number, cards.iter().map(|c| card(c)).collect(), finalized).unwrap()
    }

    #[test]
    fn drift_within_window_still_wins() {
        let ledger = vec![pending(107, Suit::Spades)];
        assert_eq!(resolve(&ledger, &event(108, &["2♥", "3♣"], true)), None);
        let verdict = resolve(&ledger, &event(109, &["Q♠"], true)).expect("resolved");
        assert_eq!(verdict.status, PredictionStatus::Won);
        assert_eq!(verdict.offset, 2);
    }

    #[test]
    fn miss_at_last_offset_loses() {
        let ledger = vec![pending(20, Suit::Hearts)];
        let verdict = resolve(&ledger, &event(22, &["2♠"], true)).expect("resolved");
        assert_eq!(verdict.status, PredictionStatus::Lost);
        assert_eq!(verdict.offset, 2);
    }

    #[test]
    fn in_flight_messages_never_resolve() {
        let ledger = vec![pending(20, Suit::Hearts)];
        assert_eq!(resolve(&ledger, &event(20, &["2♥"], false)), None);
    }

    #[test]
    fn resolved_predictions_are_skipped() {
        let mut done = pending(20, Suit::Hearts);
        done.status = PredictionStatus::Won;
        let ledger = vec![done, pending(25, Suit::Clubs)];
        let verdict = resolve(&ledger, &event(25, &["7♣"], true)).expect("resolved");
        assert_eq!(verdict.index, 1);
        assert_eq!(verdict.offset, 0);
    }
}
