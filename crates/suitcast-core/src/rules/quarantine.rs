use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::card::Card;
use crate::model::suit::Suit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub suit: Suit,
    pub trigger: Card,
    pub entered_at: DateTime<Utc>,
    /// Failures recorded while the entry was held.
    pub strikes: u32,
}

/// Rules benched after a losing prediction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quarantine {
    entries: Vec<QuarantineEntry>,
}

impl Quarantine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<QuarantineEntry>) -> Self {
        let mut quarantine = Self::new();
        for entry in entries {
            match quarantine.position(entry.suit, entry.trigger) {
                Some(idx) => quarantine.entries[idx] = entry,
                None => quarantine.entries.push(entry),
            }
        }
        quarantine
    }

    /// Benches `trigger -> suit`. A repeat failure bumps the strike count and restarts the clock.
    pub fn insert(&mut self, suit: Suit, trigger: Card, now: DateTime<Utc>) -> QuarantineEntry {
        match self.position(suit, trigger) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                entry.strikes += 1;
                entry.entered_at = now;
                *entry
            }
            None => {
                let entry = QuarantineEntry {
                    suit,
                    trigger,
                    entered_at: now,
                    strikes: 1,
                };
                self.entries.push(entry);
                entry
            }
        }
    }

    pub fn contains(&self, suit: Suit, trigger: Card) -> bool {
        self.position(suit, trigger).is_some()
    }

    pub fn release(&mut self, suit: Suit, trigger: Card) -> Option<QuarantineEntry> {
        self.position(suit, trigger).map(|idx| self.entries.remove(idx))
    }

    /// Drops entries held for at least `ttl`.
    pub fn expire(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<QuarantineEntry> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| now - entry.entered_at >= ttl);
        self.entries = kept;
        expired
    }

    pub fn for_suit(&self, suit: Suit) -> impl Iterator<Item = &QuarantineEntry> + '_ {
        self.entries.iter().filter(move |entry| entry.suit == suit)
    }

    /// Entries of `suit` in refill order: fewest strikes first, then oldest.
    pub fn release_order(&self, suit: Suit) -> Vec<QuarantineEntry> {
        let mut ordered: Vec<QuarantineEntry> = self.for_suit(suit).copied().collect();
        ordered.sort_by_key(|entry| (entry.strikes, entry.entered_at));
        ordered
    }

    pub fn entries(&self) -> &[QuarantineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, suit: Suit, trigger: Card) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.suit == suit && entry.trigger == trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn card(raw: &str) -> Card {
        raw.parse().unwrap()
    }

    #[test]
    fn repeat_failure_adds_a_strike() {
        let mut q = Quarantine::new();
        q.insert(Suit::Hearts, card("9♣"), at(0));
        let entry = q.insert(Suit::Hearts, card("9♣"), at(5));
        assert_eq!(entry.strikes, 2);
        assert_eq!(entry.entered_at, at(5));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn release_order_prefers_fewest_strikes_then_oldest() {
        let mut q = Quarantine::new();
        q.insert(Suit::Spades, card("2♦"), at(0));
        q.insert(Suit::Spades, card("2♦"), at(1));
        q.insert(Suit::Spades, card("3♦"), at(3));
        q.insert(Suit::Spades, card("4♦"), at(2));
        q.insert(Suit::Hearts, card("5♦"), at(0));
        let order: Vec<_> = q
            .release_order(Suit::Spades)
            .into_iter()
            .map(|e| e.trigger)
            .collect();
        assert_eq!(order, vec![card("4♦"), card("3♦"), card("2♦")]);
    }

    #[test]
    fn expire_removes_only_elapsed_entries() {
        let mut q = Quarantine::new();
        q.insert(Suit::Clubs, card("A♠"), at(0));
        q.insert(Suit::Clubs, card("K♠"), at(30));
        let expired = q.expire(at(60), Duration::hours(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].trigger, card("A♠"));
        assert!(q.contains(Suit::Clubs, card("K♠")));
        assert!(!q.contains(Suit::Clubs, card("A♠")));
    }
}
