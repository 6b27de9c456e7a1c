//! Deck construction, shuffling, and drawing.

use crate::domain::cards::{Card, Rank, Suit};
use crate::errors::DomainError;

pub const DECK_SIZE: usize = 54;

/// Generate the full 54-card deck in standard order: 52 suited cards plus
/// two distinct jokers.
pub fn full_deck() -> Vec<Card> {
    let suits = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];
    let ranks = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    let mut deck = Vec::with_capacity(DECK_SIZE);
    for suit in suits {
        for rank in ranks {
            deck.push(Card::new(suit, rank));
        }
    }
    deck.push(Card::joker(0));
    deck.push(Card::joker(1));
    deck
}

/// Seedable xorshift64* generator driving the shuffle.
///
/// Reproducible given a seed so a dealt game can be replayed in tests;
/// statistical quality is plenty for fair shuffling without being
/// cryptographic.
struct ShuffleRng(u64);

impl ShuffleRng {
    fn seeded(seed: u64) -> Self {
        // xorshift never leaves the all-zero state; force a bit on.
        Self(seed | 1)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform-enough index in `0..bound` via the widening
    /// multiply-shift trick; bias is on the order of `bound / 2^64`.
    fn below(&mut self, bound: usize) -> usize {
        ((u128::from(self.next_u64()) * bound as u128) >> 64) as usize
    }
}

/// Fisher-Yates shuffle, deterministic for a given seed.
pub fn shuffle_with_seed(deck: &mut [Card], seed: u64) {
    let mut rng = ShuffleRng::seeded(seed);
    for i in 0..deck.len() {
        let j = i + rng.below(deck.len() - i);
        deck.swap(i, j);
    }
}

/// A full shuffled deck. Production callers pass entropy; tests pass a
/// fixed seed for reproducible games.
pub fn shuffled_deck(seed: u64) -> Vec<Card> {
    let mut deck = full_deck();
    shuffle_with_seed(&mut deck, seed);
    deck
}

/// Remove and return the top card (the last element).
pub fn draw(deck: &mut Vec<Card>) -> Result<Card, DomainError> {
    deck.pop().ok_or(DomainError::EmptyDeck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn full_deck_has_54_unique_ids() {
        let deck = full_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        let ids: HashSet<String> = deck.iter().map(|c| c.id()).collect();
        assert_eq!(ids.len(), DECK_SIZE);
    }

    #[test]
    fn shuffle_is_deterministic() {
        let a = shuffled_deck(12345);
        let b = shuffled_deck(12345);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = shuffled_deck(12345);
        let b = shuffled_deck(54321);
        assert_ne!(a, b);
    }

    #[test]
    fn shuffle_preserves_the_multiset() {
        let shuffled = shuffled_deck(99);
        let mut ids: Vec<String> = shuffled.iter().map(|c| c.id()).collect();
        let mut reference: Vec<String> = full_deck().iter().map(|c| c.id()).collect();
        ids.sort();
        reference.sort();
        assert_eq!(ids, reference);
    }

    #[test]
    fn draw_takes_the_top_and_empties_out() {
        let mut deck = vec![Card::joker(0), Card::joker(1)];
        assert_eq!(draw(&mut deck).unwrap(), Card::joker(1));
        assert_eq!(draw(&mut deck).unwrap(), Card::joker(0));
        assert_eq!(draw(&mut deck), Err(DomainError::EmptyDeck));
    }
}
