//! Fixed-slot hand with gaps.
//!
//! A hand is an ordered sequence of slots. A successful match leaves a gap
//! in place so every remaining card keeps its position for the life of the
//! hand; penalty cards refill the first gap before the hand is allowed to
//! grow.

use serde::Serialize;

use crate::domain::cards::Card;
use crate::errors::DomainError;

pub const INITIAL_SLOTS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Hand {
    slots: Vec<Option<Card>>,
}

impl Hand {
    /// Deal a fresh hand; every slot starts occupied.
    pub fn new(cards: Vec<Card>) -> Self {
        Self {
            slots: cards.into_iter().map(Some).collect(),
        }
    }

    pub fn slots(&self) -> &[Option<Card>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Card> {
        self.slots.get(index).copied().flatten()
    }

    /// Number of occupied slots.
    pub fn card_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Occupied slots as `(index, card)` pairs.
    pub fn cards(&self) -> impl Iterator<Item = (usize, Card)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|c| (i, c)))
    }

    /// Write into the first gap; if no gap exists, append. Returns the
    /// index the card landed in.
    pub fn add_card(&mut self, card: Card) -> usize {
        if let Some(gap) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[gap] = Some(card);
            gap
        } else {
            self.slots.push(Some(card));
            self.slots.len() - 1
        }
    }

    /// Take the card at `index`, leaving a gap in its place.
    pub fn remove_at(&mut self, index: usize) -> Result<Card, DomainError> {
        let slot = self.slots.get_mut(index).ok_or(DomainError::BadSlot)?;
        slot.take().ok_or(DomainError::BadSlot)
    }

    /// Replace the card at `index`, returning the previous occupant. The
    /// slot must be occupied.
    pub fn replace_at(&mut self, index: usize, card: Card) -> Result<Card, DomainError> {
        let slot = self.slots.get_mut(index).ok_or(DomainError::BadSlot)?;
        slot.replace(card).ok_or(DomainError::BadSlot)
    }

    /// Which slots are occupied; lets clients reserve grid space without
    /// learning card identity.
    pub fn layout(&self) -> Vec<bool> {
        self.slots.iter().map(|s| s.is_some()).collect()
    }
}

/// Exchange the contents of two slots across hands. Both slots must be
/// occupied.
pub fn swap_between(
    a: &mut Hand,
    index_a: usize,
    b: &mut Hand,
    index_b: usize,
) -> Result<(), DomainError> {
    let card_a = a.get(index_a).ok_or(DomainError::BadSlot)?;
    let card_b = b.get(index_b).ok_or(DomainError::BadSlot)?;
    a.replace_at(index_a, card_b)?;
    b.replace_at(index_b, card_a)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::{Rank, Suit};

    fn card(rank: Rank) -> Card {
        Card::new(Suit::Hearts, rank)
    }

    fn sample_hand() -> Hand {
        Hand::new(vec![
            card(Rank::Two),
            card(Rank::Three),
            card(Rank::Four),
            card(Rank::Five),
        ])
    }

    #[test]
    fn remove_leaves_a_gap_and_preserves_length() {
        let mut hand = sample_hand();
        let removed = hand.remove_at(1).unwrap();
        assert_eq!(removed, card(Rank::Three));
        assert_eq!(hand.len(), 4);
        assert_eq!(hand.get(1), None);
        assert_eq!(hand.layout(), vec![true, false, true, true]);
    }

    #[test]
    fn add_prefers_the_first_gap() {
        let mut hand = sample_hand();
        hand.remove_at(2).unwrap();
        hand.remove_at(0).unwrap();
        let landed = hand.add_card(card(Rank::Nine));
        assert_eq!(landed, 0);
        assert_eq!(hand.get(0), Some(card(Rank::Nine)));
        assert_eq!(hand.len(), 4);
    }

    #[test]
    fn add_appends_when_full() {
        let mut hand = sample_hand();
        let landed = hand.add_card(card(Rank::Nine));
        assert_eq!(landed, 4);
        assert_eq!(hand.len(), 5);
    }

    #[test]
    fn swap_requires_both_slots_occupied() {
        let mut a = sample_hand();
        let mut b = sample_hand();
        b.remove_at(1).unwrap();
        assert_eq!(
            swap_between(&mut a, 0, &mut b, 1),
            Err(DomainError::BadSlot)
        );
        // Nothing moved.
        assert_eq!(a.get(0), Some(card(Rank::Two)));
    }

    #[test]
    fn swap_exchanges_contents() {
        let mut a = sample_hand();
        let mut b = Hand::new(vec![card(Rank::King), card(Rank::Queen)]);
        swap_between(&mut a, 3, &mut b, 0).unwrap();
        assert_eq!(a.get(3), Some(card(Rank::King)));
        assert_eq!(b.get(0), Some(card(Rank::Five)));
    }
}
