//! What a bot remembers about card positions.
//!
//! Keys are `(player, slot)`; a bot remembers its own peeked slots and
//! cards it has seen in opponents' hands. The controller calls `forget`
//! whenever a remembered slot is mutated by someone else.

use std::collections::HashMap;

use crate::domain::{Card, PlayerId};

#[derive(Debug, Clone, Default)]
pub struct BotMemory {
    known: HashMap<(PlayerId, usize), Card>,
}

impl BotMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, player_id: &str, slot_index: usize, card: Card) {
        self.known.insert((player_id.to_string(), slot_index), card);
    }

    pub fn forget(&mut self, player_id: &str, slot_index: usize) {
        self.known.remove(&(player_id.to_string(), slot_index));
    }

    pub fn recall(&self, player_id: &str, slot_index: usize) -> Option<Card> {
        self.known.get(&(player_id.to_string(), slot_index)).copied()
    }

    /// Everything remembered about one player's hand, as `(slot, card)`.
    pub fn known_for(&self, player_id: &str) -> Vec<(usize, Card)> {
        let mut entries: Vec<(usize, Card)> = self
            .known
            .iter()
            .filter(|((pid, _), _)| pid == player_id)
            .map(|((_, slot), card)| (*slot, *card))
            .collect();
        entries.sort_by_key(|(slot, _)| *slot);
        entries
    }

    pub fn clear(&mut self) {
        self.known.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Card, Rank, Suit};

    #[test]
    fn remember_recall_forget() {
        let mut memory = BotMemory::new();
        let card = Card::new(Suit::Hearts, Rank::Nine);
        memory.remember("bot-1", 2, card);
        assert_eq!(memory.recall("bot-1", 2), Some(card));
        assert_eq!(memory.recall("bot-1", 3), None);

        memory.forget("bot-1", 2);
        assert_eq!(memory.recall("bot-1", 2), None);
    }

    #[test]
    fn known_for_is_sorted_by_slot() {
        let mut memory = BotMemory::new();
        memory.remember("p1", 3, Card::new(Suit::Clubs, Rank::Two));
        memory.remember("p1", 0, Card::new(Suit::Clubs, Rank::Ten));
        memory.remember("p2", 1, Card::new(Suit::Clubs, Rank::Ace));

        let known: Vec<usize> = memory.known_for("p1").iter().map(|(s, _)| *s).collect();
        assert_eq!(known, vec![0, 3]);
    }
}
