//! Core card types: suits, ranks, point values, and rule classification.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
    Joker,
}

impl Suit {
    pub fn as_str(self) -> &'static str {
        match self {
            Suit::Hearts => "hearts",
            Suit::Diamonds => "diamonds",
            Suit::Clubs => "clubs",
            Suit::Spades => "spades",
            Suit::Joker => "joker",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Joker,
}

impl Rank {
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Joker => "joker",
        }
    }
}

/// A single card. `copy` disambiguates the two jokers (0 and 1) and is
/// always 0 for ordinary cards, so `(suit, rank, copy)` is unique across
/// the 54-card deck.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
    pub copy: u8,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self {
            suit,
            rank,
            copy: 0,
        }
    }

    pub fn joker(copy: u8) -> Self {
        Self {
            suit: Suit::Joker,
            rank: Rank::Joker,
            copy,
        }
    }

    /// Stable wire id: `"hearts-K"`, `"clubs-10"`, `"joker-1"`, `"joker-2"`.
    pub fn id(&self) -> String {
        if self.suit == Suit::Joker {
            format!("joker-{}", self.copy + 1)
        } else {
            format!("{}-{}", self.suit.as_str(), self.rank.as_str())
        }
    }

    pub fn is_red_king(&self) -> bool {
        self.rank == Rank::King && matches!(self.suit, Suit::Hearts | Suit::Diamonds)
    }
}

/// Point value at reveal. The Red Kings are the only negative cards.
pub fn point_value(card: Card) -> i32 {
    match card.rank {
        Rank::Joker => 0,
        Rank::Ace => 1,
        Rank::Two => 2,
        Rank::Three => 3,
        Rank::Four => 4,
        Rank::Five => 5,
        Rank::Six => 6,
        Rank::Seven => 7,
        Rank::Eight => 8,
        Rank::Nine => 9,
        Rank::Ten => 10,
        Rank::Jack | Rank::Queen => 10,
        Rank::King => {
            if card.is_red_king() {
                -1
            } else {
                10
            }
        }
    }
}

/// Discard rules attached to a drawn card.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleType {
    PeekOwn,
    PeekOther,
    BlindSwitch,
    BlackKing,
}

/// Classify a card's discard rule. Red Kings have no rule.
pub fn rule_type(card: Card) -> Option<RuleType> {
    match card.rank {
        Rank::Seven | Rank::Eight => Some(RuleType::PeekOwn),
        Rank::Nine | Rank::Ten => Some(RuleType::PeekOther),
        Rank::Jack | Rank::Queen => Some(RuleType::BlindSwitch),
        Rank::King if !card.is_red_king() => Some(RuleType::BlackKing),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_classification() {
        assert_eq!(
            rule_type(Card::new(Suit::Spades, Rank::King)),
            Some(RuleType::BlackKing)
        );
        assert_eq!(rule_type(Card::new(Suit::Hearts, Rank::King)), None);
        assert_eq!(
            rule_type(Card::new(Suit::Clubs, Rank::Seven)),
            Some(RuleType::PeekOwn)
        );
        assert_eq!(
            rule_type(Card::new(Suit::Diamonds, Rank::Ten)),
            Some(RuleType::PeekOther)
        );
        assert_eq!(
            rule_type(Card::new(Suit::Hearts, Rank::Queen)),
            Some(RuleType::BlindSwitch)
        );
        assert_eq!(rule_type(Card::joker(0)), None);
    }

    #[test]
    fn point_values() {
        assert_eq!(point_value(Card::new(Suit::Hearts, Rank::King)), -1);
        assert_eq!(point_value(Card::new(Suit::Diamonds, Rank::King)), -1);
        assert_eq!(point_value(Card::new(Suit::Spades, Rank::King)), 10);
        assert_eq!(point_value(Card::joker(1)), 0);
        assert_eq!(point_value(Card::new(Suit::Clubs, Rank::Ace)), 1);
        assert_eq!(point_value(Card::new(Suit::Clubs, Rank::Jack)), 10);
        assert_eq!(point_value(Card::new(Suit::Clubs, Rank::Six)), 6);
    }

    #[test]
    fn stable_ids() {
        assert_eq!(Card::new(Suit::Hearts, Rank::King).id(), "hearts-K");
        assert_eq!(Card::new(Suit::Clubs, Rank::Ten).id(), "clubs-10");
        assert_eq!(Card::joker(0).id(), "joker-1");
        assert_eq!(Card::joker(1).id(), "joker-2");
    }
}
