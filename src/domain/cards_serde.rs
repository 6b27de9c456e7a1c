//! Serialization for card types.
//!
//! Cards travel on the wire as `{ "suit": "hearts", "rank": "K",
//! "id": "hearts-K" }`; the id is redundant but clients key DOM nodes on
//! it, so it is always included.

use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cards::{Card, Rank, Suit};

impl Serialize for Rank {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let rank = match s.as_str() {
            "A" => Rank::Ace,
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            "joker" => Rank::Joker,
            _ => return Err(DeError::custom(format!("invalid rank: {s}"))),
        };
        Ok(rank)
    }
}

impl Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut out = serializer.serialize_struct("Card", 3)?;
        out.serialize_field("suit", &self.suit)?;
        out.serialize_field("rank", &self.rank)?;
        out.serialize_field("id", &self.id())?;
        out.end()
    }
}

#[derive(Deserialize)]
struct CardWire {
    suit: Suit,
    rank: Rank,
    #[serde(default)]
    id: Option<String>,
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = CardWire::deserialize(deserializer)?;
        // Only the jokers need the id to round-trip: it carries the copy.
        let copy = match wire.id.as_deref() {
            Some("joker-2") => 1,
            _ => 0,
        };
        Ok(Card {
            suit: wire.suit,
            rank: wire.rank,
            copy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        let cases = [
            Card::new(Suit::Spades, Rank::Ace),
            Card::new(Suit::Diamonds, Rank::Ten),
            Card::new(Suit::Hearts, Rank::King),
            Card::joker(0),
            Card::joker(1),
        ];
        for card in cases {
            let encoded = serde_json::to_string(&card).unwrap();
            let decoded: Card = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, card);
        }
    }

    #[test]
    fn wire_shape() {
        let encoded = serde_json::to_value(Card::new(Suit::Hearts, Rank::King)).unwrap();
        assert_eq!(encoded["suit"], "hearts");
        assert_eq!(encoded["rank"], "K");
        assert_eq!(encoded["id"], "hearts-K");
    }
}
