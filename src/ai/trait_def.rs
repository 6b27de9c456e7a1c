//! Bot strategy trait definition.
//!
//! A strategy is four pure decisions over a read-only view of the room.
//! The driver owns scheduling and legality; strategies only pick between
//! moves the driver already knows are legal, so a buggy strategy can be
//! ignored but never corrupt state.

use crate::ai::memory::BotMemory;
use crate::domain::{Card, GameState, PlayerId, RuleType};

/// Read-only context handed to every strategy decision.
///
/// `opponents` is pre-filtered by the driver: other players with live
/// hands, minus the protected Red-King caller.
pub struct BotView<'a> {
    pub bot_id: &'a str,
    pub game: &'a GameState,
    pub memory: &'a BotMemory,
    pub opponents: &'a [PlayerId],
}

impl BotView<'_> {
    /// Occupied slots of the bot's own hand.
    pub fn own_slots(&self) -> Vec<usize> {
        self.game
            .hands
            .get(self.bot_id)
            .map(|h| h.cards().map(|(i, _)| i).collect())
            .unwrap_or_default()
    }

    /// Occupied slots the bot has no memory of.
    pub fn unknown_own_slots(&self) -> Vec<usize> {
        self.own_slots()
            .into_iter()
            .filter(|&i| self.memory.recall(self.bot_id, i).is_none())
            .collect()
    }

    /// Remembered own cards as `(slot, card)`.
    pub fn known_own(&self) -> Vec<(usize, Card)> {
        self.memory
            .known_for(self.bot_id)
            .into_iter()
            .filter(|(slot, _)| {
                self.game
                    .hands
                    .get(self.bot_id)
                    .and_then(|h| h.get(*slot))
                    .is_some()
            })
            .collect()
    }

    /// Score estimate from memory: remembered slots at face value, every
    /// other occupied slot at `unknown_value`.
    pub fn estimated_score(&self, unknown_value: i32) -> i32 {
        self.own_slots()
            .iter()
            .map(|&slot| {
                self.memory
                    .recall(self.bot_id, slot)
                    .map(crate::domain::point_value)
                    .unwrap_or(unknown_value)
            })
            .sum()
    }

    /// The remembered own card with the highest point value.
    pub fn worst_known(&self) -> Option<(usize, Card)> {
        self.known_own()
            .into_iter()
            .max_by_key(|(_, card)| crate::domain::point_value(*card))
    }
}

/// What to do with the card just drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawDecision {
    Keep { slot: usize },
    Discard,
}

/// A single hand position, used in rule decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRef {
    pub player_id: PlayerId,
    pub slot_index: usize,
}

impl SlotRef {
    pub fn new(player_id: impl Into<PlayerId>, slot_index: usize) -> Self {
        Self {
            player_id: player_id.into(),
            slot_index,
        }
    }
}

/// How to use (or not use) a discarded rule card.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDecision {
    Skip,
    PeekOwn {
        slot: usize,
    },
    PeekOther {
        target: SlotRef,
    },
    BlindSwitch {
        own_slot: usize,
        target: SlotRef,
    },
    /// Peek `first` and `second`; afterwards perform `switch` (or pass if
    /// `None`). The strategy pre-commits using whatever information model
    /// it plays with — the peek reveals exactly these cards anyway.
    BlackKing {
        first: SlotRef,
        second: SlotRef,
        switch: Option<(SlotRef, SlotRef)>,
    },
}

/// The four decisions a bot makes. Implementations must be `Send + Sync`;
/// mutable state (an RNG) goes behind a `Mutex`.
pub trait BotStrategy: Send + Sync {
    /// Whether to declare the end-game instead of drawing.
    fn should_call_red_king(&self, view: &BotView<'_>) -> bool;

    /// Keep the drawn card (into which slot) or discard it.
    fn decide_keep_or_discard(&self, view: &BotView<'_>, drawn: Card) -> DrawDecision;

    /// Use or skip the rule on a just-discarded rule card.
    fn decide_rule_usage(&self, view: &BotView<'_>, rule: RuleType) -> RuleDecision;

    /// Whether to risk an out-of-turn match of `known` (remembered at
    /// `slot_index`) against `top_discard`.
    fn should_match_own(
        &self,
        view: &BotView<'_>,
        slot_index: usize,
        known: Card,
        top_discard: Card,
    ) -> bool;
}
