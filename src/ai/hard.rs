//! Hard bot: full-information play.
//!
//! The server drives its own bots, so this tier reads the actual hands
//! instead of a memory model. It still goes through the same legality
//! guards as everyone else; the advantage is evaluation, not extra moves.

use crate::ai::trait_def::{BotStrategy, BotView, DrawDecision, RuleDecision, SlotRef};
use crate::domain::{point_value, Card, RuleType};

const CALL_THRESHOLD: i32 = 5;

pub struct HardBot;

impl HardBot {
    pub fn new(_seed: Option<u64>) -> Self {
        Self
    }

    fn actual_score(view: &BotView<'_>) -> i32 {
        view.game
            .hands
            .get(view.bot_id)
            .map(|h| h.cards().map(|(_, card)| point_value(card)).sum())
            .unwrap_or(0)
    }

    /// The bot's own highest-value slot.
    fn worst_actual(view: &BotView<'_>) -> Option<(usize, Card)> {
        view.game
            .hands
            .get(view.bot_id)?
            .cards()
            .max_by_key(|(_, card)| point_value(*card))
    }

    /// The lowest-value card anywhere in an opponent hand.
    fn opponents_best(view: &BotView<'_>) -> Option<(SlotRef, Card)> {
        let mut best: Option<(SlotRef, Card)> = None;
        for target in view.opponents {
            let Some(hand) = view.game.hands.get(target) else {
                continue;
            };
            for (slot, card) in hand.cards() {
                let better = match &best {
                    Some((_, current)) => point_value(card) < point_value(*current),
                    None => true,
                };
                if better {
                    best = Some((SlotRef::new(target.clone(), slot), card));
                }
            }
        }
        best
    }

    /// The two lowest-value opponent cards, for a black-king inspection.
    fn opponents_best_two(view: &BotView<'_>) -> Option<(SlotRef, SlotRef)> {
        let mut all: Vec<(SlotRef, i32)> = Vec::new();
        for target in view.opponents {
            if let Some(hand) = view.game.hands.get(target) {
                for (slot, card) in hand.cards() {
                    all.push((SlotRef::new(target.clone(), slot), point_value(card)));
                }
            }
        }
        if all.len() < 2 {
            return None;
        }
        all.sort_by_key(|(_, value)| *value);
        let mut picks = all.into_iter();
        Some((picks.next()?.0, picks.next()?.0))
    }
}

impl BotStrategy for HardBot {
    fn should_call_red_king(&self, view: &BotView<'_>) -> bool {
        Self::actual_score(view) <= CALL_THRESHOLD
    }

    fn decide_keep_or_discard(&self, view: &BotView<'_>, drawn: Card) -> DrawDecision {
        match Self::worst_actual(view) {
            Some((slot, worst)) if point_value(drawn) < point_value(worst) => {
                DrawDecision::Keep { slot }
            }
            _ => DrawDecision::Discard,
        }
    }

    fn decide_rule_usage(&self, view: &BotView<'_>, rule: RuleType) -> RuleDecision {
        match rule {
            // Peeks add nothing when you already see everything.
            RuleType::PeekOwn | RuleType::PeekOther => RuleDecision::Skip,
            RuleType::BlindSwitch => {
                let Some((own_slot, worst)) = Self::worst_actual(view) else {
                    return RuleDecision::Skip;
                };
                let Some((target, their_best)) = Self::opponents_best(view) else {
                    return RuleDecision::Skip;
                };
                if point_value(their_best) < point_value(worst) {
                    RuleDecision::BlindSwitch { own_slot, target }
                } else {
                    RuleDecision::Skip
                }
            }
            RuleType::BlackKing => {
                let Some((first, second)) = Self::opponents_best_two(view) else {
                    return RuleDecision::Skip;
                };
                let Some((own_slot, worst)) = Self::worst_actual(view) else {
                    return RuleDecision::Skip;
                };
                let first_card = view
                    .game
                    .hands
                    .get(&first.player_id)
                    .and_then(|h| h.get(first.slot_index));
                let switch = match first_card {
                    Some(card) if point_value(card) < point_value(worst) => Some((
                        SlotRef::new(view.bot_id.to_string(), own_slot),
                        first.clone(),
                    )),
                    _ => None,
                };
                if switch.is_none() {
                    // Nothing to gain; keep the turn moving instead of
                    // burning the inspection.
                    return RuleDecision::Skip;
                }
                RuleDecision::BlackKing {
                    first,
                    second,
                    switch,
                }
            }
        }
    }

    fn should_match_own(
        &self,
        view: &BotView<'_>,
        slot_index: usize,
        _known: Card,
        top_discard: Card,
    ) -> bool {
        // Trust the table, not the memory.
        view.game
            .hands
            .get(view.bot_id)
            .and_then(|h| h.get(slot_index))
            .map(|card| card.rank == top_discard.rank)
            .unwrap_or(false)
    }
}
