//! Medium bot: conservative memory-based play.
//!
//! Works strictly off its memory; an unremembered slot is budgeted at a
//! flat 6 points. Calls the Red King only with a well-known, cheap hand,
//! keeps only strict improvements over its worst remembered card, and
//! matches whenever it remembers a rank equality.

use std::sync::Mutex;

use rand::prelude::*;

use crate::ai::trait_def::{BotStrategy, BotView, DrawDecision, RuleDecision, SlotRef};
use crate::domain::{point_value, Card, RuleType};

const UNKNOWN_VALUE: i32 = 6;
const MIN_KNOWN_FOR_CALL: usize = 2;
const MAX_KNOWN_SUM_FOR_CALL: i32 = 5;
const MAX_ESTIMATE_FOR_CALL: i32 = 8;

pub struct MediumBot {
    rng: Mutex<StdRng>,
}

impl MediumBot {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn random_opponent_slot(&self, view: &BotView<'_>, rng: &mut StdRng) -> Option<SlotRef> {
        let target = view.opponents.choose(rng)?.clone();
        let slots: Vec<usize> = view
            .game
            .hands
            .get(&target)
            .map(|h| h.cards().map(|(i, _)| i).collect())
            .unwrap_or_default();
        let slot = slots.choose(rng).copied()?;
        Some(SlotRef::new(target, slot))
    }

    /// Two distinct opponent positions to inspect with a black king.
    fn two_opponent_slots(
        &self,
        view: &BotView<'_>,
        rng: &mut StdRng,
    ) -> Option<(SlotRef, SlotRef)> {
        let mut all: Vec<SlotRef> = Vec::new();
        for target in view.opponents {
            if let Some(hand) = view.game.hands.get(target) {
                for (slot, _) in hand.cards() {
                    all.push(SlotRef::new(target.clone(), slot));
                }
            }
        }
        if all.len() < 2 {
            return None;
        }
        all.shuffle(rng);
        let mut picks = all.into_iter();
        Some((picks.next()?, picks.next()?))
    }
}

impl BotStrategy for MediumBot {
    fn should_call_red_king(&self, view: &BotView<'_>) -> bool {
        let known = view.known_own();
        if known.len() < MIN_KNOWN_FOR_CALL {
            return false;
        }
        let known_sum: i32 = known.iter().map(|(_, card)| point_value(*card)).sum();
        known_sum <= MAX_KNOWN_SUM_FOR_CALL
            && view.estimated_score(UNKNOWN_VALUE) <= MAX_ESTIMATE_FOR_CALL
    }

    fn decide_keep_or_discard(&self, view: &BotView<'_>, drawn: Card) -> DrawDecision {
        match view.worst_known() {
            Some((slot, worst)) if point_value(drawn) < point_value(worst) => {
                DrawDecision::Keep { slot }
            }
            _ => DrawDecision::Discard,
        }
    }

    fn decide_rule_usage(&self, view: &BotView<'_>, rule: RuleType) -> RuleDecision {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(_) => return RuleDecision::Skip,
        };
        match rule {
            RuleType::PeekOwn => match view.unknown_own_slots().first().copied() {
                Some(slot) => RuleDecision::PeekOwn { slot },
                None => RuleDecision::Skip,
            },
            RuleType::PeekOther => match self.random_opponent_slot(view, &mut rng) {
                Some(target) => RuleDecision::PeekOther { target },
                None => RuleDecision::Skip,
            },
            RuleType::BlindSwitch => {
                let Some((own_slot, _)) = view.worst_known() else {
                    return RuleDecision::Skip;
                };
                match self.random_opponent_slot(view, &mut rng) {
                    Some(target) => RuleDecision::BlindSwitch { own_slot, target },
                    None => RuleDecision::Skip,
                }
            }
            RuleType::BlackKing => {
                let Some((first, second)) = self.two_opponent_slots(view, &mut rng) else {
                    return RuleDecision::Skip;
                };
                // The peek shows these two cards; pre-evaluate the better
                // one against our worst remembered card.
                let value_of = |slot_ref: &SlotRef| {
                    view.game
                        .hands
                        .get(&slot_ref.player_id)
                        .and_then(|h| h.get(slot_ref.slot_index))
                        .map(point_value)
                };
                let best = [&first, &second]
                    .into_iter()
                    .filter_map(|r| value_of(r).map(|v| (r.clone(), v)))
                    .min_by_key(|(_, v)| *v);
                let switch = match (view.worst_known(), best) {
                    (Some((own_slot, worst)), Some((their, value)))
                        if value < point_value(worst) =>
                    {
                        Some((
                            SlotRef::new(view.bot_id.to_string(), own_slot),
                            their,
                        ))
                    }
                    _ => None,
                };
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
        _view: &BotView<'_>,
        _slot_index: usize,
        known: Card,
        top_discard: Card,
    ) -> bool {
        known.rank == top_discard.rank
    }
}
