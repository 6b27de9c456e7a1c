//! Easy bot: mostly dice rolls.
//!
//! Plays loose and never risks an out-of-turn match. The point of this
//! tier is to be beatable while still producing legal, plausible turns.

use std::sync::Mutex;

use rand::prelude::*;

use crate::ai::trait_def::{BotStrategy, BotView, DrawDecision, RuleDecision, SlotRef};
use crate::domain::{Card, RuleType};

const UNKNOWN_VALUE: i32 = 6;
const CALL_THRESHOLD: i32 = 10;
const KEEP_CHANCE: f64 = 0.4;
const RULE_CHANCE: f64 = 0.5;

pub struct EasyBot {
    rng: Mutex<StdRng>,
}

impl EasyBot {
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
}

impl BotStrategy for EasyBot {
    fn should_call_red_king(&self, view: &BotView<'_>) -> bool {
        if view.estimated_score(UNKNOWN_VALUE) >= CALL_THRESHOLD {
            return false;
        }
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(_) => return false,
        };
        rng.gen_bool(0.5)
    }

    fn decide_keep_or_discard(&self, view: &BotView<'_>, _drawn: Card) -> DrawDecision {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(_) => return DrawDecision::Discard,
        };
        if !rng.gen_bool(KEEP_CHANCE) {
            return DrawDecision::Discard;
        }
        match view.own_slots().choose(&mut *rng).copied() {
            Some(slot) => DrawDecision::Keep { slot },
            None => DrawDecision::Discard,
        }
    }

    fn decide_rule_usage(&self, view: &BotView<'_>, rule: RuleType) -> RuleDecision {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(_) => return RuleDecision::Skip,
        };
        if !rng.gen_bool(RULE_CHANCE) {
            return RuleDecision::Skip;
        }
        match rule {
            RuleType::PeekOwn => match view.own_slots().choose(&mut *rng).copied() {
                Some(slot) => RuleDecision::PeekOwn { slot },
                None => RuleDecision::Skip,
            },
            RuleType::PeekOther => match self.random_opponent_slot(view, &mut rng) {
                Some(target) => RuleDecision::PeekOther { target },
                None => RuleDecision::Skip,
            },
            RuleType::BlindSwitch => {
                let own_slot = view.own_slots().choose(&mut *rng).copied();
                let target = self.random_opponent_slot(view, &mut rng);
                match (own_slot, target) {
                    (Some(own_slot), Some(target)) => {
                        RuleDecision::BlindSwitch { own_slot, target }
                    }
                    _ => RuleDecision::Skip,
                }
            }
            RuleType::BlackKing => {
                // Peek two cards for show; an easy bot never follows up.
                let first = self.random_opponent_slot(view, &mut rng);
                let second = self.random_opponent_slot(view, &mut rng);
                match (first, second) {
                    (Some(first), Some(second)) if first != second => RuleDecision::BlackKing {
                        first,
                        second,
                        switch: None,
                    },
                    _ => RuleDecision::Skip,
                }
            }
        }
    }

    fn should_match_own(
        &self,
        _view: &BotView<'_>,
        _slot_index: usize,
        _known: Card,
        _top_discard: Card,
    ) -> bool {
        false
    }
}
