//! The rule engine: every hand-mutating operation of a running game.
//!
//! All operations are pure, synchronous functions over [`GameState`].
//! Guards come first (phase, turn, slot occupancy, caller protection) and
//! violations return typed errors; the controller logs and drops them
//! rather than answering the client, so a stale UI simply self-corrects on
//! the next broadcast.

use crate::domain::cards::{rule_type, Card, RuleType};
use crate::domain::deck::draw;
use crate::domain::hand::swap_between;
use crate::domain::state::{require_hand, require_hand_mut, GameState, Phase};
use crate::errors::DomainError;

/// Result of discarding the drawn card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiscardOutcome {
    /// No rule attached; the turn has advanced.
    Plain(Card),
    /// Rule card: the discarder must now use or skip the rule, so the
    /// turn has not advanced.
    Rule { card: Card, rule: RuleType },
}

/// Result of a match attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    /// Own-card match: the slot is now a gap and the card tops the
    /// discard pile.
    Matched { card: Card },
    /// Other-player match: correct claim, nothing mutated yet; the caller
    /// owes the target a card via `give_after_match`.
    MatchedPending { card: Card },
    /// Wrong claim: the revealed card stays put and the caller draws a
    /// penalty (unless the deck ran dry).
    Penalty {
        revealed: Card,
        penalty_slot: Option<usize>,
    },
}

fn require_turn(state: &GameState, pid: &str) -> Result<(), DomainError> {
    if !state.in_playable_phase() {
        return Err(DomainError::PhaseMismatch);
    }
    if !state.is_current_turn(pid) {
        return Err(DomainError::OutOfTurn);
    }
    Ok(())
}

fn require_unprotected(state: &GameState, pid: &str) -> Result<(), DomainError> {
    if state.is_protected(pid) {
        return Err(DomainError::ProtectedTarget);
    }
    Ok(())
}

/// Draw the top card of the deck into the current player's hand-in-flight.
/// An empty deck is not an error: the turn simply moves on without a card.
pub fn draw_from_deck(state: &mut GameState, pid: &str) -> Result<Option<Card>, DomainError> {
    require_turn(state, pid)?;
    if state.drawn_card.is_some() {
        return Err(DomainError::DrawnStateMismatch);
    }
    match draw(&mut state.deck) {
        Ok(card) => {
            state.drawn_card = Some(card);
            state.drawn_by = Some(pid.to_string());
            Ok(Some(card))
        }
        Err(DomainError::EmptyDeck) => {
            state.advance_turn();
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

fn take_drawn(state: &mut GameState, pid: &str) -> Result<Card, DomainError> {
    require_turn(state, pid)?;
    if state.drawn_by.as_deref() != Some(pid) {
        return Err(DomainError::DrawnStateMismatch);
    }
    state
        .drawn_card
        .take()
        .ok_or(DomainError::DrawnStateMismatch)
}

/// Swap the drawn card into `slot`; the previous occupant goes face up
/// onto the discard pile and the turn advances.
pub fn keep_drawn(state: &mut GameState, pid: &str, slot: usize) -> Result<Card, DomainError> {
    require_turn(state, pid)?;
    // Validate the slot before consuming the drawn card.
    require_hand(&state.hands, pid)?
        .get(slot)
        .ok_or(DomainError::BadSlot)?;
    let drawn = take_drawn(state, pid)?;
    let old = require_hand_mut(&mut state.hands, pid)?.replace_at(slot, drawn)?;
    state.discard_pile.push(old);
    state.advance_turn();
    Ok(old)
}

/// Discard the drawn card. A rule card leaves the turn with the discarder
/// so they can execute (or skip) the rule.
pub fn discard_drawn(state: &mut GameState, pid: &str) -> Result<DiscardOutcome, DomainError> {
    let card = take_drawn(state, pid)?;
    state.discard_pile.push(card);
    match rule_type(card) {
        Some(rule) => {
            // Turn stays put; drawn state is already cleared.
            state.drawn_by = None;
            Ok(DiscardOutcome::Rule { card, rule })
        }
        None => {
            state.advance_turn();
            Ok(DiscardOutcome::Plain(card))
        }
    }
}

/// Privately reveal one of the caller's own cards. The turn advances on
/// an explicit `finish_peek`, not here.
pub fn peek_own(state: &GameState, pid: &str, slot: usize) -> Result<Card, DomainError> {
    require_turn(state, pid)?;
    require_hand(&state.hands, pid)?
        .get(slot)
        .ok_or(DomainError::BadSlot)
}

/// Privately reveal one of another player's cards.
pub fn peek_other(
    state: &GameState,
    pid: &str,
    target: &str,
    slot: usize,
) -> Result<Card, DomainError> {
    require_turn(state, pid)?;
    if target == pid {
        return Err(DomainError::BadSlot);
    }
    require_unprotected(state, target)?;
    require_hand(&state.hands, target)?
        .get(slot)
        .ok_or(DomainError::BadSlot)
}

/// Close out a peek rule and pass the turn.
pub fn finish_peek(state: &mut GameState, pid: &str) -> Result<(), DomainError> {
    require_turn(state, pid)?;
    state.advance_turn();
    Ok(())
}

/// Exchange two face-down cards without looking at either. Advances the
/// turn.
pub fn blind_switch(
    state: &mut GameState,
    pid: &str,
    first: &str,
    first_slot: usize,
    second: &str,
    second_slot: usize,
) -> Result<(), DomainError> {
    require_turn(state, pid)?;
    switch_slots(state, first, first_slot, second, second_slot)?;
    state.advance_turn();
    Ok(())
}

/// Privately reveal two cards to the black-king discarder. A switch or a
/// skip follows, so the turn does not advance here.
pub fn black_king_peek(
    state: &GameState,
    pid: &str,
    first: &str,
    first_slot: usize,
    second: &str,
    second_slot: usize,
) -> Result<(Card, Card), DomainError> {
    require_turn(state, pid)?;
    if first == second && first_slot == second_slot {
        return Err(DomainError::BadSlot);
    }
    require_unprotected(state, first)?;
    require_unprotected(state, second)?;
    let a = require_hand(&state.hands, first)?
        .get(first_slot)
        .ok_or(DomainError::BadSlot)?;
    let b = require_hand(&state.hands, second)?
        .get(second_slot)
        .ok_or(DomainError::BadSlot)?;
    Ok((a, b))
}

/// The switch half of the black-king rule; same mechanics as a blind
/// switch.
pub fn black_king_switch(
    state: &mut GameState,
    pid: &str,
    first: &str,
    first_slot: usize,
    second: &str,
    second_slot: usize,
) -> Result<(), DomainError> {
    blind_switch(state, pid, first, first_slot, second, second_slot)
}

/// Decline the black-king switch and pass the turn.
pub fn black_king_skip(state: &mut GameState, pid: &str) -> Result<(), DomainError> {
    require_turn(state, pid)?;
    state.advance_turn();
    Ok(())
}

fn switch_slots(
    state: &mut GameState,
    first: &str,
    first_slot: usize,
    second: &str,
    second_slot: usize,
) -> Result<(), DomainError> {
    require_unprotected(state, first)?;
    require_unprotected(state, second)?;
    if first == second {
        if first_slot == second_slot {
            return Err(DomainError::BadSlot);
        }
        let hand = require_hand_mut(&mut state.hands, first)?;
        let a = hand.get(first_slot).ok_or(DomainError::BadSlot)?;
        let b = hand.get(second_slot).ok_or(DomainError::BadSlot)?;
        hand.replace_at(first_slot, b)?;
        hand.replace_at(second_slot, a)?;
        return Ok(());
    }
    // Two distinct hands: take both out of the map to borrow independently.
    let mut hand_a = state
        .hands
        .remove(first)
        .ok_or_else(|| DomainError::Other(format!("no hand for player {first}")))?;
    let result = {
        let hand_b = require_hand_mut(&mut state.hands, second);
        match hand_b {
            Ok(hand_b) => swap_between(&mut hand_a, first_slot, hand_b, second_slot),
            Err(e) => Err(e),
        }
    };
    state.hands.insert(first.to_string(), hand_a);
    result
}

/// Out-of-turn claim that one of the caller's own cards matches the top
/// of the discard pile by rank. Never advances the turn and never touches
/// the in-flight drawn card.
pub fn match_own(
    state: &mut GameState,
    pid: &str,
    slot: usize,
) -> Result<MatchOutcome, DomainError> {
    if !state.in_playable_phase() {
        return Err(DomainError::PhaseMismatch);
    }
    require_unprotected(state, pid)?;
    let top = state.top_discard().ok_or(DomainError::EmptyDiscard)?;
    let revealed = require_hand(&state.hands, pid)?
        .get(slot)
        .ok_or(DomainError::BadSlot)?;

    if revealed.rank == top.rank {
        let card = require_hand_mut(&mut state.hands, pid)?.remove_at(slot)?;
        state.discard_pile.push(card);
        Ok(MatchOutcome::Matched { card })
    } else {
        let penalty_slot = apply_penalty(state, pid)?;
        Ok(MatchOutcome::Penalty {
            revealed,
            penalty_slot,
        })
    }
}

/// Out-of-turn claim against another player's card. A correct claim does
/// not mutate anything yet: the caller must follow up with
/// `give_after_match`. A wrong claim penalises the caller.
pub fn match_other(
    state: &mut GameState,
    pid: &str,
    target: &str,
    slot: usize,
) -> Result<MatchOutcome, DomainError> {
    if !state.in_playable_phase() {
        return Err(DomainError::PhaseMismatch);
    }
    if target == pid {
        return Err(DomainError::BadSlot);
    }
    require_unprotected(state, pid)?;
    require_unprotected(state, target)?;
    let top = state.top_discard().ok_or(DomainError::EmptyDiscard)?;
    let revealed = require_hand(&state.hands, target)?
        .get(slot)
        .ok_or(DomainError::BadSlot)?;

    if revealed.rank == top.rank {
        Ok(MatchOutcome::MatchedPending { card: revealed })
    } else {
        let penalty_slot = apply_penalty(state, pid)?;
        Ok(MatchOutcome::Penalty {
            revealed,
            penalty_slot,
        })
    }
}

/// Settle a correct other-player match: the matched card goes to the
/// discard pile and the caller hands one of their own cards across to
/// fill the hole they created.
pub fn give_after_match(
    state: &mut GameState,
    pid: &str,
    own_slot: usize,
    target: &str,
    target_slot: usize,
) -> Result<(Card, Card), DomainError> {
    if !state.in_playable_phase() {
        return Err(DomainError::PhaseMismatch);
    }
    if target == pid {
        return Err(DomainError::BadSlot);
    }
    require_unprotected(state, pid)?;
    require_unprotected(state, target)?;
    let top = state.top_discard().ok_or(DomainError::EmptyDiscard)?;
    let matched = require_hand(&state.hands, target)?
        .get(target_slot)
        .ok_or(DomainError::BadSlot)?;
    // No give without a preceding correct claim.
    if matched.rank != top.rank {
        return Err(DomainError::BadSlot);
    }
    require_hand(&state.hands, pid)?
        .get(own_slot)
        .ok_or(DomainError::BadSlot)?;

    let matched = require_hand_mut(&mut state.hands, target)?.remove_at(target_slot)?;
    state.discard_pile.push(matched);
    let given = require_hand_mut(&mut state.hands, pid)?.remove_at(own_slot)?;
    require_hand_mut(&mut state.hands, target)?.add_card(given);
    Ok((matched, given))
}

fn apply_penalty(state: &mut GameState, pid: &str) -> Result<Option<usize>, DomainError> {
    match draw(&mut state.deck) {
        Ok(card) => {
            let slot = require_hand_mut(&mut state.hands, pid)?.add_card(card);
            Ok(Some(slot))
        }
        // An empty deck waives the penalty.
        Err(DomainError::EmptyDeck) => Ok(None),
        Err(other) => Err(other),
    }
}

/// Declare the end-game. Legal only mid-play, on the caller's turn, with
/// no card in flight. Everyone else gets exactly one more turn, starting
/// from the player after the caller.
pub fn call_red_king(state: &mut GameState, pid: &str) -> Result<(), DomainError> {
    if state.phase != Phase::Play {
        return Err(DomainError::PhaseMismatch);
    }
    if !state.is_current_turn(pid) {
        return Err(DomainError::OutOfTurn);
    }
    if state.drawn_card.is_some() {
        return Err(DomainError::DrawnStateMismatch);
    }
    if state.red_king_caller.is_some() {
        return Err(DomainError::PhaseMismatch);
    }

    let caller_idx = state
        .turn_order
        .iter()
        .position(|p| p == pid)
        .ok_or(DomainError::OutOfTurn)?;
    let mut order: Vec<_> = state.turn_order[caller_idx + 1..].to_vec();
    order.extend_from_slice(&state.turn_order[..caller_idx]);

    state.red_king_caller = Some(pid.to_string());
    state.redemption_order = order;
    state.redemption_index = 0;
    state.phase = Phase::Redemption;

    if state.redemption_order.is_empty() {
        // Solo game: nobody redeems.
        state.phase = Phase::Reveal;
    }
    Ok(())
}
