use std::collections::BTreeMap;

use crate::domain::cards::{Card, Rank, Suit};
use crate::domain::deck::full_deck;
use crate::domain::rules::{
    blind_switch, call_red_king, discard_drawn, draw_from_deck, give_after_match, keep_drawn,
    match_other, match_own, DiscardOutcome, MatchOutcome,
};
use crate::domain::state::{GameState, Phase};
use crate::errors::DomainError;

fn players(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("p{i}")).collect()
}

fn dealt_state(n: usize) -> GameState {
    let mut state = GameState::deal(&players(n), 42).unwrap();
    state.begin_play();
    state
}

/// Multiset of card ids across every live zone.
fn zone_ids(state: &GameState) -> BTreeMap<String, usize> {
    let mut ids = BTreeMap::new();
    let mut bump = |card: Card| *ids.entry(card.id()).or_insert(0) += 1;
    for card in &state.deck {
        bump(*card);
    }
    for hand in state.hands.values() {
        for (_, card) in hand.cards() {
            bump(card);
        }
    }
    for card in &state.discard_pile {
        bump(*card);
    }
    if let Some(card) = state.drawn_card {
        bump(card);
    }
    ids
}

fn assert_conserved(state: &GameState) {
    let mut reference = BTreeMap::new();
    for card in full_deck() {
        *reference.entry(card.id()).or_insert(0usize) += 1;
    }
    assert_eq!(zone_ids(state), reference, "card conservation violated");
}

#[test]
fn deal_conservation_two_players() {
    let state = GameState::deal(&players(2), 1).unwrap();
    for pid in players(2) {
        assert_eq!(state.hands[&pid].card_count(), 4);
    }
    assert_eq!(state.deck.len(), 46);
    assert!(state.discard_pile.is_empty());
    assert_conserved(&state);
}

#[test]
fn conservation_through_a_full_turn() {
    let mut state = dealt_state(3);
    let turn = state.current_turn().unwrap().clone();

    let drawn = draw_from_deck(&mut state, &turn).unwrap().unwrap();
    assert_eq!(state.drawn_card, Some(drawn));
    assert_conserved(&state);

    keep_drawn(&mut state, &turn, 2).unwrap();
    assert_conserved(&state);
    assert_eq!(state.discard_pile.len(), 1);
}

#[test]
fn draw_twice_is_rejected() {
    let mut state = dealt_state(2);
    let turn = state.current_turn().unwrap().clone();
    draw_from_deck(&mut state, &turn).unwrap();
    assert_eq!(
        draw_from_deck(&mut state, &turn),
        Err(DomainError::DrawnStateMismatch)
    );
}

#[test]
fn empty_deck_draw_advances_without_a_card() {
    let mut state = dealt_state(2);
    state.deck.clear();
    let turn = state.current_turn().unwrap().clone();
    let next = state.turn_order[(state.turn_index + 1) % state.turn_order.len()].clone();

    assert_eq!(draw_from_deck(&mut state, &turn), Ok(None));
    assert_eq!(state.drawn_card, None);
    assert_eq!(state.current_turn(), Some(&next));
}

#[test]
fn discard_of_plain_card_advances_turn() {
    let mut state = dealt_state(2);
    let turn = state.current_turn().unwrap().clone();
    state.drawn_card = Some(Card::new(Suit::Hearts, Rank::Two));
    state.drawn_by = Some(turn.clone());

    let outcome = discard_drawn(&mut state, &turn).unwrap();
    assert_eq!(
        outcome,
        DiscardOutcome::Plain(Card::new(Suit::Hearts, Rank::Two))
    );
    assert_ne!(state.current_turn(), Some(&turn));
}

#[test]
fn discard_of_rule_card_holds_the_turn() {
    let mut state = dealt_state(2);
    let turn = state.current_turn().unwrap().clone();
    state.drawn_card = Some(Card::new(Suit::Clubs, Rank::Seven));
    state.drawn_by = Some(turn.clone());

    let outcome = discard_drawn(&mut state, &turn).unwrap();
    assert!(matches!(outcome, DiscardOutcome::Rule { .. }));
    assert_eq!(state.current_turn(), Some(&turn));
    assert_eq!(state.drawn_card, None);
}

#[test]
fn match_own_success_leaves_gap_and_tops_discard() {
    let mut state = dealt_state(2);
    state.discard_pile.push(Card::new(Suit::Hearts, Rank::Five));
    let caller = state.turn_order[1].clone();
    state
        .hands
        .get_mut(&caller)
        .unwrap()
        .replace_at(0, Card::new(Suit::Clubs, Rank::Five))
        .unwrap();

    let outcome = match_own(&mut state, &caller, 0).unwrap();
    assert_eq!(
        outcome,
        MatchOutcome::Matched {
            card: Card::new(Suit::Clubs, Rank::Five)
        }
    );
    assert_eq!(state.hands[&caller].get(0), None);
    assert_eq!(state.top_discard(), Some(Card::new(Suit::Clubs, Rank::Five)));
}

#[test]
fn wrong_match_penalty_fills_the_first_gap() {
    let mut state = dealt_state(2);
    state.discard_pile.push(Card::new(Suit::Hearts, Rank::Five));
    let caller = state.turn_order[0].clone();
    let hand = state.hands.get_mut(&caller).unwrap();
    hand.replace_at(0, Card::new(Suit::Clubs, Rank::Nine)).unwrap();
    hand.remove_at(2).unwrap();
    assert_eq!(hand.layout(), vec![true, true, false, true]);

    let outcome = match_own(&mut state, &caller, 0).unwrap();
    let MatchOutcome::Penalty { penalty_slot, .. } = outcome else {
        panic!("expected a penalty, got {outcome:?}");
    };
    assert_eq!(penalty_slot, Some(2));
    assert_eq!(state.hands[&caller].len(), 4);
    assert_eq!(state.hands[&caller].card_count(), 4);
}

#[test]
fn match_does_not_disturb_the_current_turn() {
    let mut state = dealt_state(3);
    let turn = state.current_turn().unwrap().clone();
    let drawn = draw_from_deck(&mut state, &turn).unwrap().unwrap();

    state.discard_pile.push(Card::new(Suit::Hearts, Rank::Five));
    let caller = state
        .turn_order
        .iter()
        .find(|p| **p != turn)
        .unwrap()
        .clone();
    state
        .hands
        .get_mut(&caller)
        .unwrap()
        .replace_at(1, Card::new(Suit::Spades, Rank::Five))
        .unwrap();

    match_own(&mut state, &caller, 1).unwrap();
    assert_eq!(state.current_turn(), Some(&turn));
    assert_eq!(state.drawn_card, Some(drawn));
}

#[test]
fn match_other_then_give_moves_both_cards() {
    let mut state = dealt_state(2);
    state.discard_pile.push(Card::new(Suit::Hearts, Rank::Five));
    let caller = state.turn_order[0].clone();
    let target = state.turn_order[1].clone();
    state
        .hands
        .get_mut(&target)
        .unwrap()
        .replace_at(3, Card::new(Suit::Diamonds, Rank::Five))
        .unwrap();
    let given_card = state.hands[&caller].get(1).unwrap();

    let outcome = match_other(&mut state, &caller, &target, 3).unwrap();
    assert_eq!(
        outcome,
        MatchOutcome::MatchedPending {
            card: Card::new(Suit::Diamonds, Rank::Five)
        }
    );
    // Nothing moved yet.
    assert_eq!(
        state.hands[&target].get(3),
        Some(Card::new(Suit::Diamonds, Rank::Five))
    );

    let (matched, given) = give_after_match(&mut state, &caller, 1, &target, 3).unwrap();
    assert_eq!(matched, Card::new(Suit::Diamonds, Rank::Five));
    assert_eq!(given, given_card);
    assert_eq!(state.top_discard(), Some(matched));
    assert_eq!(state.hands[&caller].get(1), None);
    // The given card refills the slot the match opened.
    assert_eq!(state.hands[&target].get(3), Some(given_card));
    assert_conserved(&state);
}

#[test]
fn blind_switch_twice_restores_the_hands() {
    let mut state = dealt_state(2);
    let first = state.turn_order[0].clone();
    let second = state.turn_order[1].clone();
    let before = state.hands.clone();

    blind_switch(&mut state, &first, &first, 0, &second, 2).unwrap();
    assert_ne!(state.hands, before);
    // The turn advanced, so the counterpart switch comes from the other
    // player.
    blind_switch(&mut state, &second, &first, 0, &second, 2).unwrap();
    assert_eq!(state.hands, before);
}

#[test]
fn keep_twice_with_the_redrawn_card_restores_the_hand() {
    let mut state = dealt_state(2);
    let turn = state.current_turn().unwrap().clone();
    let original = state.hands[&turn].clone();
    let incoming = Card::new(Suit::Spades, Rank::Queen);

    state.drawn_card = Some(incoming);
    state.drawn_by = Some(turn.clone());
    let displaced = keep_drawn(&mut state, &turn, 2).unwrap();

    // Simulate immediately re-drawing the displaced card.
    state.turn_index = state.turn_order.iter().position(|p| *p == turn).unwrap();
    state.drawn_card = Some(displaced);
    state.drawn_by = Some(turn.clone());
    let displaced_again = keep_drawn(&mut state, &turn, 2).unwrap();

    assert_eq!(displaced_again, incoming);
    assert_eq!(state.hands[&turn], original);
    assert_eq!(state.discard_pile, vec![displaced, incoming]);
}

#[test]
fn red_king_call_requires_no_drawn_card() {
    let mut state = dealt_state(3);
    let turn = state.current_turn().unwrap().clone();
    draw_from_deck(&mut state, &turn).unwrap();
    assert_eq!(
        call_red_king(&mut state, &turn),
        Err(DomainError::DrawnStateMismatch)
    );
}

#[test]
fn redemption_protects_the_caller_from_everything() {
    let mut state = dealt_state(3);
    let caller = state.current_turn().unwrap().clone();
    call_red_king(&mut state, &caller).unwrap();
    assert_eq!(state.phase, Phase::Redemption);
    state.discard_pile.push(Card::new(Suit::Hearts, Rank::Five));

    let redeemer = state.current_turn().unwrap().clone();
    assert_eq!(
        match_other(&mut state, &redeemer, &caller, 0),
        Err(DomainError::ProtectedTarget)
    );
    assert_eq!(
        match_own(&mut state, &caller, 0),
        Err(DomainError::ProtectedTarget)
    );
    assert_eq!(
        blind_switch(&mut state, &redeemer, &redeemer, 0, &caller, 0),
        Err(DomainError::ProtectedTarget)
    );
}

#[test]
fn wrong_phase_commands_are_rejected() {
    let mut state = GameState::deal(&players(2), 5).unwrap();
    // Still in peek.
    let pid = state.turn_order[0].clone();
    assert_eq!(
        draw_from_deck(&mut state, &pid),
        Err(DomainError::PhaseMismatch)
    );
    assert_eq!(match_own(&mut state, &pid, 0), Err(DomainError::PhaseMismatch));
    assert_eq!(call_red_king(&mut state, &pid), Err(DomainError::PhaseMismatch));
}

#[test]
fn out_of_turn_draw_is_rejected() {
    let mut state = dealt_state(3);
    let not_turn = state.turn_order[1].clone();
    assert_eq!(
        draw_from_deck(&mut state, &not_turn),
        Err(DomainError::OutOfTurn)
    );
}

#[test]
fn hand_of_departed_player_cannot_be_matched() {
    let mut state = dealt_state(3);
    state.discard_pile.push(Card::new(Suit::Hearts, Rank::Five));
    let caller = state.turn_order[0].clone();
    let leaver = state.turn_order[2].clone();
    state.remove_player(&leaver);
    assert!(matches!(
        match_other(&mut state, &caller, &leaver, 0),
        Err(DomainError::Other(_))
    ));
}
