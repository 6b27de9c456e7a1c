use crate::domain::rules::call_red_king;
use crate::domain::state::{GameState, Phase};

fn players(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("p{i}")).collect()
}

#[test]
fn first_turn_goes_to_the_player_after_the_host() {
    let roster = players(4);
    let mut state = GameState::deal(&roster, 9).unwrap();
    state.begin_play();
    assert_eq!(state.current_turn(), Some(&roster[1]));

    // A full rotation comes back around.
    for _ in 0..4 {
        state.advance_turn();
    }
    assert_eq!(state.current_turn(), Some(&roster[1]));
}

#[test]
fn peek_phase_waits_for_everyone() {
    let roster = players(3);
    let mut state = GameState::deal(&roster, 11).unwrap();
    assert_eq!(state.phase, Phase::Peek);
    assert_eq!(state.current_turn(), None);

    assert!(state.mark_peek_done("p0"));
    // Repeats do not count twice.
    assert!(!state.mark_peek_done("p0"));
    assert!(!state.peek_complete(&roster));

    state.mark_peek_done("p1");
    state.mark_peek_done("p2");
    assert!(state.peek_complete(&roster));
}

#[test]
fn departing_player_no_longer_blocks_peek() {
    let roster = players(3);
    let mut state = GameState::deal(&roster, 11).unwrap();
    state.mark_peek_done("p0");
    state.mark_peek_done("p2");

    state.remove_player("p1");
    let remaining: Vec<String> = roster.iter().filter(|p| *p != "p1").cloned().collect();
    assert!(state.peek_complete(&remaining));
}

#[test]
fn redemption_order_skips_the_caller() {
    let roster = players(3);
    let mut state = GameState::deal(&roster, 21).unwrap();
    state.begin_play();

    // Walk the turn to p0 (turn order is p1, p2, p0).
    state.advance_turn();
    state.advance_turn();
    assert_eq!(state.current_turn().map(String::as_str), Some("p0"));

    call_red_king(&mut state, "p0").unwrap();
    assert_eq!(state.phase, Phase::Redemption);
    assert_eq!(state.redemption_order, vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(state.current_turn().map(String::as_str), Some("p1"));

    state.advance_turn();
    assert_eq!(state.current_turn().map(String::as_str), Some("p2"));
    state.advance_turn();
    assert_eq!(state.phase, Phase::Reveal);
    assert_eq!(state.current_turn(), None);
}

#[test]
fn solo_red_king_call_goes_straight_to_reveal() {
    let roster = players(1);
    let mut state = GameState::deal(&roster, 3).unwrap();
    state.begin_play();
    call_red_king(&mut state, "p0").unwrap();
    assert_eq!(state.phase, Phase::Reveal);
}

#[test]
fn removing_the_turn_holder_clamps_the_index() {
    let roster = players(3);
    let mut state = GameState::deal(&roster, 17).unwrap();
    state.begin_play();
    // Turn order p1, p2, p0; move to the last seat.
    state.advance_turn();
    state.advance_turn();
    assert_eq!(state.turn_index, 2);

    state.remove_player("p0");
    assert_eq!(state.turn_order, vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(state.turn_index, 0);
    assert!(state.hands.get("p0").is_none());
}

#[test]
fn leaver_holding_a_drawn_card_discards_it() {
    let roster = players(2);
    let mut state = GameState::deal(&roster, 17).unwrap();
    state.begin_play();
    let turn = state.current_turn().unwrap().clone();
    let card = crate::domain::rules::draw_from_deck(&mut state, &turn)
        .unwrap()
        .unwrap();

    state.remove_player(&turn);
    assert_eq!(state.drawn_card, None);
    assert_eq!(state.top_discard(), Some(card));
}

#[test]
fn mid_redemption_departures_can_finish_the_game() {
    let roster = players(3);
    let mut state = GameState::deal(&roster, 23).unwrap();
    state.begin_play();
    state.advance_turn();
    state.advance_turn();
    call_red_king(&mut state, "p0").unwrap();

    // Both redeemers leave before acting; the game has nobody left to
    // wait for.
    state.remove_player("p1");
    state.remove_player("p2");
    assert_eq!(state.phase, Phase::Reveal);
}
