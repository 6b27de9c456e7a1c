//! Reveal-phase scoring.

use crate::domain::cards::point_value;
use crate::domain::hand::Hand;
use crate::domain::state::{GameState, PlayerId};

/// Sum of point values over the occupied slots.
pub fn hand_score(hand: &Hand) -> i32 {
    hand.cards().map(|(_, card)| point_value(card)).sum()
}

/// Pick the winner at reveal: lowest score wins. The Red King caller
/// loses ties; among tied non-callers the first in turn order wins.
pub fn determine_winner(state: &GameState) -> Option<PlayerId> {
    let scores: Vec<(PlayerId, i32)> = state
        .turn_order
        .iter()
        .filter_map(|pid| state.hands.get(pid).map(|h| (pid.clone(), hand_score(h))))
        .collect();

    let best = scores.iter().map(|(_, s)| *s).min()?;
    let caller = state.red_king_caller.as_deref();

    let mut tied = scores.iter().filter(|(_, s)| *s == best);
    let tied_count = tied.clone().count();
    if tied_count > 1 {
        // Ties go against the caller when a non-caller shares the score.
        if let Some((pid, _)) = tied
            .clone()
            .find(|(pid, _)| Some(pid.as_str()) != caller)
        {
            return Some(pid.clone());
        }
    }
    tied.next().map(|(pid, _)| pid.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::{Card, Rank, Suit};
    use crate::domain::state::GameState;

    fn hand_of(ranks: &[Rank]) -> Hand {
        Hand::new(
            ranks
                .iter()
                .map(|&rank| Card::new(Suit::Clubs, rank))
                .collect(),
        )
    }

    fn two_player_state(p1_hand: Hand, p2_hand: Hand) -> GameState {
        let players = vec!["p1".to_string(), "p2".to_string()];
        let mut state = GameState::deal(&players, 7).unwrap();
        state.hands.insert("p1".into(), p1_hand);
        state.hands.insert("p2".into(), p2_hand);
        state
    }

    #[test]
    fn score_skips_gaps_and_counts_red_kings_negative() {
        let mut hand = hand_of(&[Rank::Five, Rank::Five, Rank::Two, Rank::Ace]);
        hand.remove_at(1).unwrap();
        assert_eq!(hand_score(&hand), 8);

        let red = Hand::new(vec![
            Card::new(Suit::Hearts, Rank::King),
            Card::new(Suit::Diamonds, Rank::King),
            Card::joker(0),
            Card::new(Suit::Spades, Rank::King),
        ]);
        assert_eq!(hand_score(&red), 8);
    }

    #[test]
    fn lowest_score_wins() {
        let mut state = two_player_state(
            hand_of(&[Rank::Two, Rank::Two, Rank::Two, Rank::Two]),
            hand_of(&[Rank::Nine, Rank::Nine, Rank::Nine, Rank::Nine]),
        );
        state.red_king_caller = Some("p2".into());
        assert_eq!(determine_winner(&state).as_deref(), Some("p1"));
    }

    #[test]
    fn caller_loses_ties() {
        // Both players score 10; the caller must lose the tie.
        let mut state = two_player_state(
            hand_of(&[Rank::Five, Rank::Five]),
            hand_of(&[Rank::Seven, Rank::Three]),
        );
        state.red_king_caller = Some("p1".into());
        assert_eq!(determine_winner(&state).as_deref(), Some("p2"));

        state.red_king_caller = Some("p2".into());
        assert_eq!(determine_winner(&state).as_deref(), Some("p1"));
    }

    #[test]
    fn caller_wins_outright_minimum() {
        let mut state = two_player_state(
            hand_of(&[Rank::Ace, Rank::Ace]),
            hand_of(&[Rank::Ten, Rank::Ten]),
        );
        state.red_king_caller = Some("p1".into());
        assert_eq!(determine_winner(&state).as_deref(), Some("p1"));
    }
}
