//! Per-room game state and the phase/turn machinery.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::domain::cards::Card;
use crate::domain::deck::{draw, shuffled_deck};
use crate::domain::hand::{Hand, INITIAL_SLOTS};
use crate::errors::DomainError;

pub type PlayerId = String;

/// Game progression phases.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Everyone memorises their bottom cards before play begins.
    Peek,
    /// Normal turn rotation.
    Play,
    /// Red King called; one final turn for each non-caller.
    Redemption,
    /// Hands face up, scores final.
    Reveal,
}

/// Entire per-game container, created at game start and dropped at game
/// end.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Remaining draw pile; the last element is the top.
    pub deck: Vec<Card>,
    pub hands: HashMap<PlayerId, Hand>,
    /// The last element is the visible top of the pile.
    pub discard_pile: Vec<Card>,
    pub phase: Phase,
    /// Players who have finished the initial peek.
    pub peek_done: HashSet<PlayerId>,
    /// Rotation for the play phase; insertion order of the room rotated by
    /// one so the player after the host acts first.
    pub turn_order: Vec<PlayerId>,
    pub turn_index: usize,
    /// The single card in flight mid-turn, and whose turn it belongs to.
    pub drawn_card: Option<Card>,
    pub drawn_by: Option<PlayerId>,
    pub red_king_caller: Option<PlayerId>,
    /// One turn each for non-callers, starting after the caller.
    pub redemption_order: Vec<PlayerId>,
    pub redemption_index: usize,
    /// Re-entrancy guard so a bot's scheduled action is never queued twice.
    pub pending_bot_turn: bool,
}

impl GameState {
    /// Deal a new game: shuffle, give every player four slots, and set up
    /// the peek phase. `player_ids` must be in room insertion order.
    pub fn deal(player_ids: &[PlayerId], seed: u64) -> Result<Self, DomainError> {
        if player_ids.is_empty() {
            return Err(DomainError::Other("cannot deal to zero players".into()));
        }

        let mut deck = shuffled_deck(seed);
        let mut hands = HashMap::with_capacity(player_ids.len());
        for pid in player_ids {
            let mut cards = Vec::with_capacity(INITIAL_SLOTS);
            for _ in 0..INITIAL_SLOTS {
                cards.push(draw(&mut deck)?);
            }
            hands.insert(pid.clone(), Hand::new(cards));
        }

        let mut turn_order: Vec<PlayerId> = player_ids.to_vec();
        turn_order.rotate_left(1);

        Ok(Self {
            deck,
            hands,
            discard_pile: Vec::new(),
            phase: Phase::Peek,
            peek_done: HashSet::new(),
            turn_order,
            turn_index: 0,
            drawn_card: None,
            drawn_by: None,
            red_king_caller: None,
            redemption_order: Vec::new(),
            redemption_index: 0,
            pending_bot_turn: false,
        })
    }

    /// Whose turn it is, if anyone can act.
    pub fn current_turn(&self) -> Option<&PlayerId> {
        match self.phase {
            Phase::Play => self.turn_order.get(self.turn_index),
            Phase::Redemption => self.redemption_order.get(self.redemption_index),
            Phase::Peek | Phase::Reveal => None,
        }
    }

    pub fn is_current_turn(&self, pid: &str) -> bool {
        self.current_turn().map(String::as_str) == Some(pid)
    }

    pub fn top_discard(&self) -> Option<Card> {
        self.discard_pile.last().copied()
    }

    /// A playable phase is one where hands may still change.
    pub fn in_playable_phase(&self) -> bool {
        matches!(self.phase, Phase::Play | Phase::Redemption)
    }

    /// The Red-King caller's hand is immutable during redemption.
    pub fn is_protected(&self, pid: &str) -> bool {
        self.phase == Phase::Redemption
            && self.red_king_caller.as_deref() == Some(pid)
    }

    /// Clear the in-flight card and hand the turn to the next player.
    /// During redemption the rotation runs out instead of wrapping, which
    /// moves the game to reveal.
    pub fn advance_turn(&mut self) {
        self.drawn_card = None;
        self.drawn_by = None;
        match self.phase {
            Phase::Play => {
                if !self.turn_order.is_empty() {
                    self.turn_index = (self.turn_index + 1) % self.turn_order.len();
                }
            }
            Phase::Redemption => {
                self.redemption_index += 1;
                if self.redemption_index >= self.redemption_order.len() {
                    self.phase = Phase::Reveal;
                }
            }
            Phase::Peek | Phase::Reveal => {}
        }
    }

    /// Record a player's peek-done; true only the first time.
    pub fn mark_peek_done(&mut self, pid: &str) -> bool {
        if self.phase != Phase::Peek {
            return false;
        }
        self.peek_done.insert(pid.to_string())
    }

    /// Whether every listed player has consented to start play.
    pub fn peek_complete(&self, player_ids: &[PlayerId]) -> bool {
        self.phase == Phase::Peek && player_ids.iter().all(|p| self.peek_done.contains(p))
    }

    pub fn begin_play(&mut self) {
        self.phase = Phase::Play;
        self.turn_index = 0;
    }

    /// Remove a departed player from the mid-game structures. Their hand
    /// leaves play with them; an in-flight drawn card goes to the discard
    /// pile so the live zones stay conserved.
    pub fn remove_player(&mut self, pid: &str) {
        self.hands.remove(pid);
        self.peek_done.remove(pid);

        if self.drawn_by.as_deref() == Some(pid) {
            if let Some(card) = self.drawn_card.take() {
                self.discard_pile.push(card);
            }
            self.drawn_by = None;
        }

        self.turn_order.retain(|p| p != pid);
        if self.turn_index >= self.turn_order.len() {
            self.turn_index = 0;
        }

        self.redemption_order.retain(|p| p != pid);
        if self.phase == Phase::Redemption
            && self.redemption_index >= self.redemption_order.len()
        {
            self.phase = Phase::Reveal;
        }
    }

    pub fn deck_count(&self) -> usize {
        self.deck.len()
    }
}

pub fn require_hand<'a>(
    hands: &'a HashMap<PlayerId, Hand>,
    pid: &str,
) -> Result<&'a Hand, DomainError> {
    hands
        .get(pid)
        .ok_or_else(|| DomainError::Other(format!("no hand for player {pid}")))
}

pub fn require_hand_mut<'a>(
    hands: &'a mut HashMap<PlayerId, Hand>,
    pid: &str,
) -> Result<&'a mut Hand, DomainError> {
    hands
        .get_mut(pid)
        .ok_or_else(|| DomainError::Other(format!("no hand for player {pid}")))
}
