//! In-game commands: peeking, drawing, discarding, rules, matches.
//!
//! Handlers validate through the rule engine, then translate outcomes
//! into scoped events. The `apply_*` helpers are shared with the bot
//! driver so bot turns run under exactly the same rules as human ones.

use std::sync::Arc;

use tracing::info;

use super::{layouts_updated, phase_changed, turn_finish_events, turn_update, CommandEffects,
            GameFlowService};
use crate::domain::rules::{self, DiscardOutcome, MatchOutcome};
use crate::domain::state::GameState;
use crate::domain::{rule_type, Phase};
use crate::protocol::{
    HighlightKind, HighlightRef, MatchType, Outbound, PeekedCard, ServerEvent,
};
use crate::services::rooms::{Room, RoomRegistry, RoomState};
use crate::DomainError;

fn require_game<'a>(room: &'a mut Room) -> Result<&'a mut GameState, DomainError> {
    if room.state != RoomState::Playing {
        return Err(DomainError::PhaseMismatch);
    }
    room.game.as_mut().ok_or(DomainError::PhaseMismatch)
}

fn playing_room<'a>(
    registry: &'a mut RoomRegistry,
    pid: &str,
) -> Result<&'a mut Room, DomainError> {
    registry.room_of_mut(pid).ok_or(DomainError::PhaseMismatch)
}

impl GameFlowService {
    pub(super) fn peek_done(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let ids = room.player_ids();
        let game = require_game(room)?;
        if !game.mark_peek_done(pid) {
            return Err(DomainError::PhaseMismatch);
        }

        let mut events = vec![Outbound::room(ServerEvent::PlayerPeekDone {
            player_id: pid.to_string(),
        })];
        if game.peek_complete(&ids) {
            game.begin_play();
            events.push(Outbound::room(phase_changed(game)));
        }
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn draw_card(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let (events, _) = apply_draw(room, pid)?;
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn keep_card(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let events = apply_keep(room, pid, slot)?;
        Ok(CommandEffects::in_room(room.code.clone(), events).with_discard())
    }

    pub(super) fn discard_card(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let (events, _) = apply_discard(room, pid)?;
        Ok(CommandEffects::in_room(room.code.clone(), events).with_discard())
    }

    pub(super) fn skip_rule(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let events = apply_pass_turn(room, pid)?;
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn use_peek_own(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let game = require_game(room)?;
        let card = rules::peek_own(game, pid, slot)?;
        let events = vec![Outbound::private(
            pid,
            ServerEvent::PeekResult {
                card,
                slot_index: slot,
                target_id: None,
            },
        )];
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn use_peek_other(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        target: &str,
        slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let game = require_game(room)?;
        let card = rules::peek_other(game, pid, target, slot)?;
        let events = vec![Outbound::private(
            pid,
            ServerEvent::PeekResult {
                card,
                slot_index: slot,
                target_id: Some(target.to_string()),
            },
        )];
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn finish_peek(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let events = apply_pass_turn(room, pid)?;
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn use_blind_switch(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        first: &str,
        first_slot: usize,
        second: &str,
        second_slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let events = apply_switch(room, pid, first, first_slot, second, second_slot)?;
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn use_black_king_peek(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        first: &str,
        first_slot: usize,
        second: &str,
        second_slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let game = require_game(room)?;
        let (a, b) = rules::black_king_peek(game, pid, first, first_slot, second, second_slot)?;
        let events = vec![Outbound::private(
            pid,
            ServerEvent::BlackKingPeekResult {
                first: PeekedCard {
                    player_id: first.to_string(),
                    slot_index: first_slot,
                    card: a,
                },
                second: PeekedCard {
                    player_id: second.to_string(),
                    slot_index: second_slot,
                    card: b,
                },
            },
        )];
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn use_black_king_switch(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        first: &str,
        first_slot: usize,
        second: &str,
        second_slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        self.use_blind_switch(registry, pid, first, first_slot, second, second_slot)
    }

    pub(super) fn use_black_king_skip(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let events = apply_pass_turn(room, pid)?;
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn call_match_own(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let (events, discard_changed) = apply_match_own(room, pid, slot)?;
        let effects = CommandEffects::in_room(room.code.clone(), events);
        Ok(if discard_changed {
            effects.with_discard()
        } else {
            effects
        })
    }

    pub(super) fn call_match_other(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        target: &str,
        slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let game = require_game(room)?;
        let outcome = rules::match_other(game, pid, target, slot)?;
        info!(room_code = %room.code, caller = pid, target_id = target, slot, success = matches!(outcome, MatchOutcome::MatchedPending { .. }), "match-other called");

        let events = match outcome {
            MatchOutcome::MatchedPending { card } => {
                vec![
                    Outbound::room(ServerEvent::MatchResult {
                        caller_id: pid.to_string(),
                        target_id: Some(target.to_string()),
                        card,
                        success: true,
                        match_type: MatchType::Other,
                    }),
                    Outbound::room(ServerEvent::CardsHighlighted {
                        cards: vec![HighlightRef {
                            player_id: target.to_string(),
                            slot_index: slot,
                        }],
                        kind: HighlightKind::Match,
                    }),
                ]
            }
            MatchOutcome::Penalty {
                revealed,
                penalty_slot,
            } => penalty_events(room, pid, target, revealed, penalty_slot, MatchType::Other),
            MatchOutcome::Matched { .. } => {
                return Err(DomainError::Other(
                    "match_other cannot settle immediately".into(),
                ))
            }
        };
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn give_card_after_match(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        own_slot: usize,
        target: &str,
        target_slot: usize,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let game = require_game(room)?;
        let (matched, _given) =
            rules::give_after_match(game, pid, own_slot, target, target_slot)?;
        info!(room_code = %room.code, caller = pid, target_id = target, card = %matched.id(), "match settled");

        forget_for_all_bots(room, pid, own_slot);
        forget_for_all_bots(room, target, target_slot);

        let game = room.game.as_ref().ok_or(DomainError::PhaseMismatch)?;
        let events = vec![
            Outbound::room(ServerEvent::CardsHighlighted {
                cards: vec![
                    HighlightRef {
                        player_id: pid.to_string(),
                        slot_index: own_slot,
                    },
                    HighlightRef {
                        player_id: target.to_string(),
                        slot_index: target_slot,
                    },
                ],
                kind: HighlightKind::Swap,
            }),
            hand_update(game, pid)?,
            hand_update(game, target)?,
            Outbound::room(layouts_updated(game)),
            Outbound::room(turn_update(game)),
        ];
        Ok(CommandEffects::in_room(room.code.clone(), events).with_discard())
    }

    pub(super) fn call_red_king(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = playing_room(registry, pid)?;
        let events = apply_call_red_king(room, pid)?;
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }
}

// ---- shared apply helpers (also driven by the bot coordinator) ----------

pub(super) fn apply_draw(
    room: &mut Room,
    pid: &str,
) -> Result<(Vec<Outbound>, Option<crate::domain::Card>), DomainError> {
    let name = room
        .player(pid)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| pid.to_string());
    let game = require_game(room)?;
    match rules::draw_from_deck(game, pid)? {
        Some(card) => {
            let rule = rule_type(card);
            let events = vec![
                Outbound::private(
                    pid,
                    ServerEvent::CardDrawn {
                        card,
                        has_rule: rule.is_some(),
                        rule_type: rule,
                    },
                ),
                Outbound::room_except(
                    pid,
                    ServerEvent::OpponentDrew {
                        player_id: pid.to_string(),
                        name,
                        deck_count: game.deck_count(),
                    },
                ),
            ];
            Ok((events, Some(card)))
        }
        // Deck empty: the turn moved on without a card.
        None => {
            let game = room.game.as_ref().ok_or(DomainError::PhaseMismatch)?;
            Ok((turn_finish_events(room, game), None))
        }
    }
}

pub(super) fn apply_keep(
    room: &mut Room,
    pid: &str,
    slot: usize,
) -> Result<Vec<Outbound>, DomainError> {
    let game = require_game(room)?;
    let discarded = rules::keep_drawn(game, pid, slot)?;
    forget_for_all_bots(room, pid, slot);

    let game = room.game.as_ref().ok_or(DomainError::PhaseMismatch)?;
    let mut events = vec![
        Outbound::room(ServerEvent::CardDiscarded {
            player_id: pid.to_string(),
            card: discarded,
            action: "kept the drawn card".to_string(),
        }),
        Outbound::room(ServerEvent::CardsHighlighted {
            cards: vec![HighlightRef {
                player_id: pid.to_string(),
                slot_index: slot,
            }],
            kind: HighlightKind::Swap,
        }),
        hand_update(game, pid)?,
    ];
    events.extend(turn_finish_events(room, game));
    Ok(events)
}

pub(super) fn apply_discard(
    room: &mut Room,
    pid: &str,
) -> Result<(Vec<Outbound>, Option<crate::domain::RuleType>), DomainError> {
    let game = require_game(room)?;
    let outcome = rules::discard_drawn(game, pid)?;

    match outcome {
        DiscardOutcome::Plain(card) => {
            let game = room.game.as_ref().ok_or(DomainError::PhaseMismatch)?;
            let mut events = vec![Outbound::room(ServerEvent::CardDiscarded {
                player_id: pid.to_string(),
                card,
                action: "discarded".to_string(),
            })];
            events.extend(turn_finish_events(room, game));
            Ok((events, None))
        }
        DiscardOutcome::Rule { card, rule } => {
            let events = vec![
                Outbound::room(ServerEvent::CardDiscarded {
                    player_id: pid.to_string(),
                    card,
                    action: "discarded a rule card".to_string(),
                }),
                Outbound::private(pid, ServerEvent::ExecuteRule { rule_type: rule, card }),
            ];
            Ok((events, Some(rule)))
        }
    }
}

/// Skip a rule, finish a peek, or decline a black-king switch: all of
/// them just hand the turn over.
pub(super) fn apply_pass_turn(room: &mut Room, pid: &str) -> Result<Vec<Outbound>, DomainError> {
    let game = require_game(room)?;
    rules::finish_peek(game, pid)?;
    let game = room.game.as_ref().ok_or(DomainError::PhaseMismatch)?;
    Ok(turn_finish_events(room, game))
}

pub(super) fn apply_switch(
    room: &mut Room,
    pid: &str,
    first: &str,
    first_slot: usize,
    second: &str,
    second_slot: usize,
) -> Result<Vec<Outbound>, DomainError> {
    let game = require_game(room)?;
    rules::blind_switch(game, pid, first, first_slot, second, second_slot)?;
    forget_for_all_bots(room, first, first_slot);
    forget_for_all_bots(room, second, second_slot);

    let game = room.game.as_ref().ok_or(DomainError::PhaseMismatch)?;
    let mut events = vec![Outbound::room(ServerEvent::CardsHighlighted {
        cards: vec![
            HighlightRef {
                player_id: first.to_string(),
                slot_index: first_slot,
            },
            HighlightRef {
                player_id: second.to_string(),
                slot_index: second_slot,
            },
        ],
        kind: HighlightKind::Switch,
    })];
    events.extend(turn_finish_events(room, game));
    Ok(events)
}

pub(super) fn apply_match_own(
    room: &mut Room,
    pid: &str,
    slot: usize,
) -> Result<(Vec<Outbound>, bool), DomainError> {
    let game = require_game(room)?;
    let outcome = rules::match_own(game, pid, slot)?;
    info!(room_code = %room.code, caller = pid, slot, success = matches!(outcome, MatchOutcome::Matched { .. }), "match-own called");

    match outcome {
        MatchOutcome::Matched { card } => {
            forget_for_all_bots(room, pid, slot);
            let game = room.game.as_ref().ok_or(DomainError::PhaseMismatch)?;
            let events = vec![
                Outbound::room(ServerEvent::MatchResult {
                    caller_id: pid.to_string(),
                    target_id: None,
                    card,
                    success: true,
                    match_type: MatchType::Own,
                }),
                Outbound::room(ServerEvent::CardsHighlighted {
                    cards: vec![HighlightRef {
                        player_id: pid.to_string(),
                        slot_index: slot,
                    }],
                    kind: HighlightKind::Match,
                }),
                hand_update(game, pid)?,
                Outbound::room(layouts_updated(game)),
            ];
            Ok((events, true))
        }
        MatchOutcome::Penalty {
            revealed,
            penalty_slot,
        } => {
            if let Some(landed) = penalty_slot {
                forget_for_all_bots(room, pid, landed);
            }
            let events = penalty_events(room, pid, pid, revealed, penalty_slot, MatchType::Own);
            Ok((events, false))
        }
        MatchOutcome::MatchedPending { .. } => Err(DomainError::Other(
            "match_own settles immediately".into(),
        )),
    }
}

pub(super) fn apply_call_red_king(
    room: &mut Room,
    pid: &str,
) -> Result<Vec<Outbound>, DomainError> {
    let game = require_game(room)?;
    rules::call_red_king(game, pid)?;
    info!(room_code = %room.code, caller = pid, "red king called");

    let game = room.game.as_ref().ok_or(DomainError::PhaseMismatch)?;
    let mut events = vec![Outbound::room(phase_changed(game))];
    if game.phase == Phase::Reveal {
        events.push(Outbound::room(super::game_results(room, game)));
    }
    Ok(events)
}

fn penalty_events(
    room: &Room,
    caller: &str,
    target: &str,
    revealed: crate::domain::Card,
    penalty_slot: Option<usize>,
    match_type: MatchType,
) -> Vec<Outbound> {
    let game = match room.game.as_ref() {
        Some(game) => game,
        None => return Vec::new(),
    };
    let target_id = if matches!(match_type, MatchType::Other) {
        Some(target.to_string())
    } else {
        None
    };
    let mut events = vec![Outbound::room(ServerEvent::MatchResult {
        caller_id: caller.to_string(),
        target_id,
        card: revealed,
        success: false,
        match_type,
    })];
    if penalty_slot.is_some() {
        if let Ok(update) = hand_update(game, caller) {
            events.push(update);
        }
        events.push(Outbound::room(layouts_updated(game)));
        events.push(Outbound::room(turn_update(game)));
    }
    events
}

fn hand_update(game: &GameState, pid: &str) -> Result<Outbound, DomainError> {
    let hand = game
        .hands
        .get(pid)
        .ok_or_else(|| DomainError::Other(format!("no hand for player {pid}")))?;
    Ok(Outbound::private(
        pid,
        ServerEvent::HandUpdated {
            hand: hand.slots().to_vec(),
        },
    ))
}

/// Invalidate every bot's memory of one slot.
pub(super) fn forget_for_all_bots(room: &mut Room, owner: &str, slot: usize) {
    for memory in room.bot_memory.values_mut() {
        memory.forget(owner, slot);
    }
}
