//! Bot driver: scheduled turns and opportunistic reactions.
//!
//! Bot actions post through the same lock and the same apply helpers as
//! player commands, so they obey identical validation. A timer only
//! carries a room code and a bot id; everything else is re-read at fire
//! time, which makes stale timers harmless.

use std::sync::Arc;

use tracing::{debug, info};

use super::turns::{
    apply_call_red_king, apply_discard, apply_draw, apply_keep, apply_match_own, apply_pass_turn,
    apply_switch,
};
use super::GameFlowService;
use crate::ai::{strategy_for, BotMemory, BotStrategy, BotView, Difficulty, DrawDecision,
                RuleDecision};
use crate::domain::state::PlayerId;
use crate::domain::{Card, Phase, RuleType};
use crate::protocol::{Outbound, ServerEvent};
use crate::services::rooms::{Room, RoomState};
use crate::DomainError;

impl GameFlowService {
    /// Run one strategy decision against a read-only view of the room.
    fn bot_decision<R>(
        &self,
        room: &Room,
        bot_id: &str,
        decide: impl FnOnce(&dyn BotStrategy, &BotView<'_>) -> R,
    ) -> Option<R> {
        let player = room.player(bot_id)?;
        let difficulty = player.difficulty.unwrap_or(Difficulty::Medium);
        let strategy = strategy_for(difficulty, self.bot_seed);
        let game = room.game.as_ref()?;

        let fallback_memory = BotMemory::new();
        let memory = room.bot_memory.get(bot_id).unwrap_or(&fallback_memory);
        let opponents: Vec<PlayerId> = room
            .players
            .iter()
            .filter(|p| {
                p.id != bot_id && game.hands.contains_key(&p.id) && !game.is_protected(&p.id)
            })
            .map(|p| p.id.clone())
            .collect();

        let view = BotView {
            bot_id,
            game,
            memory,
            opponents: &opponents,
        };
        Some(decide(strategy.as_ref(), &view))
    }

    /// Bots complete the initial peek immediately: they memorise their
    /// bottom two slots and signal peek-done.
    pub(super) fn bots_auto_peek(&self, room: &mut Room) -> Vec<Outbound> {
        let bot_ids: Vec<PlayerId> = room.bots().map(|p| p.id.clone()).collect();
        let mut events = Vec::new();

        for bot_id in bot_ids {
            let bottom: Vec<(usize, Card)> = room
                .game
                .as_ref()
                .and_then(|g| g.hands.get(&bot_id))
                .map(|hand| {
                    [2usize, 3]
                        .iter()
                        .filter_map(|&slot| hand.get(slot).map(|card| (slot, card)))
                        .collect()
                })
                .unwrap_or_default();
            let owner = bot_id.clone();
            for (slot, card) in bottom {
                remember(room, &bot_id, &owner, slot, card);
            }

            if let Some(game) = room.game.as_mut() {
                if game.mark_peek_done(&bot_id) {
                    events.push(Outbound::room(ServerEvent::PlayerPeekDone {
                        player_id: bot_id.clone(),
                    }));
                }
            }
        }
        events
    }

    /// After the discard top moved: each bot gets at most one match
    /// attempt against its remembered cards (the hard tier trusts the
    /// table instead of a memory model).
    pub(super) fn bots_react_to_discard(self: &Arc<Self>, room: &mut Room) -> Vec<Outbound> {
        let Some(top) = room.game.as_ref().and_then(|g| g.top_discard()) else {
            return Vec::new();
        };
        let bot_ids: Vec<PlayerId> = room.bots().map(|p| p.id.clone()).collect();
        let mut events = Vec::new();

        for bot_id in bot_ids {
            let Some(game) = room.game.as_ref() else {
                break;
            };
            if game.is_protected(&bot_id) {
                continue;
            }
            let difficulty = room
                .player(&bot_id)
                .and_then(|p| p.difficulty)
                .unwrap_or(Difficulty::Medium);

            let known: Vec<(usize, Card)> = if difficulty == Difficulty::Hard {
                game.hands
                    .get(&bot_id)
                    .map(|h| h.cards().collect())
                    .unwrap_or_default()
            } else {
                room.bot_memory
                    .get(&bot_id)
                    .map(|m| m.known_for(&bot_id))
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|(slot, _)| {
                        game.hands
                            .get(&bot_id)
                            .and_then(|h| h.get(*slot))
                            .is_some()
                    })
                    .collect()
            };

            let Some((slot, card)) = known.into_iter().find(|(_, c)| c.rank == top.rank) else {
                continue;
            };
            let wants = self
                .bot_decision(room, &bot_id, |s, v| s.should_match_own(v, slot, card, top))
                .unwrap_or(false);
            if !wants {
                continue;
            }

            match apply_match_own(room, &bot_id, slot) {
                Ok((match_events, _)) => events.extend(match_events),
                Err(err) => debug!(bot_id = %bot_id, error = %err, "bot match attempt dropped"),
            }
        }
        events
    }

    /// Arm the think-delay timer when the turn rests with a bot. The
    /// `pending_bot_turn` guard stops stacked timers when several events
    /// trigger scheduling in quick succession.
    pub(super) fn schedule_bot_turn(self: &Arc<Self>, room: &mut Room) {
        if room.state != RoomState::Playing {
            return;
        }
        let Some(game) = room.game.as_ref() else {
            return;
        };
        if game.pending_bot_turn {
            return;
        }
        let Some(turn) = game.current_turn() else {
            return;
        };
        let is_bot = room.player(turn).map(|p| p.is_cpu).unwrap_or(false);
        if !is_bot {
            return;
        }

        let bot_id = turn.clone();
        let code = room.code.clone();
        if let Some(game) = room.game.as_mut() {
            game.pending_bot_turn = true;
        }
        debug!(room_code = %code, bot_id = %bot_id, "bot turn scheduled");

        let service = Arc::clone(self);
        let delay = self.bot_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            service.run_bot_turn(&code, &bot_id);
        });
    }

    /// Timer fire: re-read the room and execute the bot's whole turn if
    /// it still holds it. A game that ended or a bot that left makes
    /// this a no-op.
    pub fn run_bot_turn(self: &Arc<Self>, code: &str, bot_id: &str) {
        let mut registry = self.lock_registry();
        let Some(room) = registry.room_mut(code) else {
            return;
        };
        if let Some(game) = room.game.as_mut() {
            game.pending_bot_turn = false;
        }
        if room.state != RoomState::Playing {
            return;
        }
        let holds_turn = room
            .game
            .as_ref()
            .map(|g| g.is_current_turn(bot_id))
            .unwrap_or(false);
        if !holds_turn {
            debug!(room_code = %code, bot_id, "stale bot timer ignored");
            return;
        }

        let mut events: Vec<Outbound> = Vec::new();
        let mut discard_changed = false;

        let may_call = room
            .game
            .as_ref()
            .map(|g| {
                g.phase == Phase::Play && g.red_king_caller.is_none() && g.drawn_card.is_none()
            })
            .unwrap_or(false);
        let wants_call = may_call
            && self
                .bot_decision(room, bot_id, |s, v| s.should_call_red_king(v))
                .unwrap_or(false);

        let result = if wants_call {
            info!(room_code = %code, bot_id, "bot calls the red king");
            apply_call_red_king(room, bot_id).map(|ev| events.extend(ev))
        } else {
            self.execute_bot_draw(room, bot_id, &mut events, &mut discard_changed)
        };
        if let Err(err) = result {
            debug!(room_code = %code, bot_id, error = %err, "bot turn aborted");
        }

        self.deliver(&registry, Some(code), events);
        self.after_command(&mut registry, code, discard_changed);
    }

    fn execute_bot_draw(
        self: &Arc<Self>,
        room: &mut Room,
        bot_id: &str,
        events: &mut Vec<Outbound>,
        discard_changed: &mut bool,
    ) -> Result<(), DomainError> {
        let (draw_events, drawn) = apply_draw(room, bot_id)?;
        events.extend(draw_events);
        let Some(card) = drawn else {
            // Deck was empty; the turn already moved on.
            return Ok(());
        };

        let decision = self
            .bot_decision(room, bot_id, |s, v| s.decide_keep_or_discard(v, card))
            .unwrap_or(DrawDecision::Discard);

        match decision {
            DrawDecision::Keep { slot } if slot_occupied(room, bot_id, slot) => {
                events.extend(apply_keep(room, bot_id, slot)?);
                *discard_changed = true;
                // The bot knows exactly what it just tucked away.
                remember(room, bot_id, bot_id, slot, card);
                Ok(())
            }
            _ => {
                let (discard_events, rule) = apply_discard(room, bot_id)?;
                events.extend(discard_events);
                *discard_changed = true;
                if let Some(rule) = rule {
                    if let Err(err) = self.execute_bot_rule(room, bot_id, rule, events) {
                        debug!(bot_id, error = %err, "bot rule execution failed, passing turn");
                        events.extend(apply_pass_turn(room, bot_id)?);
                    }
                }
                Ok(())
            }
        }
    }

    fn execute_bot_rule(
        self: &Arc<Self>,
        room: &mut Room,
        bot_id: &str,
        rule: RuleType,
        events: &mut Vec<Outbound>,
    ) -> Result<(), DomainError> {
        let decision = self
            .bot_decision(room, bot_id, |s, v| s.decide_rule_usage(v, rule))
            .unwrap_or(RuleDecision::Skip);
        debug!(bot_id, rule = ?rule, decision = ?decision, "bot rule decision");

        match decision {
            RuleDecision::Skip => {
                events.extend(apply_pass_turn(room, bot_id)?);
            }
            RuleDecision::PeekOwn { slot } => {
                let game = room.game.as_mut().ok_or(DomainError::PhaseMismatch)?;
                let card = crate::domain::rules::peek_own(game, bot_id, slot)?;
                remember(room, bot_id, bot_id, slot, card);
                events.extend(apply_pass_turn(room, bot_id)?);
            }
            RuleDecision::PeekOther { target } => {
                let game = room.game.as_mut().ok_or(DomainError::PhaseMismatch)?;
                let card = crate::domain::rules::peek_other(
                    game,
                    bot_id,
                    &target.player_id,
                    target.slot_index,
                )?;
                remember(room, bot_id, &target.player_id, target.slot_index, card);
                events.extend(apply_pass_turn(room, bot_id)?);
            }
            RuleDecision::BlindSwitch { own_slot, target } => {
                events.extend(apply_switch(
                    room,
                    bot_id,
                    bot_id,
                    own_slot,
                    &target.player_id,
                    target.slot_index,
                )?);
            }
            RuleDecision::BlackKing {
                first,
                second,
                switch,
            } => {
                let game = room.game.as_mut().ok_or(DomainError::PhaseMismatch)?;
                let (a, b) = crate::domain::rules::black_king_peek(
                    game,
                    bot_id,
                    &first.player_id,
                    first.slot_index,
                    &second.player_id,
                    second.slot_index,
                )?;
                remember(room, bot_id, &first.player_id, first.slot_index, a);
                remember(room, bot_id, &second.player_id, second.slot_index, b);

                match switch {
                    Some((own, their)) => {
                        let incoming = if their == first {
                            Some(a)
                        } else if their == second {
                            Some(b)
                        } else {
                            None
                        };
                        events.extend(apply_switch(
                            room,
                            bot_id,
                            &own.player_id,
                            own.slot_index,
                            &their.player_id,
                            their.slot_index,
                        )?);
                        // The switch wiped both slots from memory; the bot
                        // saw what it pulled in.
                        if let Some(card) = incoming {
                            remember(room, bot_id, &own.player_id, own.slot_index, card);
                        }
                    }
                    None => {
                        events.extend(apply_pass_turn(room, bot_id)?);
                    }
                }
            }
        }
        Ok(())
    }
}

fn slot_occupied(room: &Room, pid: &str, slot: usize) -> bool {
    room.game
        .as_ref()
        .and_then(|g| g.hands.get(pid))
        .and_then(|h| h.get(slot))
        .is_some()
}

fn remember(room: &mut Room, bot_id: &str, owner: &str, slot: usize, card: Card) {
    if let Some(memory) = room.bot_memory.get_mut(bot_id) {
        memory.remember(owner, slot, card);
    }
}
