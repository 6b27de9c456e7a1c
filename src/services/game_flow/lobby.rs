//! Lobby commands: rooms, membership, and game start/end.

use std::sync::Arc;

use rand::random;
use tracing::info;

use super::{info_of, phase_changed, player_infos, turn_update, CommandEffects, GameFlowService};
use crate::ai::Difficulty;
use crate::domain::state::GameState;
use crate::domain::Phase;
use crate::protocol::{OpponentInfo, Outbound, ServerEvent};
use crate::services::rooms::{RoomRegistry, RoomState};
use crate::DomainError;

impl GameFlowService {
    pub(super) fn host_game(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        name: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = match registry.create_room(pid, name) {
            Ok(room) => room,
            Err(DomainError::Join(kind)) => {
                return Ok(CommandEffects::outside_room(vec![Outbound::private(
                    pid,
                    ServerEvent::JoinError {
                        kind,
                        message: kind.message().to_string(),
                    },
                )]))
            }
            Err(err) => return Err(err),
        };

        info!(room_code = %room.code, player_id = pid, "room created");
        let you = info_of(room.player(pid).ok_or(DomainError::OutOfTurn)?);
        let events = vec![Outbound::private(
            pid,
            ServerEvent::RoomCreated {
                code: room.code.clone(),
                players: player_infos(room),
                you,
            },
        )];
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn join_game(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        code: &str,
        name: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = match registry.join_room(pid, code, name) {
            Ok(room) => room,
            Err(DomainError::Join(kind)) => {
                return Ok(CommandEffects::outside_room(vec![Outbound::private(
                    pid,
                    ServerEvent::JoinError {
                        kind,
                        message: kind.message().to_string(),
                    },
                )]))
            }
            Err(err) => return Err(err),
        };

        info!(room_code = %room.code, player_id = pid, "player joined");
        let you = info_of(room.player(pid).ok_or(DomainError::OutOfTurn)?);
        let players = player_infos(room);
        let events = vec![
            Outbound::private(
                pid,
                ServerEvent::RoomJoined {
                    code: room.code.clone(),
                    players: players.clone(),
                    you,
                },
            ),
            Outbound::room_except(pid, ServerEvent::PlayerListUpdated { players }),
        ];
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn add_cpu_player(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<CommandEffects, DomainError> {
        let room = registry
            .room_of_mut(pid)
            .ok_or(DomainError::PhaseMismatch)?;
        if room.host_id != pid {
            return Err(DomainError::OutOfTurn);
        }
        let bot_id = room.add_bot(difficulty.unwrap_or(Difficulty::Medium))?;
        info!(room_code = %room.code, bot_id = %bot_id, "cpu player added");

        let events = vec![Outbound::room(ServerEvent::PlayerListUpdated {
            players: player_infos(room),
        })];
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn start_game(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = registry
            .room_of_mut(pid)
            .ok_or(DomainError::PhaseMismatch)?;
        if room.host_id != pid {
            return Err(DomainError::OutOfTurn);
        }
        if room.state != RoomState::Waiting {
            return Err(DomainError::PhaseMismatch);
        }

        let game = GameState::deal(&room.player_ids(), random::<u64>())?;
        room.state = RoomState::Playing;
        room.game = Some(game);
        info!(room_code = %room.code, players = room.players.len(), "game started");

        let game = room
            .game
            .as_ref()
            .ok_or_else(|| DomainError::Other("game missing right after deal".into()))?;
        let mut events = vec![Outbound::room(ServerEvent::GameStarted { phase: game.phase })];

        for player in room.players.iter().filter(|p| !p.is_cpu) {
            let Some(hand) = game.hands.get(&player.id) else {
                continue;
            };
            let opponents: Vec<OpponentInfo> = room
                .players
                .iter()
                .filter(|other| other.id != player.id)
                .filter_map(|other| {
                    game.hands.get(&other.id).map(|h| OpponentInfo {
                        id: other.id.clone(),
                        name: other.name.clone(),
                        card_count: h.card_count(),
                    })
                })
                .collect();
            events.push(Outbound::private(
                player.id.clone(),
                ServerEvent::CardsDealt {
                    hand: hand.slots().to_vec(),
                    phase: game.phase,
                    deck_count: game.deck_count(),
                    opponents,
                },
            ));
        }

        // Bots finish their peek immediately.
        events.extend(self.bots_auto_peek(room));
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn end_game(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let room = registry
            .room_of_mut(pid)
            .ok_or(DomainError::PhaseMismatch)?;
        if room.host_id != pid {
            return Err(DomainError::OutOfTurn);
        }
        if room.state != RoomState::Playing {
            return Err(DomainError::PhaseMismatch);
        }

        room.state = RoomState::Waiting;
        room.game = None;
        for memory in room.bot_memory.values_mut() {
            memory.clear();
        }
        info!(room_code = %room.code, "game ended");

        let events = vec![Outbound::room(ServerEvent::GameEnded {
            players: player_infos(room),
        })];
        Ok(CommandEffects::in_room(room.code.clone(), events))
    }

    pub(super) fn leave_game(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
    ) -> Result<CommandEffects, DomainError> {
        let outcome = registry
            .leave_room(pid)
            .ok_or_else(|| DomainError::Other(format!("player {pid} is not in a room")))?;
        info!(
            room_code = %outcome.code,
            player_id = pid,
            room_deleted = outcome.room_deleted,
            "player left"
        );

        let mut events = vec![Outbound::private(pid, ServerEvent::YouLeft)];
        if outcome.room_deleted {
            return Ok(CommandEffects::outside_room(events));
        }

        let room = registry
            .room_mut(&outcome.code)
            .ok_or_else(|| DomainError::Other("room vanished during leave".into()))?;

        events.push(Outbound::room(ServerEvent::PlayerListUpdated {
            players: player_infos(room),
        }));
        if let Some(host_id) = outcome.new_host {
            events.push(Outbound::room(ServerEvent::HostChanged { host_id }));
        }

        if room.state == RoomState::Playing {
            let ids = room.player_ids();
            if let Some(game) = room.game.as_mut() {
                match game.phase {
                    // The departing player's consent is no longer needed.
                    Phase::Peek if game.peek_complete(&ids) => {
                        game.begin_play();
                        events.push(Outbound::room(phase_changed(game)));
                    }
                    Phase::Play | Phase::Redemption => {
                        events.push(Outbound::room(turn_update(game)));
                    }
                    Phase::Reveal => {
                        // A departure mid-redemption can end the game.
                        events.push(Outbound::room(phase_changed(game)));
                    }
                    Phase::Peek => {}
                }
            }
            let room = registry
                .room(&outcome.code)
                .ok_or_else(|| DomainError::Other("room vanished during leave".into()))?;
            if let Some(game) = room.game.as_ref() {
                if game.phase == Phase::Reveal {
                    events.push(Outbound::room(super::game_results(room, game)));
                }
            }
            // A leaver holding a drawn card dropped it onto the pile.
            return Ok(CommandEffects::in_room(outcome.code, events).with_discard());
        }

        Ok(CommandEffects::in_room(outcome.code, events))
    }
}
