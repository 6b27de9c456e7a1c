//! Session controller: the single entry point for player and bot
//! commands.
//!
//! One lock serialises every room mutation; bot timers re-enter through
//! the same lock, so bot and human actions can never interleave
//! mid-mutation. State is always fully mutated before any event is
//! enqueued, and events are handed to the hub while the lock is still
//! held so room-scoped ordering follows command order.

mod ai_coordinator;
mod lobby;
mod turns;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::domain::scoring::{determine_winner, hand_score};
use crate::domain::state::GameState;
use crate::domain::Phase;
use crate::protocol::{
    ClientCommand, Outbound, PlayerInfo, PlayerResult, Scope, ServerEvent,
};
use crate::services::rooms::{Player, Room, RoomRegistry};
use crate::ws::hub::ConnectionHub;
use crate::DomainError;

pub const DEFAULT_BOT_DELAY: Duration = Duration::from_millis(1500);

/// What one handled command produced.
pub(crate) struct CommandEffects {
    /// Room the command acted on, if it resolved to one.
    pub code: Option<String>,
    pub events: Vec<Outbound>,
    /// The top of the discard pile changed; bots get a match scan.
    pub discard_changed: bool,
}

impl CommandEffects {
    pub(crate) fn outside_room(events: Vec<Outbound>) -> Self {
        Self {
            code: None,
            events,
            discard_changed: false,
        }
    }

    pub(crate) fn in_room(code: impl Into<String>, events: Vec<Outbound>) -> Self {
        Self {
            code: Some(code.into()),
            events,
            discard_changed: false,
        }
    }

    pub(crate) fn with_discard(mut self) -> Self {
        self.discard_changed = true;
        self
    }
}

pub struct GameFlowService {
    registry: Mutex<RoomRegistry>,
    hub: Arc<ConnectionHub>,
    bot_delay: Duration,
    /// Fixed strategy seed for deterministic tests; `None` in production.
    bot_seed: Option<u64>,
}

impl GameFlowService {
    pub fn new(hub: Arc<ConnectionHub>) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(RoomRegistry::new()),
            hub,
            bot_delay: DEFAULT_BOT_DELAY,
            bot_seed: None,
        })
    }

    /// Test constructor: no think-delay and reproducible bot decisions.
    pub fn with_bot_tuning(
        hub: Arc<ConnectionHub>,
        bot_delay: Duration,
        bot_seed: Option<u64>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(RoomRegistry::new()),
            hub,
            bot_delay,
            bot_seed,
        })
    }

    fn lock_registry(&self) -> MutexGuard<'_, RoomRegistry> {
        // A poisoned lock only means another thread panicked mid-command;
        // the registry itself is still usable.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Handle one inbound command from `pid`. Invalid commands are logged
    /// and dropped; the client self-corrects on the next broadcast.
    pub fn dispatch(self: &Arc<Self>, pid: &str, command: ClientCommand) {
        let mut registry = self.lock_registry();
        match self.handle_command(&mut registry, pid, command) {
            Ok(effects) => {
                self.deliver(&registry, effects.code.as_deref(), effects.events);
                if let Some(code) = effects.code {
                    self.after_command(&mut registry, &code, effects.discard_changed);
                }
            }
            Err(err) => {
                debug!(player_id = pid, error = %err, "command dropped");
            }
        }
    }

    /// Disconnects run the same leave path as an explicit `leave-room`.
    pub fn handle_disconnect(self: &Arc<Self>, pid: &str) {
        self.dispatch(pid, ClientCommand::LeaveRoom);
    }

    fn handle_command(
        self: &Arc<Self>,
        registry: &mut RoomRegistry,
        pid: &str,
        command: ClientCommand,
    ) -> Result<CommandEffects, DomainError> {
        debug!(player_id = pid, command = ?command_name(&command), "command received");
        match command {
            ClientCommand::HostGame { name } => self.host_game(registry, pid, &name),
            ClientCommand::JoinGame { code, name } => self.join_game(registry, pid, &code, &name),
            ClientCommand::StartGame => self.start_game(registry, pid),
            ClientCommand::EndGame => self.end_game(registry, pid),
            ClientCommand::LeaveRoom => self.leave_game(registry, pid),
            ClientCommand::AddCpuPlayer { difficulty } => {
                self.add_cpu_player(registry, pid, difficulty)
            }
            ClientCommand::PeekDone => self.peek_done(registry, pid),
            ClientCommand::DrawCard => self.draw_card(registry, pid),
            ClientCommand::KeepCard { slot_index } => self.keep_card(registry, pid, slot_index),
            ClientCommand::DiscardCard => self.discard_card(registry, pid),
            ClientCommand::SkipRule => self.skip_rule(registry, pid),
            ClientCommand::UsePeekOwn { slot_index } => {
                self.use_peek_own(registry, pid, slot_index)
            }
            ClientCommand::UsePeekOther {
                target_id,
                slot_index,
            } => self.use_peek_other(registry, pid, &target_id, slot_index),
            ClientCommand::FinishPeek => self.finish_peek(registry, pid),
            ClientCommand::UseBlindSwitch {
                first_player_id,
                first_slot_index,
                second_player_id,
                second_slot_index,
            } => self.use_blind_switch(
                registry,
                pid,
                &first_player_id,
                first_slot_index,
                &second_player_id,
                second_slot_index,
            ),
            ClientCommand::UseBlackKingPeek {
                first_player_id,
                first_slot_index,
                second_player_id,
                second_slot_index,
            } => self.use_black_king_peek(
                registry,
                pid,
                &first_player_id,
                first_slot_index,
                &second_player_id,
                second_slot_index,
            ),
            ClientCommand::UseBlackKingSwitch {
                first_player_id,
                first_slot_index,
                second_player_id,
                second_slot_index,
            } => self.use_black_king_switch(
                registry,
                pid,
                &first_player_id,
                first_slot_index,
                &second_player_id,
                second_slot_index,
            ),
            ClientCommand::UseBlackKingSkip => self.use_black_king_skip(registry, pid),
            ClientCommand::CallMatchOwn { slot_index } => {
                self.call_match_own(registry, pid, slot_index)
            }
            ClientCommand::CallMatchOther {
                target_id,
                slot_index,
            } => self.call_match_other(registry, pid, &target_id, slot_index),
            ClientCommand::GiveCardAfterMatch {
                own_slot,
                target_id,
                target_slot,
            } => self.give_card_after_match(registry, pid, own_slot, &target_id, target_slot),
            ClientCommand::CallRedKing => self.call_red_king(registry, pid),
        }
    }

    /// Fan a batch of scoped events out through the hub. Room scopes
    /// resolve against the room's current member list; bots and vanished
    /// connections are skipped by the hub.
    fn deliver(&self, registry: &RoomRegistry, code: Option<&str>, events: Vec<Outbound>) {
        let members: Vec<String> = code
            .and_then(|c| registry.room(c))
            .map(|room| room.player_ids())
            .unwrap_or_default();

        for outbound in events {
            match outbound.scope {
                Scope::Player(pid) => self.hub.send_to(&pid, outbound.event),
                Scope::Room => {
                    for member in &members {
                        self.hub.send_to(member, outbound.event.clone());
                    }
                }
                Scope::RoomExcept(skip) => {
                    for member in members.iter().filter(|m| **m != skip) {
                        self.hub.send_to(member, outbound.event.clone());
                    }
                }
            }
        }
    }

    /// Test support: inspect or rig a room directly. Production code
    /// never calls this; commands are the only real entry point.
    #[doc(hidden)]
    pub fn with_room_mut<R>(&self, code: &str, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        let mut registry = self.lock_registry();
        registry.room_mut(code).map(f)
    }

    /// Bot reactions to the command that just completed: opportunistic
    /// match scans when the discard top moved, then turn scheduling.
    fn after_command(self: &Arc<Self>, registry: &mut RoomRegistry, code: &str, discard_changed: bool) {
        if discard_changed {
            let events = match registry.room_mut(code) {
                Some(room) => self.bots_react_to_discard(room),
                None => Vec::new(),
            };
            if !events.is_empty() {
                self.deliver(registry, Some(code), events);
            }
        }
        if let Some(room) = registry.room_mut(code) {
            self.schedule_bot_turn(room);
        }
    }
}

fn command_name(command: &ClientCommand) -> &'static str {
    match command {
        ClientCommand::HostGame { .. } => "host-game",
        ClientCommand::JoinGame { .. } => "join-game",
        ClientCommand::StartGame => "start-game",
        ClientCommand::EndGame => "end-game",
        ClientCommand::LeaveRoom => "leave-room",
        ClientCommand::AddCpuPlayer { .. } => "add-cpu-player",
        ClientCommand::PeekDone => "peek-done",
        ClientCommand::DrawCard => "draw-card",
        ClientCommand::KeepCard { .. } => "keep-card",
        ClientCommand::DiscardCard => "discard-card",
        ClientCommand::SkipRule => "skip-rule",
        ClientCommand::UsePeekOwn { .. } => "use-peek-own",
        ClientCommand::UsePeekOther { .. } => "use-peek-other",
        ClientCommand::FinishPeek => "finish-peek",
        ClientCommand::UseBlindSwitch { .. } => "use-blind-switch",
        ClientCommand::UseBlackKingPeek { .. } => "use-black-king-peek",
        ClientCommand::UseBlackKingSwitch { .. } => "use-black-king-switch",
        ClientCommand::UseBlackKingSkip => "use-black-king-skip",
        ClientCommand::CallMatchOwn { .. } => "call-match-own",
        ClientCommand::CallMatchOther { .. } => "call-match-other",
        ClientCommand::GiveCardAfterMatch { .. } => "give-card-after-match",
        ClientCommand::CallRedKing => "call-red-king",
    }
}

// ---- shared projections -------------------------------------------------

pub(crate) fn info_of(player: &Player) -> PlayerInfo {
    PlayerInfo {
        id: player.id.clone(),
        name: player.name.clone(),
        is_host: player.is_host,
        is_cpu: player.is_cpu,
        difficulty: player.difficulty,
    }
}

pub(crate) fn player_infos(room: &Room) -> Vec<PlayerInfo> {
    room.players.iter().map(info_of).collect()
}

pub(crate) fn turn_update(game: &GameState) -> ServerEvent {
    ServerEvent::TurnUpdate {
        current_turn: game.current_turn().cloned(),
        deck_count: game.deck_count(),
        top_discard: game.top_discard(),
    }
}

pub(crate) fn phase_changed(game: &GameState) -> ServerEvent {
    ServerEvent::PhaseChanged {
        phase: game.phase,
        current_turn: game.current_turn().cloned(),
        top_discard: game.top_discard(),
    }
}

pub(crate) fn layouts_updated(game: &GameState) -> ServerEvent {
    ServerEvent::HandLayoutsUpdated {
        layouts: game
            .hands
            .iter()
            .map(|(pid, hand)| (pid.clone(), hand.layout()))
            .collect(),
    }
}

/// Sorted reveal results for the whole room.
pub(crate) fn game_results(room: &Room, game: &GameState) -> ServerEvent {
    let caller = game.red_king_caller.clone();
    let mut results: Vec<PlayerResult> = game
        .turn_order
        .iter()
        .filter_map(|pid| {
            let hand = game.hands.get(pid)?;
            let name = room
                .player(pid)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| pid.clone());
            Some(PlayerResult {
                player_id: pid.clone(),
                name,
                hand: hand.slots().to_vec(),
                score: hand_score(hand),
                is_caller: caller.as_deref() == Some(pid.as_str()),
            })
        })
        .collect();
    results.sort_by_key(|r| r.score);

    ServerEvent::GameResults {
        winner_id: determine_winner(game),
        caller_id: caller,
        results,
    }
}

/// End-of-turn events: the room-wide turn pointer, plus final results if
/// this advance ended the game.
pub(crate) fn turn_finish_events(room: &Room, game: &GameState) -> Vec<Outbound> {
    let mut events = vec![Outbound::room(turn_update(game))];
    if game.phase == Phase::Reveal {
        events.push(Outbound::room(phase_changed(game)));
        events.push(Outbound::room(game_results(room, game)));
    }
    events
}
