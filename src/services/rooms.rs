//! Room registry: code allocation, membership, and lobby bookkeeping.
//!
//! Codes come from a 32-character alphabet that omits the visually
//! ambiguous I, O, 0, and 1. Both lookups (code → room, connection →
//! code) are updated together under the registry's single lock.

use std::collections::HashMap;

use rand::distributions::Uniform;
use rand::prelude::*;
use rand::rngs::OsRng;

use crate::ai::{BotMemory, Difficulty};
use crate::domain::state::{GameState, PlayerId};
use crate::errors::{DomainError, JoinError};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_CODE_LEN: usize = 4;
pub const MAX_PLAYERS: usize = 8;
pub const MAX_NAME_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_cpu: bool,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Waiting,
    Playing,
}

pub struct Room {
    pub code: String,
    pub host_id: PlayerId,
    /// Insertion order defines turn order.
    pub players: Vec<Player>,
    pub state: RoomState,
    pub game: Option<GameState>,
    /// Per-bot slot knowledge; server-owned because bots are
    /// server-driven.
    pub bot_memory: HashMap<PlayerId, BotMemory>,
    next_bot_no: u32,
}

impl Room {
    fn new(code: String, host: Player) -> Self {
        let host_id = host.id.clone();
        Self {
            code,
            host_id,
            players: vec![host],
            state: RoomState::Waiting,
            game: None,
            bot_memory: HashMap::new(),
            next_bot_no: 1,
        }
    }

    pub fn player(&self, pid: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == pid)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name)
    }

    pub fn bots(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_cpu)
    }

    /// Add a CPU player, returning its id. Bot ids are `bot-<n>` with a
    /// per-room counter so they never collide with connection ids.
    pub fn add_bot(&mut self, difficulty: Difficulty) -> Result<PlayerId, DomainError> {
        if self.state != RoomState::Waiting {
            return Err(JoinError::GameInProgress.into());
        }
        if self.is_full() {
            return Err(JoinError::RoomFull.into());
        }
        let n = self.next_bot_no;
        self.next_bot_no += 1;
        let id = format!("bot-{n}");
        self.players.push(Player {
            id: id.clone(),
            name: format!("Bot {n}"),
            is_host: false,
            is_cpu: true,
            difficulty: Some(difficulty),
        });
        self.bot_memory.insert(id.clone(), BotMemory::new());
        Ok(id)
    }
}

/// What the registry did when a player left, for the controller to turn
/// into events.
#[derive(Debug)]
pub struct LeaveOutcome {
    pub code: String,
    pub player: Player,
    /// Set when the host role moved to another player.
    pub new_host: Option<PlayerId>,
    /// The room was torn down (last human left).
    pub room_deleted: bool,
}

#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    /// connection id → room code
    memberships: HashMap<PlayerId, String>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn room_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn code_of(&self, pid: &str) -> Option<&String> {
        self.memberships.get(pid)
    }

    pub fn room_of_mut(&mut self, pid: &str) -> Option<&mut Room> {
        let code = self.memberships.get(pid)?.clone();
        self.rooms.get_mut(&code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn generate_code(&self) -> String {
        let mut rng = OsRng;
        let dist = Uniform::from(0..ROOM_CODE_ALPHABET.len());
        loop {
            let mut code = String::with_capacity(ROOM_CODE_LEN);
            for _ in 0..ROOM_CODE_LEN {
                code.push(ROOM_CODE_ALPHABET[dist.sample(&mut rng)] as char);
            }
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    fn validate_name(name: &str) -> Result<String, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::Other(format!(
                "invalid player name: {name:?}"
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Create a room with `pid` as host.
    pub fn create_room(&mut self, pid: &str, name: &str) -> Result<&Room, DomainError> {
        if self.memberships.contains_key(pid) {
            return Err(JoinError::AlreadyInRoom.into());
        }
        let name = Self::validate_name(name)?;
        let code = self.generate_code();
        let host = Player {
            id: pid.to_string(),
            name,
            is_host: true,
            is_cpu: false,
            difficulty: None,
        };
        self.memberships.insert(pid.to_string(), code.clone());
        self.rooms.insert(code.clone(), Room::new(code.clone(), host));
        Ok(&self.rooms[&code])
    }

    /// Join an existing room. Codes are case-insensitive on input.
    pub fn join_room(&mut self, pid: &str, code: &str, name: &str) -> Result<&Room, DomainError> {
        if self.memberships.contains_key(pid) {
            return Err(JoinError::AlreadyInRoom.into());
        }
        let name = Self::validate_name(name)?;
        let code = code.trim().to_ascii_uppercase();
        let room = self
            .rooms
            .get_mut(&code)
            .ok_or(JoinError::RoomNotFound)?;
        if room.state != RoomState::Waiting {
            return Err(JoinError::GameInProgress.into());
        }
        if room.is_full() {
            return Err(JoinError::RoomFull.into());
        }
        if room.has_name(&name) {
            return Err(JoinError::NameTaken.into());
        }

        room.players.push(Player {
            id: pid.to_string(),
            name,
            is_host: false,
            is_cpu: false,
            difficulty: None,
        });
        self.memberships.insert(pid.to_string(), code.clone());
        Ok(&self.rooms[&code])
    }

    /// Remove a player from their room, reassigning the host role and
    /// cleaning mid-game structures. The room is torn down when its last
    /// human leaves (bots cannot keep a room alive on their own).
    pub fn leave_room(&mut self, pid: &str) -> Option<LeaveOutcome> {
        let code = self.memberships.remove(pid)?;
        let room = self.rooms.get_mut(&code)?;

        let idx = room.players.iter().position(|p| p.id == pid)?;
        let player = room.players.remove(idx);

        if let Some(game) = room.game.as_mut() {
            game.remove_player(pid);
        }

        let mut new_host = None;
        if player.is_host {
            if let Some(next) = room.players.iter_mut().find(|p| !p.is_cpu) {
                next.is_host = true;
                room.host_id = next.id.clone();
                new_host = Some(next.id.clone());
            }
        }

        let humans_left = room.players.iter().any(|p| !p.is_cpu);
        let room_deleted = !humans_left;
        if room_deleted {
            self.rooms.remove(&code);
        }

        Some(LeaveOutcome {
            code,
            player,
            new_host,
            room_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_the_unambiguous_alphabet() {
        let mut registry = RoomRegistry::new();
        for i in 0..50 {
            registry.create_room(&format!("conn-{i}"), "Ada").unwrap();
        }
        assert_eq!(registry.room_count(), 50);
        for code in registry.rooms.keys() {
            assert_eq!(code.len(), ROOM_CODE_LEN);
            for ch in code.bytes() {
                assert!(
                    ROOM_CODE_ALPHABET.contains(&ch),
                    "unexpected code character {}",
                    ch as char
                );
            }
        }
    }

    #[test]
    fn join_is_case_insensitive_on_the_code() {
        let mut registry = RoomRegistry::new();
        let code = registry.create_room("host", "Ada").unwrap().code.clone();
        let room = registry
            .join_room("guest", &code.to_ascii_lowercase(), "Grace")
            .unwrap();
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn join_failure_taxonomy() {
        let mut registry = RoomRegistry::new();
        let code = registry.create_room("host", "Ada").unwrap().code.clone();

        assert_eq!(
            registry.join_room("guest", "ZZZZ", "Grace").err(),
            Some(JoinError::RoomNotFound.into())
        );
        assert_eq!(
            registry.join_room("guest", &code, "Ada").err(),
            Some(JoinError::NameTaken.into())
        );
        assert_eq!(
            registry.join_room("host", &code, "Else").err(),
            Some(JoinError::AlreadyInRoom.into())
        );

        for i in 0..7 {
            registry
                .join_room(&format!("g{i}"), &code, &format!("Guest {i}"))
                .unwrap();
        }
        assert_eq!(
            registry.join_room("late", &code, "Late").err(),
            Some(JoinError::RoomFull.into())
        );

        registry.room_mut(&code).unwrap().state = RoomState::Playing;
        assert_eq!(
            registry.join_room("guest", &code, "Grace").err(),
            Some(JoinError::GameInProgress.into())
        );
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        let mut registry = RoomRegistry::new();
        let room = registry.create_room("host", "  Ada  ").unwrap();
        assert_eq!(room.players[0].name, "Ada");

        assert!(registry.create_room("other", "   ").is_err());
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(registry.create_room("other", &long).is_err());
    }

    #[test]
    fn host_role_moves_to_the_next_human() {
        let mut registry = RoomRegistry::new();
        let code = registry.create_room("host", "Ada").unwrap().code.clone();
        registry.join_room("guest", &code, "Grace").unwrap();
        registry
            .room_mut(&code)
            .unwrap()
            .add_bot(Difficulty::Easy)
            .unwrap();

        let outcome = registry.leave_room("host").unwrap();
        assert_eq!(outcome.new_host.as_deref(), Some("guest"));
        assert!(!outcome.room_deleted);
        let room = registry.room(&code).unwrap();
        assert_eq!(room.host_id, "guest");
        assert!(room.player("guest").unwrap().is_host);
    }

    #[test]
    fn last_human_leaving_deletes_the_room() {
        let mut registry = RoomRegistry::new();
        let code = registry.create_room("host", "Ada").unwrap().code.clone();
        registry
            .room_mut(&code)
            .unwrap()
            .add_bot(Difficulty::Medium)
            .unwrap();

        let outcome = registry.leave_room("host").unwrap();
        assert!(outcome.room_deleted);
        assert!(registry.room(&code).is_none());
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn bots_count_toward_the_player_limit() {
        let mut registry = RoomRegistry::new();
        let code = registry.create_room("host", "Ada").unwrap().code.clone();
        let room = registry.room_mut(&code).unwrap();
        for _ in 0..7 {
            room.add_bot(Difficulty::Easy).unwrap();
        }
        assert!(matches!(
            room.add_bot(Difficulty::Easy),
            Err(DomainError::Join(JoinError::RoomFull))
        ));
    }
}
