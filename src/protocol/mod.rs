//! Wire protocol: inbound commands and outbound events.
//!
//! Every message is a tagged record; command and event names are
//! kebab-case and payload fields lowerCamelCase, matching the deployed
//! client. Events never carry information the recipient is not allowed to
//! see — scoping is the controller's job, expressed through [`Outbound`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ai::Difficulty;
use crate::domain::{Card, Phase, PlayerId, RuleType};
use crate::errors::JoinError;

/// Commands a client may send. Unknown or malformed messages are dropped
/// at the websocket layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    HostGame {
        name: String,
    },
    JoinGame {
        code: String,
        name: String,
    },
    StartGame,
    EndGame,
    LeaveRoom,
    AddCpuPlayer {
        #[serde(default)]
        difficulty: Option<Difficulty>,
    },
    PeekDone,
    DrawCard,
    KeepCard {
        slot_index: usize,
    },
    DiscardCard,
    SkipRule,
    UsePeekOwn {
        slot_index: usize,
    },
    UsePeekOther {
        target_id: PlayerId,
        slot_index: usize,
    },
    FinishPeek,
    UseBlindSwitch {
        first_player_id: PlayerId,
        first_slot_index: usize,
        second_player_id: PlayerId,
        second_slot_index: usize,
    },
    UseBlackKingPeek {
        first_player_id: PlayerId,
        first_slot_index: usize,
        second_player_id: PlayerId,
        second_slot_index: usize,
    },
    UseBlackKingSwitch {
        first_player_id: PlayerId,
        first_slot_index: usize,
        second_player_id: PlayerId,
        second_slot_index: usize,
    },
    UseBlackKingSkip,
    CallMatchOwn {
        slot_index: usize,
    },
    CallMatchOther {
        target_id: PlayerId,
        slot_index: usize,
    },
    GiveCardAfterMatch {
        own_slot: usize,
        target_id: PlayerId,
        target_slot: usize,
    },
    CallRedKing,
}

/// Public player record, safe for any recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_cpu: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

/// What a player learns about an opponent at deal time: shape, not
/// content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentInfo {
    pub id: PlayerId,
    pub name: String,
    pub card_count: usize,
}

/// One revealed card of a black-king peek.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeekedCard {
    pub player_id: PlayerId,
    pub slot_index: usize,
    pub card: Card,
}

/// A board position to highlight.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRef {
    pub player_id: PlayerId,
    pub slot_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Swap,
    Switch,
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Own,
    Other,
}

/// One line of the reveal-phase result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    pub player_id: PlayerId,
    pub name: String,
    pub hand: Vec<Option<Card>>,
    pub score: i32,
    pub is_caller: bool,
}

/// Events the server emits. The scope an event travels in is decided per
/// emission via [`Scope`]; nothing here is inherently private or public.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    RoomCreated {
        code: String,
        players: Vec<PlayerInfo>,
        you: PlayerInfo,
    },
    RoomJoined {
        code: String,
        players: Vec<PlayerInfo>,
        you: PlayerInfo,
    },
    PlayerListUpdated {
        players: Vec<PlayerInfo>,
    },
    HostChanged {
        host_id: PlayerId,
    },
    GameStarted {
        phase: Phase,
    },
    CardsDealt {
        hand: Vec<Option<Card>>,
        phase: Phase,
        deck_count: usize,
        opponents: Vec<OpponentInfo>,
    },
    PlayerPeekDone {
        player_id: PlayerId,
    },
    PhaseChanged {
        phase: Phase,
        current_turn: Option<PlayerId>,
        top_discard: Option<Card>,
    },
    CardDrawn {
        card: Card,
        has_rule: bool,
        rule_type: Option<RuleType>,
    },
    OpponentDrew {
        player_id: PlayerId,
        name: String,
        deck_count: usize,
    },
    HandUpdated {
        hand: Vec<Option<Card>>,
    },
    CardDiscarded {
        player_id: PlayerId,
        card: Card,
        action: String,
    },
    TurnUpdate {
        current_turn: Option<PlayerId>,
        deck_count: usize,
        top_discard: Option<Card>,
    },
    ExecuteRule {
        rule_type: RuleType,
        card: Card,
    },
    PeekResult {
        card: Card,
        slot_index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<PlayerId>,
    },
    BlackKingPeekResult {
        first: PeekedCard,
        second: PeekedCard,
    },
    CardsHighlighted {
        cards: Vec<HighlightRef>,
        kind: HighlightKind,
    },
    MatchResult {
        caller_id: PlayerId,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<PlayerId>,
        card: Card,
        success: bool,
        match_type: MatchType,
    },
    HandLayoutsUpdated {
        layouts: HashMap<PlayerId, Vec<bool>>,
    },
    GameResults {
        results: Vec<PlayerResult>,
        winner_id: Option<PlayerId>,
        caller_id: Option<PlayerId>,
    },
    GameEnded {
        players: Vec<PlayerInfo>,
    },
    YouLeft,
    JoinError {
        kind: JoinError,
        message: String,
    },
}

/// Delivery scope for one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    /// Only this player.
    Player(PlayerId),
    /// Everyone in the room, including the actor.
    Room,
    /// Everyone in the room except one player.
    RoomExcept(PlayerId),
}

/// A scoped event, ready for fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub scope: Scope,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn private(to: impl Into<PlayerId>, event: ServerEvent) -> Self {
        Self {
            scope: Scope::Player(to.into()),
            event,
        }
    }

    pub fn room(event: ServerEvent) -> Self {
        Self {
            scope: Scope::Room,
            event,
        }
    }

    pub fn room_except(skip: impl Into<PlayerId>, event: ServerEvent) -> Self {
        Self {
            scope: Scope::RoomExcept(skip.into()),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_wire_names() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"type":"host-game","name":"Ada"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::HostGame { name: "Ada".into() });

        let cmd: ClientCommand =
            serde_json::from_str(r#"{"type":"keep-card","slotIndex":2}"#).unwrap();
        assert_eq!(cmd, ClientCommand::KeepCard { slot_index: 2 });

        let cmd: ClientCommand = serde_json::from_str(
            r#"{"type":"use-peek-other","targetId":"abc","slotIndex":0}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            ClientCommand::UsePeekOther {
                target_id: "abc".into(),
                slot_index: 0
            }
        );

        let cmd: ClientCommand = serde_json::from_str(r#"{"type":"draw-card"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::DrawCard);
    }

    #[test]
    fn events_serialize_with_camel_case_fields() {
        let event = ServerEvent::TurnUpdate {
            current_turn: Some("p1".into()),
            deck_count: 40,
            top_discard: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "turn-update");
        assert_eq!(value["currentTurn"], "p1");
        assert_eq!(value["deckCount"], 40);
        assert!(value["topDiscard"].is_null());
    }

    #[test]
    fn join_error_kind_is_kebab_case() {
        let event = ServerEvent::JoinError {
            kind: JoinError::RoomNotFound,
            message: JoinError::RoomNotFound.message().to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "room-not-found");
    }
}
