//! Domain-level error types used across the rule engine and services.
//!
//! Rule violations are typed so the controller can log them, but per the
//! session error policy they are never surfaced to the client; the only
//! user-visible failure is `JoinError`, delivered as a private
//! `join-error` event.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

/// Join failures, each surfaced to the requester as a distinct kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinError {
    RoomNotFound,
    GameInProgress,
    RoomFull,
    NameTaken,
    AlreadyInRoom,
}

impl JoinError {
    pub fn message(self) -> &'static str {
        match self {
            JoinError::RoomNotFound => "No room with that code",
            JoinError::GameInProgress => "That game has already started",
            JoinError::RoomFull => "That room is full",
            JoinError::NameTaken => "That name is already taken",
            JoinError::AlreadyInRoom => "You are already in a room",
        }
    }
}

impl Display for JoinError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.message())
    }
}

impl Error for JoinError {}

/// Central domain error type.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Command arrived outside the phase it is legal in.
    PhaseMismatch,
    /// Command arrived from a player who does not hold the turn.
    OutOfTurn,
    /// A slot index pointed at a gap or past the end of a hand.
    BadSlot,
    /// The command targeted the protected Red-King caller.
    ProtectedTarget,
    /// A draw was attempted with no drawn card outstanding, or vice versa.
    DrawnStateMismatch,
    /// The deck had no card to give.
    EmptyDeck,
    /// A match was claimed against an empty discard pile.
    EmptyDiscard,
    /// Join rejected; carries the client-visible kind.
    Join(JoinError),
    /// Anything else that should never reach a client.
    Other(String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::PhaseMismatch => write!(f, "phase mismatch"),
            DomainError::OutOfTurn => write!(f, "out of turn"),
            DomainError::BadSlot => write!(f, "bad slot"),
            DomainError::ProtectedTarget => write!(f, "target is protected"),
            DomainError::DrawnStateMismatch => write!(f, "drawn-card state mismatch"),
            DomainError::EmptyDeck => write!(f, "deck is empty"),
            DomainError::EmptyDiscard => write!(f, "discard pile is empty"),
            DomainError::Join(kind) => write!(f, "join rejected: {kind}"),
            DomainError::Other(detail) => write!(f, "domain error: {detail}"),
        }
    }
}

impl Error for DomainError {}

impl From<JoinError> for DomainError {
    fn from(kind: JoinError) -> Self {
        DomainError::Join(kind)
    }
}
