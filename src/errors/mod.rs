//! Error handling for the Red King backend.

pub mod domain;

pub use domain::{DomainError, JoinError};
