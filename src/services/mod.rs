//! Service layer: the room registry and the session controller.

pub mod game_flow;
pub mod rooms;

pub use game_flow::GameFlowService;
