//! Value Objects - Immutable, identity-less domain primitives

mod emotion;
mod session_id;

pub use emotion::Emotion;
pub use session_id::SessionId;
