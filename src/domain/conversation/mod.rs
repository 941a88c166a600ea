//! Conversation domain module.
//!
//! State, routing tables, prompt catalog, and verdict parsing for the
//! retirement-plan intake dialogue. Everything here is pure; provider
//! calls live in the application layer.

pub mod classify;
pub mod prompts;
mod router;
mod state;

pub use classify::{CloseDecision, ReasonVerdict};
pub use router::{Router, StepKind};
pub use state::{
    ConversationState, ConversationStatus, GoalKind, Message, MessageRole, QuestionSlot,
};
