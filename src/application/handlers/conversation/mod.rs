//! Conversation turn handlers.
//!
//! Runs dialogue turns end to end: routing, step execution, and history
//! compaction.

mod compactor;
mod handle_turn;
mod steps;

pub use compactor::{CompactionOutcome, HistoryCompactor};
pub use handle_turn::{
    // Command
    HandleTurnCommand,
    HandleTurnError,
    HandleTurnHandler,
    HandleTurnResult,
    // Health
    EngineHealth,
};
pub use steps::{Pipeline, RoutePoint, StepFlow, StepRun};
