//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod conversation;

pub use conversation::{
    CompactionOutcome, EngineHealth, HandleTurnCommand, HandleTurnError, HandleTurnHandler,
    HandleTurnResult, HistoryCompactor, Pipeline, RoutePoint, StepFlow, StepRun,
};
