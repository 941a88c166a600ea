//! Foundation module - Shared domain primitives.
//!
//! Contains the identifier value objects and error types that form
//! the vocabulary of the Plan Mentor domain.

mod errors;
mod ids;

pub use errors::ValidationError;
pub use ids::{MessageId, SessionId};
