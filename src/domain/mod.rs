//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `conversation` - Dialogue state, routing tables, and prompt catalog

pub mod conversation;
pub mod foundation;
