//! State Storage Adapters.
//!
//! Implementations of the StateStorage port.
//!
//! ## Available Adapters
//!
//! - `InMemoryStateStorage` - Volatile map for testing and development
//! - `SqliteStateStorage` - Durable single-file SQLite store

mod in_memory_state_storage;
mod sqlite_state_storage;

pub use in_memory_state_storage::InMemoryStateStorage;
pub use sqlite_state_storage::SqliteStateStorage;
