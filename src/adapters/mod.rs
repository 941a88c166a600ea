//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - AI provider implementations (Groq, mock)
//! - `storage` - Conversation state stores (SQLite, in-memory)

pub mod ai;
pub mod storage;

pub use ai::{GroqConfig, GroqProvider, MockAIProvider, MockError, MockResponse};
pub use storage::{InMemoryStateStorage, SqliteStateStorage};
