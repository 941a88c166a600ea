//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port for various LLM providers.
//!
//! ## Available Adapters
//!
//! - `MockAIProvider` - Configurable mock for testing
//! - `GroqProvider` - Groq-hosted open models (Llama 3, Mixtral, Gemma)

mod groq_provider;
mod mock_provider;

pub use groq_provider::{GroqConfig, GroqProvider};
pub use mock_provider::{MockAIProvider, MockError, MockResponse};
