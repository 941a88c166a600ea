//! State Storage Port - Interface for persisting conversation state.
//!
//! This port defines how conversation state is saved and loaded,
//! supporting both in-memory and database-backed storage.

use async_trait::async_trait;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::SessionId;

/// Errors that can occur during state storage operations
#[derive(Debug, thiserror::Error)]
pub enum StateStorageError {
    #[error("State not found for session: {0}")]
    NotFound(SessionId),

    #[error("Failed to serialize state: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize state: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Port for persisting and loading conversation state
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Save conversation state
    ///
    /// # Arguments
    /// * `session_id` - The session ID
    /// * `state` - The conversation state to save
    ///
    /// # Errors
    /// Returns `StateStorageError` if save fails
    async fn save_state(
        &self,
        session_id: &SessionId,
        state: &ConversationState,
    ) -> Result<(), StateStorageError>;

    /// Load conversation state
    ///
    /// # Arguments
    /// * `session_id` - The session ID
    ///
    /// # Returns
    /// The loaded conversation state
    ///
    /// # Errors
    /// Returns `StateStorageError::NotFound` if no state exists
    async fn load_state(&self, session_id: &SessionId)
        -> Result<ConversationState, StateStorageError>;

    /// Check if state exists for a session
    ///
    /// # Arguments
    /// * `session_id` - The session ID
    ///
    /// # Returns
    /// `true` if state exists, `false` otherwise
    async fn exists(&self, session_id: &SessionId) -> Result<bool, StateStorageError>;

    /// Delete all state for a session
    ///
    /// # Arguments
    /// * `session_id` - The session ID
    ///
    /// # Errors
    /// Returns `StateStorageError` if deletion fails
    async fn delete(&self, session_id: &SessionId) -> Result<(), StateStorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session_id() -> SessionId {
        SessionId::new("session-1").unwrap()
    }

    #[test]
    fn test_state_storage_error_not_found() {
        let err = StateStorageError::NotFound(test_session_id());
        assert!(err.to_string().contains("State not found"));
        assert!(err.to_string().contains("session-1"));
    }

    #[test]
    fn test_state_storage_error_serialization() {
        let err = StateStorageError::SerializationFailed("Invalid JSON".to_string());
        assert!(err.to_string().contains("serialize"));
    }

    #[test]
    fn test_state_storage_error_database() {
        let err = StateStorageError::DatabaseError("connection refused".to_string());
        assert!(err.to_string().contains("Database error"));
    }
}
