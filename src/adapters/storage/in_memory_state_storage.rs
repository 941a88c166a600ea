//! In-Memory State Storage Adapter
//!
//! Stores conversation state in memory. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::SessionId;
use crate::ports::{StateStorage, StateStorageError};

/// In-memory storage for conversation state
#[derive(Debug, Clone)]
pub struct InMemoryStateStorage {
    states: Arc<RwLock<HashMap<SessionId, ConversationState>>>,
}

impl InMemoryStateStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.states.write().await.clear();
    }

    /// Get the number of stored states
    pub async fn state_count(&self) -> usize {
        self.states.read().await.len()
    }
}

impl Default for InMemoryStateStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStorage for InMemoryStateStorage {
    async fn save_state(
        &self,
        session_id: &SessionId,
        state: &ConversationState,
    ) -> Result<(), StateStorageError> {
        let mut states = self.states.write().await;
        states.insert(session_id.clone(), state.clone());
        Ok(())
    }

    async fn load_state(
        &self,
        session_id: &SessionId,
    ) -> Result<ConversationState, StateStorageError> {
        let states = self.states.read().await;
        states
            .get(session_id)
            .cloned()
            .ok_or_else(|| StateStorageError::NotFound(session_id.clone()))
    }

    async fn exists(&self, session_id: &SessionId) -> Result<bool, StateStorageError> {
        let states = self.states.read().await;
        Ok(states.contains_key(session_id))
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), StateStorageError> {
        self.states.write().await.remove(session_id);
        Ok(())
    }
}
