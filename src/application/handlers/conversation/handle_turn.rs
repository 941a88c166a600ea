//! HandleTurnHandler - Run one dialogue turn end to end
//!
//! A turn is: resolve the caller's question slot, serialize on the
//! session, load the stored snapshot, record the user message, run
//! routed steps until one replies, maybe compact the history, persist,
//! reply. The persisted snapshot is only acknowledged after the save
//! succeeds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::domain::conversation::{
    prompts, ConversationState, GoalKind, MessageRole, QuestionSlot, Router, StepKind,
};
use crate::domain::foundation::SessionId;
use crate::ports::{AIProvider, ProviderInfo, StateStorage, StateStorageError};

use super::compactor::HistoryCompactor;
use super::steps::{Pipeline, RoutePoint, StepFlow};

/// Routing tables chain at most validate, evaluate, and one replying step.
const MAX_STEPS_PER_TURN: usize = 3;

/// Command to run one turn of a session.
#[derive(Debug, Clone)]
pub struct HandleTurnCommand {
    pub session_id: SessionId,
    pub message: String,
    /// Slot the caller is currently asking about.
    pub question_slot: QuestionSlot,
    /// Discriminator for the goal slot family; ignored for concrete slots.
    pub goal_kind: Option<GoalKind>,
    /// Display name of the person speaking, recorded on first sight.
    pub user: Option<String>,
}

/// Result of running one turn.
#[derive(Debug, Clone)]
pub struct HandleTurnResult {
    pub reply_text: String,
    pub last_agent: String,
    pub session_id: SessionId,
}

/// Error type for turn handling
#[derive(Debug, Clone)]
pub enum HandleTurnError {
    /// Storage error
    Storage(String),
}

impl std::fmt::Display for HandleTurnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleTurnError::Storage(err) => write!(f, "Storage error: {}", err),
        }
    }
}

impl std::error::Error for HandleTurnError {}

impl From<StateStorageError> for HandleTurnError {
    fn from(err: StateStorageError) -> Self {
        HandleTurnError::Storage(err.to_string())
    }
}

/// Liveness snapshot for the transport layer.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub status: String,
    pub provider: ProviderInfo,
}

/// Handler running dialogue turns against a provider and a state store.
pub struct HandleTurnHandler<P: ?Sized + AIProvider> {
    storage: Arc<dyn StateStorage>,
    provider: Arc<P>,
    pipeline: Pipeline<P>,
    compactor: HistoryCompactor<P>,
    session_locks: tokio::sync::Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<P: ?Sized + AIProvider> HandleTurnHandler<P> {
    pub fn new(storage: Arc<dyn StateStorage>, provider: Arc<P>, call_timeout: Duration) -> Self {
        Self {
            storage,
            provider: provider.clone(),
            pipeline: Pipeline::new(provider.clone(), call_timeout),
            compactor: HistoryCompactor::new(provider, call_timeout),
            session_locks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleTurnCommand,
    ) -> Result<HandleTurnResult, HandleTurnError> {
        // 1. Resolve the concrete question slot before touching any state
        let slot = cmd.question_slot.resolve(cmd.goal_kind);

        // 2. Serialize turns for this session
        let _turn_guard = self.session_lock(&cmd.session_id).await;

        // 3. Load the stored snapshot; anything but a clean load starts fresh
        let mut state = match self.storage.load_state(&cmd.session_id).await {
            Ok(state) => state,
            Err(StateStorageError::NotFound(_)) => ConversationState::new(cmd.session_id.clone()),
            Err(err) => {
                tracing::warn!(
                    "failed to load state for session {}; starting fresh: {}",
                    cmd.session_id,
                    err
                );
                ConversationState::new(cmd.session_id.clone())
            }
        };

        // 4. Record the turn inputs
        state.set_question_slot(slot);
        if let Some(user) = cmd.user {
            state.set_user(user);
        }
        state.add_message(MessageRole::User, cmd.message);

        // 5. Route steps until one produces the reply
        let (reply, compaction_eligible) = self.run_steps(&mut state).await;

        // 6. Compact long histories once the reply is settled
        if compaction_eligible && self.compactor.needs_compaction(&state) {
            self.compactor.compact(&mut state).await;
        }

        // 7. Persist before acknowledging; a failed save fails the turn
        if let Err(err) = self.storage.save_state(&cmd.session_id, &state).await {
            tracing::error!(
                "failed to persist state for session {}: {}",
                cmd.session_id,
                err
            );
            return Err(err.into());
        }

        Ok(HandleTurnResult {
            reply_text: reply,
            last_agent: state
                .last_agent
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            session_id: cmd.session_id,
        })
    }

    /// Reports engine liveness and the active provider.
    pub fn health(&self) -> EngineHealth {
        EngineHealth {
            status: "healthy".to_string(),
            provider: self.provider.provider_info(),
        }
    }

    async fn run_steps(&self, state: &mut ConversationState) -> (String, bool) {
        let mut step = Router::entry(state.status, state.greeted);

        for _ in 0..MAX_STEPS_PER_TURN {
            tracing::debug!(
                "session {} running step {}",
                state.session_id,
                step.agent_name()
            );

            let run = match step {
                StepKind::Greet => self.pipeline.greet(state),
                StepKind::ValidateReason => self.pipeline.validate_reason(state).await,
                StepKind::Confirmation => self.pipeline.confirmation(state).await,
                StepKind::EvaluateClose => self.pipeline.evaluate_close(state).await,
                StepKind::Responder => self.pipeline.responder(state).await,
                StepKind::EndConversation => self.pipeline.end_conversation(state).await,
                StepKind::ConversationClosed => self.pipeline.conversation_closed(state),
            };

            match run.flow {
                StepFlow::EndTurn => return (run.reply.unwrap_or_default(), false),
                StepFlow::EndTurnWithCompaction => return (run.reply.unwrap_or_default(), true),
                StepFlow::Continue(RoutePoint::AfterValidateReason) => {
                    step = Router::after_validate_reason(state.status);
                }
                StepFlow::Continue(RoutePoint::AfterEvaluateClose) => {
                    step = Router::after_evaluate_close(state.status);
                }
            }
        }

        // The tables bound every turn at three steps, so this is unreachable
        // through them. Fail closed with the generic reply.
        tracing::warn!(
            "routing did not settle within {} steps for session {}",
            MAX_STEPS_PER_TURN,
            state.session_id
        );
        (prompts::responder_fallback().to_string(), false)
    }

    async fn session_lock(&self, session_id: &SessionId) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.session_locks.lock().await;
            locks.entry(session_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::adapters::{InMemoryStateStorage, MockAIProvider};
    use crate::domain::conversation::ConversationStatus;

    fn test_session_id() -> SessionId {
        SessionId::new("turn-test").unwrap()
    }

    fn turn(message: &str) -> HandleTurnCommand {
        HandleTurnCommand {
            session_id: test_session_id(),
            message: message.to_string(),
            question_slot: QuestionSlot::PlanType,
            goal_kind: None,
            user: None,
        }
    }

    fn handler(
        storage: Arc<dyn StateStorage>,
        provider: MockAIProvider,
    ) -> HandleTurnHandler<MockAIProvider> {
        HandleTurnHandler::new(storage, Arc::new(provider), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn first_turn_greets_without_a_model_call() {
        let storage = Arc::new(InMemoryStateStorage::new());
        let handler = handler(storage.clone(), MockAIProvider::new());

        let result = handler.handle(turn("hola")).await.unwrap();

        assert!(result.reply_text.starts_with("¡Hola!"));
        assert_eq!(result.last_agent, "greet");
        assert_eq!(result.session_id, test_session_id());
        assert_eq!(handler.provider.call_count(), 0);

        let state = storage.load_state(&test_session_id()).await.unwrap();
        assert!(state.greeted);
        assert_eq!(state.status, ConversationStatus::Exploring);
        assert_eq!(state.messages.len(), 2);
    }

    #[tokio::test]
    async fn goal_kind_resolves_the_slot_before_the_turn_runs() {
        let storage = Arc::new(InMemoryStateStorage::new());
        let handler = handler(storage.clone(), MockAIProvider::new());

        let cmd = HandleTurnCommand {
            session_id: test_session_id(),
            message: "hola".to_string(),
            question_slot: QuestionSlot::Goal,
            goal_kind: Some(GoalKind::MonthlyIncome),
            user: None,
        };
        handler.handle(cmd).await.unwrap();

        let state = storage.load_state(&test_session_id()).await.unwrap();
        assert_eq!(state.question_slot, Some(QuestionSlot::GoalMonthlyIncome));
    }

    #[tokio::test]
    async fn user_attribution_sticks_to_the_first_writer() {
        let storage = Arc::new(InMemoryStateStorage::new());
        let handler = handler(
            storage.clone(),
            MockAIProvider::new().with_response(r#"{"has_response": 0, "reason": null}"#),
        );

        let mut cmd = turn("hola");
        cmd.user = Some("marta".to_string());
        handler.handle(cmd).await.unwrap();

        let mut cmd = turn("tengo dudas");
        cmd.user = Some("otro".to_string());
        handler.handle(cmd).await.unwrap();

        let state = storage.load_state(&test_session_id()).await.unwrap();
        assert_eq!(state.user.as_deref(), Some("marta"));
    }

    #[tokio::test]
    async fn save_failure_fails_the_turn() {
        struct BrokenStorage;

        #[async_trait]
        impl StateStorage for BrokenStorage {
            async fn save_state(
                &self,
                _session_id: &SessionId,
                _state: &ConversationState,
            ) -> Result<(), StateStorageError> {
                Err(StateStorageError::IoError("disk full".to_string()))
            }

            async fn load_state(
                &self,
                session_id: &SessionId,
            ) -> Result<ConversationState, StateStorageError> {
                Err(StateStorageError::NotFound(session_id.clone()))
            }

            async fn exists(&self, _session_id: &SessionId) -> Result<bool, StateStorageError> {
                Ok(false)
            }

            async fn delete(&self, _session_id: &SessionId) -> Result<(), StateStorageError> {
                Ok(())
            }
        }

        let handler = handler(Arc::new(BrokenStorage), MockAIProvider::new());

        let result = handler.handle(turn("hola")).await;

        assert!(matches!(result, Err(HandleTurnError::Storage(_))));
    }

    #[tokio::test]
    async fn load_failure_starts_a_fresh_session() {
        struct FlakyLoadStorage {
            inner: InMemoryStateStorage,
        }

        #[async_trait]
        impl StateStorage for FlakyLoadStorage {
            async fn save_state(
                &self,
                session_id: &SessionId,
                state: &ConversationState,
            ) -> Result<(), StateStorageError> {
                self.inner.save_state(session_id, state).await
            }

            async fn load_state(
                &self,
                _session_id: &SessionId,
            ) -> Result<ConversationState, StateStorageError> {
                Err(StateStorageError::DatabaseError("corrupt row".to_string()))
            }

            async fn exists(&self, session_id: &SessionId) -> Result<bool, StateStorageError> {
                self.inner.exists(session_id).await
            }

            async fn delete(&self, session_id: &SessionId) -> Result<(), StateStorageError> {
                self.inner.delete(session_id).await
            }
        }

        let handler = handler(
            Arc::new(FlakyLoadStorage {
                inner: InMemoryStateStorage::new(),
            }),
            MockAIProvider::new(),
        );

        let result = handler.handle(turn("hola")).await.unwrap();

        assert!(result.reply_text.starts_with("¡Hola!"));
        assert_eq!(result.last_agent, "greet");
    }

    #[tokio::test]
    async fn health_reports_the_provider() {
        let handler = handler(Arc::new(InMemoryStateStorage::new()), MockAIProvider::new());

        let health = handler.health();

        assert_eq!(health.status, "healthy");
        assert_eq!(health.provider.name, "mock");
    }
}
