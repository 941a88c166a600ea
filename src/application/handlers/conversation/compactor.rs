//! History compaction for long conversations.
//!
//! Once a turn ends with a user-visible reply from the teaching or
//! farewell step, histories past the threshold are folded into the
//! running summary and truncated to the most recent exchange. Compaction
//! is best-effort: when the summarizer call fails the history is left
//! intact and the next eligible turn retries.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::conversation::{prompts, ConversationState, MessageRole};
use crate::ports::{
    AIError, AIProvider, CompletionRequest, MessageRole as AIMessageRole, RequestMetadata,
};

/// Histories longer than this are eligible for compaction.
const COMPACTION_THRESHOLD: usize = 6;

/// How many of the newest messages survive a compaction.
const KEEP_RECENT_MESSAGES: usize = 2;

/// Whether a compaction attempt changed the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionOutcome {
    Compacted,
    Skipped,
}

/// Folds old messages into the running summary.
pub struct HistoryCompactor<P: ?Sized + AIProvider> {
    provider: Arc<P>,
    call_timeout: Duration,
}

impl<P: ?Sized + AIProvider> HistoryCompactor<P> {
    pub fn new(provider: Arc<P>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// True once the history has grown past the compaction threshold.
    pub fn needs_compaction(&self, state: &ConversationState) -> bool {
        state.messages.len() > COMPACTION_THRESHOLD
    }

    /// Summarizes the history and truncates it to the newest messages.
    ///
    /// The summary is created on first compaction and extended afterwards.
    /// Truncation only happens after the new summary is stored, so a failed
    /// summarizer call never loses messages. The last-agent marker is not a
    /// compaction concern and is left alone.
    pub async fn compact(&self, state: &mut ConversationState) -> CompactionOutcome {
        let instruction = if state.summary.is_empty() {
            prompts::summary_create_prompt().to_string()
        } else {
            prompts::summary_extend_prompt(&state.summary)
        };

        let mut request =
            CompletionRequest::new(RequestMetadata::new(state.session_id.clone(), "summarizer"))
                .with_temperature(0.3)
                .with_max_tokens(800);
        for message in &state.messages {
            let role = match message.role {
                MessageRole::User => AIMessageRole::User,
                MessageRole::Assistant => AIMessageRole::Assistant,
            };
            request = request.with_message(role, message.content.clone());
        }
        request = request.with_message(AIMessageRole::User, instruction);

        let summary = match self.complete(request).await {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    "summarization failed for session {}; keeping full history: {}",
                    state.session_id,
                    err
                );
                return CompactionOutcome::Skipped;
            }
        };

        state.set_summary(summary);
        let stale = state.stale_message_ids(KEEP_RECENT_MESSAGES);
        state.remove_messages(&stale);
        CompactionOutcome::Compacted
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, AIError> {
        let timeout_secs = self.call_timeout.as_secs() as u32;
        match tokio::time::timeout(self.call_timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(AIError::timeout(timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockAIProvider, MockError};
    use crate::domain::foundation::SessionId;

    fn chatty_state(message_count: usize) -> ConversationState {
        let mut state = ConversationState::new(SessionId::new("compact-test").unwrap());
        for i in 0..message_count {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            state.add_message(role, format!("mensaje {i}"));
        }
        state
    }

    fn compactor(provider: MockAIProvider) -> HistoryCompactor<MockAIProvider> {
        HistoryCompactor::new(Arc::new(provider), Duration::from_secs(5))
    }

    #[test]
    fn threshold_is_strictly_greater_than_six() {
        let compactor = compactor(MockAIProvider::new());
        assert!(!compactor.needs_compaction(&chatty_state(6)));
        assert!(compactor.needs_compaction(&chatty_state(7)));
    }

    #[tokio::test]
    async fn first_compaction_creates_summary_and_truncates() {
        let mut state = chatty_state(7);
        let kept: Vec<_> = state.messages[5..].iter().map(|m| m.id).collect();
        let compactor = compactor(MockAIProvider::new().with_response("resumen inicial"));

        let outcome = compactor.compact(&mut state).await;

        assert_eq!(outcome, CompactionOutcome::Compacted);
        assert_eq!(state.summary, "resumen inicial");
        assert_eq!(state.messages.len(), 2);
        let remaining: Vec<_> = state.messages.iter().map(|m| m.id).collect();
        assert_eq!(remaining, kept);
    }

    #[tokio::test]
    async fn later_compactions_extend_the_summary() {
        let mut state = chatty_state(8);
        state.set_summary("el usuario eligió renta");
        let compactor = compactor(MockAIProvider::new().with_response("resumen extendido"));

        compactor.compact(&mut state).await;

        assert_eq!(state.summary, "resumen extendido");
        let calls = compactor.provider.get_calls();
        let instruction = &calls.last().unwrap().messages.last().unwrap().content;
        assert!(instruction.contains("el usuario eligió renta"));
        assert!(instruction.contains("Extiende el resumen"));
    }

    #[tokio::test]
    async fn request_carries_history_plus_instruction() {
        let mut state = chatty_state(7);
        let compactor = compactor(MockAIProvider::new().with_response("resumen"));

        compactor.compact(&mut state).await;

        let calls = compactor.provider.get_calls();
        assert_eq!(calls.last().unwrap().messages.len(), 8);
    }

    #[tokio::test]
    async fn failed_summarization_leaves_history_intact() {
        let mut state = chatty_state(9);
        state.set_summary("resumen previo");
        let compactor = compactor(MockAIProvider::new().with_error(MockError::Unavailable {
            message: "down".to_string(),
        }));

        let outcome = compactor.compact(&mut state).await;

        assert_eq!(outcome, CompactionOutcome::Skipped);
        assert_eq!(state.messages.len(), 9);
        assert_eq!(state.summary, "resumen previo");
    }

    #[tokio::test]
    async fn compaction_never_touches_last_agent() {
        let mut state = chatty_state(7);
        state.set_last_agent("profesor");
        let compactor = compactor(MockAIProvider::new().with_response("resumen"));

        compactor.compact(&mut state).await;

        assert_eq!(state.last_agent.as_deref(), Some("profesor"));
    }
}
