//! Step execution for the dialogue pipeline.
//!
//! Each step mirrors one node of the intake flow: it reads the loaded
//! [`ConversationState`], performs at most one model call, and applies its
//! mutations only after that call resolves. A failed or timed-out call
//! falls back to a fixed reply (or a conservative verdict) so the turn
//! always completes; only storage failures abort a turn.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::conversation::{
    classify, prompts, CloseDecision, ConversationState, ConversationStatus, MessageRole,
};
use crate::ports::{
    AIError, AIProvider, CompletionRequest, MessageRole as AIMessageRole, RequestMetadata,
};

/// Where the router resumes after a non-replying step finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePoint {
    AfterValidateReason,
    AfterEvaluateClose,
}

/// What the turn loop should do once a step returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFlow {
    /// The step produced the reply; finish the turn.
    EndTurn,
    /// The step produced the reply and the turn is eligible for history
    /// compaction before persisting.
    EndTurnWithCompaction,
    /// The step produced no reply; route again from the given point.
    Continue(RoutePoint),
}

/// Outcome of running a single step.
#[derive(Debug, Clone)]
pub struct StepRun {
    pub reply: Option<String>,
    pub flow: StepFlow,
}

impl StepRun {
    fn end_turn(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            flow: StepFlow::EndTurn,
        }
    }

    fn end_turn_with_compaction(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            flow: StepFlow::EndTurnWithCompaction,
        }
    }

    fn continue_at(point: RoutePoint) -> Self {
        Self {
            reply: None,
            flow: StepFlow::Continue(point),
        }
    }
}

/// Executes pipeline steps against a conversation state.
///
/// Holds the provider and the per-call timeout; all other inputs come from
/// the state itself. Steps never persist anything.
pub struct Pipeline<P: ?Sized + AIProvider> {
    provider: Arc<P>,
    call_timeout: Duration,
}

impl<P: ?Sized + AIProvider> Pipeline<P> {
    pub fn new(provider: Arc<P>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// Opens the session with the fixed welcome for the active slot.
    ///
    /// No model call: the greeting text is part of the product copy.
    pub fn greet(&self, state: &mut ConversationState) -> StepRun {
        let text = prompts::greeting(state.question_slot);
        state.add_message(MessageRole::Assistant, text);
        state.mark_greeted();
        state.set_status(ConversationStatus::Exploring);
        state.set_last_agent("greet");
        StepRun::end_turn(text)
    }

    /// Checks whether the latest user message answers the active question.
    ///
    /// Only acts while the session is exploring; in any other status it is
    /// a pass-through and the router decides the next step. A detected
    /// answer records the reason and moves the session to confirmation.
    pub async fn validate_reason(&self, state: &mut ConversationState) -> StepRun {
        if state.status != ConversationStatus::Exploring {
            return StepRun::continue_at(RoutePoint::AfterValidateReason);
        }

        let Some(slot) = state.question_slot else {
            tracing::warn!(
                "no question slot stored for session {}; skipping answer detection",
                state.session_id
            );
            return StepRun::continue_at(RoutePoint::AfterValidateReason);
        };

        let Some(user_text) = state.last_user_message().map(|m| m.content.clone()) else {
            return StepRun::continue_at(RoutePoint::AfterValidateReason);
        };

        let question = prompts::question_text(Some(slot));
        let request = CompletionRequest::new(self.metadata(state, "validate_reason"))
            .with_system_prompt(prompts::reason_detection_prompt(slot, question, &user_text))
            .with_message(AIMessageRole::User, user_text)
            .with_temperature(0.1)
            .with_max_tokens(300);

        let verdict = match self.complete(request).await {
            Ok(content) => classify::parse_reason_verdict(&content),
            Err(err) => {
                tracing::warn!(
                    "answer detection failed for session {}: {}",
                    state.session_id,
                    err
                );
                classify::ReasonVerdict::unanswered()
            }
        };

        if verdict.has_response {
            if let Some(reason) = verdict.reason {
                state.set_reason(reason);
                state.set_status(ConversationStatus::AskingConfirmation);
            }
        }

        StepRun::continue_at(RoutePoint::AfterValidateReason)
    }

    /// Asks the user to confirm the detected answer.
    pub async fn confirmation(&self, state: &mut ConversationState) -> StepRun {
        let question = prompts::question_text(state.question_slot);
        let reason = state
            .reason
            .clone()
            .unwrap_or_else(|| "tu elección".to_string());

        let request = CompletionRequest::new(self.metadata(state, "confirmation"))
            .with_system_prompt(prompts::confirmation_prompt(question, &reason))
            .with_message(AIMessageRole::User, prompts::confirmation_nudge())
            .with_temperature(0.7)
            .with_max_tokens(500);

        let reply = match self.complete(request).await {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    "confirmation request failed for session {}: {}",
                    state.session_id,
                    err
                );
                prompts::confirmation_fallback(&reason)
            }
        };

        state.add_message(MessageRole::Assistant, reply.clone());
        state.set_status(ConversationStatus::WaitingConfirmation);
        state.set_last_agent("confirmation");
        StepRun::end_turn(reply)
    }

    /// Classifies the user's reaction to the pending confirmation request.
    ///
    /// Confirmed closes the loop, a request for more information reopens
    /// exploration, and an undecided reaction leaves the session waiting so
    /// the confirmation is asked again. A session that reaches this step
    /// without its question or reason is inconsistent and is sent back to
    /// exploration.
    pub async fn evaluate_close(&self, state: &mut ConversationState) -> StepRun {
        if state.status != ConversationStatus::WaitingConfirmation {
            return StepRun::continue_at(RoutePoint::AfterEvaluateClose);
        }

        if state.question_slot.is_none() || state.reason.is_none() {
            tracing::warn!(
                "missing confirmation context for session {}; reopening exploration",
                state.session_id
            );
            state.set_status(ConversationStatus::Exploring);
            return StepRun::continue_at(RoutePoint::AfterEvaluateClose);
        }

        let user_text = state
            .last_user_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let request = CompletionRequest::new(self.metadata(state, "evaluate_close"))
            .with_system_prompt(prompts::close_evaluation_prompt())
            .with_message(AIMessageRole::User, user_text)
            .with_temperature(0.1)
            .with_max_tokens(300);

        let decision = match self.complete(request).await {
            Ok(content) => classify::parse_close_decision(&content),
            Err(err) => {
                tracing::warn!(
                    "close evaluation failed for session {}: {}",
                    state.session_id,
                    err
                );
                CloseDecision::NeedsExplanation
            }
        };

        match decision {
            CloseDecision::Confirmed => state.set_status(ConversationStatus::Confirmed),
            CloseDecision::NeedsExplanation => state.set_status(ConversationStatus::Exploring),
            CloseDecision::StillUndecided => {}
        }

        StepRun::continue_at(RoutePoint::AfterEvaluateClose)
    }

    /// Produces the free-form teaching reply over the full history.
    pub async fn responder(&self, state: &mut ConversationState) -> StepRun {
        let system_prompt = prompts::responder_system_prompt(state.question_slot, &state.summary);

        let mut request = CompletionRequest::new(self.metadata(state, "profesor"))
            .with_system_prompt(system_prompt)
            .with_temperature(0.2)
            .with_max_tokens(800);
        for message in &state.messages {
            request = request.with_message(ai_role(message.role), message.content.clone());
        }

        let reply = match self.complete(request).await {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    "teaching reply failed for session {}: {}",
                    state.session_id,
                    err
                );
                prompts::responder_fallback().to_string()
            }
        };

        state.add_message(MessageRole::Assistant, reply.clone());
        state.set_last_agent("profesor");
        StepRun::end_turn_with_compaction(reply)
    }

    /// Closes the conversation with a farewell.
    ///
    /// The farewell is personalized from the confirmed choice when the
    /// context is complete; otherwise the generic closing is used without a
    /// model call.
    pub async fn end_conversation(&self, state: &mut ConversationState) -> StepRun {
        let reply = match (state.question_slot, state.reason.clone()) {
            (Some(slot), Some(reason)) => {
                let question = prompts::question_text(Some(slot));
                let request = CompletionRequest::new(self.metadata(state, "end_conversation"))
                    .with_system_prompt(prompts::farewell_prompt(question, &reason))
                    .with_message(AIMessageRole::User, prompts::farewell_nudge())
                    .with_temperature(0.7)
                    .with_max_tokens(400);

                match self.complete(request).await {
                    Ok(content) => content,
                    Err(err) => {
                        tracing::warn!(
                            "farewell generation failed for session {}: {}",
                            state.session_id,
                            err
                        );
                        prompts::farewell_fallback().to_string()
                    }
                }
            }
            _ => prompts::farewell_fallback().to_string(),
        };

        state.add_message(MessageRole::Assistant, reply.clone());
        state.set_status(ConversationStatus::EndConversation);
        state.set_last_agent("end_conversation");
        StepRun::end_turn_with_compaction(reply)
    }

    /// Replies to turns that arrive after the conversation closed.
    ///
    /// Appends the notice but leaves status and last agent untouched, so
    /// repeated turns on a closed session are observationally identical.
    pub fn conversation_closed(&self, state: &mut ConversationState) -> StepRun {
        let text = prompts::closed_notice();
        state.add_message(MessageRole::Assistant, text);
        StepRun::end_turn(text)
    }

    fn metadata(&self, state: &ConversationState, step: &str) -> RequestMetadata {
        RequestMetadata::new(state.session_id.clone(), step)
    }

    /// Calls the provider with the configured timeout and returns the
    /// completion text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AIError> {
        let timeout_secs = self.call_timeout.as_secs() as u32;
        match tokio::time::timeout(self.call_timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(AIError::timeout(timeout_secs)),
        }
    }
}

fn ai_role(role: MessageRole) -> AIMessageRole {
    match role {
        MessageRole::User => AIMessageRole::User,
        MessageRole::Assistant => AIMessageRole::Assistant,
    }
}
