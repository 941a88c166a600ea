//! Turn routing.
//!
//! Pure functions from conversation state to the next pipeline step.
//! All status transitions happen inside the steps; the router only reads
//! state, so every routing decision is reproducible from a snapshot.

use super::state::ConversationStatus;

/// The pipeline steps a turn can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Send the fixed welcome for the active question.
    Greet,
    /// Classify whether the latest user message answers the active question.
    ValidateReason,
    /// Ask the user to confirm the detected answer.
    Confirmation,
    /// Interpret the user's reaction to the confirmation request.
    EvaluateClose,
    /// Free-form teaching reply ("profesor").
    Responder,
    /// Send the farewell and close the conversation.
    EndConversation,
    /// Notice for turns arriving after closure.
    ConversationClosed,
}

impl StepKind {
    /// Name reported to callers through `last_agent`.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Greet => "greet",
            Self::ValidateReason => "validate_reason",
            Self::Confirmation => "confirmation",
            Self::EvaluateClose => "evaluate_close",
            Self::Responder => "profesor",
            Self::EndConversation => "end_conversation",
            Self::ConversationClosed => "conversation_closed",
        }
    }
}

/// Pure routing tables for a turn.
#[derive(Debug, Clone)]
pub struct Router;

impl Router {
    /// Picks the first step of a turn.
    ///
    /// Closure wins over everything else; an ungreeted session is greeted
    /// before any classification happens.
    pub fn entry(status: ConversationStatus, greeted: bool) -> StepKind {
        if status.is_closed() {
            return StepKind::ConversationClosed;
        }
        if !greeted {
            return StepKind::Greet;
        }
        StepKind::ValidateReason
    }

    /// Picks the step that follows ValidateReason.
    pub fn after_validate_reason(status: ConversationStatus) -> StepKind {
        match status {
            ConversationStatus::AskingConfirmation => StepKind::Confirmation,
            ConversationStatus::WaitingConfirmation => StepKind::EvaluateClose,
            _ => StepKind::Responder,
        }
    }

    /// Picks the step that follows EvaluateClose.
    pub fn after_evaluate_close(status: ConversationStatus) -> StepKind {
        match status {
            ConversationStatus::Confirmed => StepKind::EndConversation,
            ConversationStatus::WaitingConfirmation => StepKind::Confirmation,
            _ => StepKind::Responder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = ConversationStatus> {
        prop_oneof![
            Just(ConversationStatus::Greeting),
            Just(ConversationStatus::Exploring),
            Just(ConversationStatus::AskingConfirmation),
            Just(ConversationStatus::WaitingConfirmation),
            Just(ConversationStatus::Confirmed),
            Just(ConversationStatus::EndConversation),
        ]
    }

    mod entry_routing {
        use super::*;

        #[test]
        fn closed_session_routes_to_closed_notice() {
            let step = Router::entry(ConversationStatus::EndConversation, true);
            assert_eq!(step, StepKind::ConversationClosed);
        }

        #[test]
        fn closure_wins_over_missing_greeting() {
            let step = Router::entry(ConversationStatus::EndConversation, false);
            assert_eq!(step, StepKind::ConversationClosed);
        }

        #[test]
        fn ungreeted_session_routes_to_greet() {
            let step = Router::entry(ConversationStatus::Greeting, false);
            assert_eq!(step, StepKind::Greet);
        }

        #[test]
        fn greeted_open_session_routes_to_validate() {
            assert_eq!(
                Router::entry(ConversationStatus::Exploring, true),
                StepKind::ValidateReason
            );
            assert_eq!(
                Router::entry(ConversationStatus::WaitingConfirmation, true),
                StepKind::ValidateReason
            );
        }
    }

    mod post_validate_routing {
        use super::*;

        #[test]
        fn asking_confirmation_routes_to_confirmation() {
            assert_eq!(
                Router::after_validate_reason(ConversationStatus::AskingConfirmation),
                StepKind::Confirmation
            );
        }

        #[test]
        fn waiting_confirmation_routes_to_evaluate() {
            assert_eq!(
                Router::after_validate_reason(ConversationStatus::WaitingConfirmation),
                StepKind::EvaluateClose
            );
        }

        #[test]
        fn anything_else_routes_to_responder() {
            assert_eq!(
                Router::after_validate_reason(ConversationStatus::Exploring),
                StepKind::Responder
            );
            assert_eq!(
                Router::after_validate_reason(ConversationStatus::Greeting),
                StepKind::Responder
            );
        }
    }

    mod post_evaluate_routing {
        use super::*;

        #[test]
        fn confirmed_routes_to_end_conversation() {
            assert_eq!(
                Router::after_evaluate_close(ConversationStatus::Confirmed),
                StepKind::EndConversation
            );
        }

        #[test]
        fn still_waiting_routes_back_to_confirmation() {
            assert_eq!(
                Router::after_evaluate_close(ConversationStatus::WaitingConfirmation),
                StepKind::Confirmation
            );
        }

        #[test]
        fn anything_else_routes_to_responder() {
            assert_eq!(
                Router::after_evaluate_close(ConversationStatus::Exploring),
                StepKind::Responder
            );
        }
    }

    proptest! {
        #[test]
        fn entry_on_closed_status_is_always_closed_notice(greeted in any::<bool>()) {
            prop_assert_eq!(
                Router::entry(ConversationStatus::EndConversation, greeted),
                StepKind::ConversationClosed
            );
        }

        #[test]
        fn entry_never_picks_a_continuation_step(
            status in any_status(),
            greeted in any::<bool>(),
        ) {
            let step = Router::entry(status, greeted);
            prop_assert!(matches!(
                step,
                StepKind::ConversationClosed | StepKind::Greet | StepKind::ValidateReason
            ));
        }

        #[test]
        fn post_validate_stays_inside_its_table(status in any_status()) {
            let step = Router::after_validate_reason(status);
            prop_assert!(matches!(
                step,
                StepKind::Confirmation | StepKind::EvaluateClose | StepKind::Responder
            ));
        }

        #[test]
        fn post_evaluate_stays_inside_its_table(status in any_status()) {
            let step = Router::after_evaluate_close(status);
            prop_assert!(matches!(
                step,
                StepKind::EndConversation | StepKind::Confirmation | StepKind::Responder
            ));
        }
    }

    #[test]
    fn agent_names_are_stable() {
        assert_eq!(StepKind::Greet.agent_name(), "greet");
        assert_eq!(StepKind::ValidateReason.agent_name(), "validate_reason");
        assert_eq!(StepKind::Confirmation.agent_name(), "confirmation");
        assert_eq!(StepKind::EvaluateClose.agent_name(), "evaluate_close");
        assert_eq!(StepKind::Responder.agent_name(), "profesor");
        assert_eq!(StepKind::EndConversation.agent_name(), "end_conversation");
        assert_eq!(StepKind::ConversationClosed.agent_name(), "conversation_closed");
    }
}
