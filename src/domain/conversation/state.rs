//! Conversation State Entity
//!
//! Tracks the complete state of an intake session: message history, the
//! running summary, the pipeline status, and the active question slot.
//! Independent of the AI provider and of the storage backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, SessionId, ValidationError};

/// Lifecycle status of a conversation.
///
/// Every transition is made by a pipeline step; the router only reads
/// this value. `EndConversation` is absorbing: once reached, turns are
/// answered with the closed-conversation notice and nothing else changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Fresh session, welcome not yet sent.
    Greeting,
    /// Open dialogue; the user is still working out an answer.
    Exploring,
    /// An answer was detected; a confirmation request must be sent.
    AskingConfirmation,
    /// Confirmation request sent; awaiting the user's verdict.
    WaitingConfirmation,
    /// The user confirmed; the farewell must be sent.
    Confirmed,
    /// The conversation is closed.
    EndConversation,
}

impl ConversationStatus {
    /// Returns true once the conversation has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::EndConversation)
    }
}

impl Default for ConversationStatus {
    fn default() -> Self {
        Self::Greeting
    }
}

/// Role of a stored message sender.
///
/// Stored history only ever contains user and assistant turns; system
/// prompts are rebuilt per request and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The question the session is currently working on.
///
/// Serialized identifiers are the caller-facing wire strings and are also
/// what lands in persisted snapshots, so they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionSlot {
    /// Choice of plan type (final amount / income / duration).
    #[serde(rename = "tipo_objetivo")]
    PlanType,
    /// The parameterized goal question; resolved per turn via [`GoalKind`].
    #[serde(rename = "objetivo")]
    Goal,
    /// Goal question specialized to a final-amount plan.
    #[serde(rename = "objetivo_monto_final")]
    GoalFinalAmount,
    /// Goal question specialized to a monthly-income plan.
    #[serde(rename = "objetivo_renta")]
    GoalMonthlyIncome,
    /// Goal question specialized to a fixed-duration plan.
    #[serde(rename = "objetivo_duracion")]
    GoalDuration,
    /// Starting capital.
    #[serde(rename = "monto_inicial")]
    InitialAmount,
    /// Monthly contribution.
    #[serde(rename = "aporte_mensual")]
    MonthlyContribution,
}

impl QuestionSlot {
    /// Returns the wire identifier for this slot.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::PlanType => "tipo_objetivo",
            Self::Goal => "objetivo",
            Self::GoalFinalAmount => "objetivo_monto_final",
            Self::GoalMonthlyIncome => "objetivo_renta",
            Self::GoalDuration => "objetivo_duracion",
            Self::InitialAmount => "monto_inicial",
            Self::MonthlyContribution => "aporte_mensual",
        }
    }

    /// Parses a wire identifier into a slot.
    pub fn from_wire(s: &str) -> Result<Self, ValidationError> {
        match s {
            "tipo_objetivo" => Ok(Self::PlanType),
            "objetivo" => Ok(Self::Goal),
            "objetivo_monto_final" => Ok(Self::GoalFinalAmount),
            "objetivo_renta" => Ok(Self::GoalMonthlyIncome),
            "objetivo_duracion" => Ok(Self::GoalDuration),
            "monto_inicial" => Ok(Self::InitialAmount),
            "aporte_mensual" => Ok(Self::MonthlyContribution),
            other => Err(ValidationError::invalid_format(
                "question_slot",
                format!("unknown identifier '{}'", other),
            )),
        }
    }

    /// Resolves the parameterized goal slot against the chosen plan type.
    ///
    /// Concrete slots pass through untouched; `Goal` without a known plan
    /// type also passes through and is handled by the question catalog.
    pub fn resolve(self, goal: Option<GoalKind>) -> Self {
        match (self, goal) {
            (Self::Goal, Some(kind)) => kind.goal_slot(),
            (slot, _) => slot,
        }
    }
}

impl std::fmt::Display for QuestionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// The plan type a user can pick, used to specialize the goal question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalKind {
    /// Save toward a target amount.
    #[serde(rename = "monto_final")]
    FinalAmount,
    /// Build a monthly income stream.
    #[serde(rename = "renta")]
    MonthlyIncome,
    /// Sustain withdrawals over a fixed period.
    #[serde(rename = "duracion")]
    Duration,
}

impl GoalKind {
    /// Returns the wire identifier for this plan type.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::FinalAmount => "monto_final",
            Self::MonthlyIncome => "renta",
            Self::Duration => "duracion",
        }
    }

    /// Parses a wire identifier into a plan type.
    pub fn from_wire(s: &str) -> Result<Self, ValidationError> {
        match s {
            "monto_final" => Ok(Self::FinalAmount),
            "renta" => Ok(Self::MonthlyIncome),
            "duracion" => Ok(Self::Duration),
            other => Err(ValidationError::invalid_format(
                "goal_kind",
                format!("unknown identifier '{}'", other),
            )),
        }
    }

    /// Returns the concrete goal slot for this plan type.
    pub fn goal_slot(&self) -> QuestionSlot {
        match self {
            Self::FinalAmount => QuestionSlot::GoalFinalAmount,
            Self::MonthlyIncome => QuestionSlot::GoalMonthlyIncome,
            Self::Duration => QuestionSlot::GoalDuration,
        }
    }
}

/// Complete state of an intake session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub summary: String,
    pub status: ConversationStatus,
    pub greeted: bool,
    pub question_slot: Option<QuestionSlot>,
    pub reason: Option<String>,
    pub user: Option<String>,
    pub last_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Create a fresh session state
    pub fn new(session_id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            messages: Vec::new(),
            summary: String::new(),
            status: ConversationStatus::Greeting,
            greeted: false,
            question_slot: None,
            reason: None,
            user: None,
            last_agent: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the history
    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) -> MessageId {
        let message_id = MessageId::new();
        self.messages.push(Message {
            id: message_id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        self.updated_at = Utc::now();
        message_id
    }

    /// Get the most recent user message, if any
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
    }

    /// Change the lifecycle status
    pub fn set_status(&mut self, status: ConversationStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Record that the welcome was sent. Never reverts.
    pub fn mark_greeted(&mut self) {
        if !self.greeted {
            self.greeted = true;
            self.updated_at = Utc::now();
        }
    }

    /// Record the question slot active this turn
    pub fn set_question_slot(&mut self, slot: QuestionSlot) {
        self.question_slot = Some(slot);
        self.updated_at = Utc::now();
    }

    /// Record the detected answer to the active question
    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    /// Attribute the session to a user. Only the first write sticks.
    pub fn set_user(&mut self, user: impl Into<String>) {
        if self.user.is_none() {
            self.user = Some(user.into());
            self.updated_at = Utc::now();
        }
    }

    /// Record which step produced the latest reply
    pub fn set_last_agent(&mut self, agent: impl Into<String>) {
        self.last_agent = Some(agent.into());
        self.updated_at = Utc::now();
    }

    /// Replace the running summary
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
        self.updated_at = Utc::now();
    }

    /// Ids of every message except the `keep_recent` most recent ones
    pub fn stale_message_ids(&self, keep_recent: usize) -> Vec<MessageId> {
        if self.messages.len() <= keep_recent {
            return Vec::new();
        }
        let cutoff = self.messages.len() - keep_recent;
        self.messages[..cutoff].iter().map(|m| m.id).collect()
    }

    /// Remove messages by id, preserving the order of the rest
    pub fn remove_messages(&mut self, ids: &[MessageId]) {
        let before = self.messages.len();
        self.messages.retain(|m| !ids.contains(&m.id));
        if self.messages.len() != before {
            self.updated_at = Utc::now();
        }
    }
}
