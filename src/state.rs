//! Conversation state threaded through one conversation.
//!
//! Single-owner mutable record: created empty at conversation start, mutated
//! in place by each agent node, never destroyed mid-conversation. Serde-
//! enabled so an external collaborator can persist and reload it between
//! turns; the core itself holds no locking since it assumes single-session,
//! single-writer use.

use serde::{Deserialize, Serialize};

use crate::handoff::{AgentName, HandoffDecision};
use crate::issue::IssueDraft;
use crate::items::{Message, Role};

/// Mutable state for one conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Ordered user/assistant messages; append-only within a turn.
    pub conversation_history: Vec<Message>,

    /// The agent that last executed. Diagnostic, not authoritative for
    /// routing.
    pub current_node: Option<AgentName>,

    /// The most recent handoff decision. Authoritative for routing.
    pub handoff_decision: Option<HandoffDecision>,

    /// The accumulating structured output of the collection workflow.
    pub current_issues: Vec<IssueDraft>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message to the history.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.conversation_history.push(Message::user(content));
    }

    /// Appends an assistant message to the history.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.conversation_history.push(Message::assistant(content));
    }

    /// The content of the most recent assistant message, if the history ends
    /// with one.
    pub fn last_assistant_message(&self) -> Option<&str> {
        match self.conversation_history.last() {
            Some(msg) if msg.role == Role::Assistant => Some(&msg.content),
            _ => None,
        }
    }
}
