//! Najua: a multi-agent conversation orchestrator for citizen issue
//! reporting.
//!
//! Citizens describe non-emergency civic issues in free text; a triage agent
//! routes the conversation, a detail-collection agent fills a structured
//! issue record field by field, and a persistence agent reviews and saves
//! completed records. Agents communicate through typed handoff decisions; an
//! explicit routing engine and entry-point resolver drive one user turn at a
//! time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use najua::{ConversationState, Graph, LlmInvoker};
//!
//! # async fn run() -> najua::Result<()> {
//! let invoker = Arc::new(LlmInvoker::from_env()?);
//! let graph = Graph::new(invoker);
//!
//! let mut state = ConversationState::new();
//! graph.run_turn(&mut state, "There is a huge pothole on Moi Avenue").await?;
//!
//! if let Some(reply) = state.last_assistant_message() {
//!     println!("{reply}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod handoff;
pub mod issue;
pub mod items;
pub mod llm;
pub mod prompts;
pub mod routing;
pub mod state;
pub mod store;

pub use error::{NajuaError, Result};
pub use graph::Graph;
pub use handoff::{
    AgentName, FillerHandoff, FillerReply, FillerTarget, HandoffDecision, ReportingHandoff,
    ReportingTarget, SuggestedHandoff, WelcomeHandoff, WelcomeTarget,
};
pub use issue::{validate_drafts, DraftValidation, IssueDraft, IssueStatus, IssueType, Severity};
pub use items::{Message, Role};
pub use llm::{AgentInvoker, LlmInvoker, Provider};
pub use routing::{entry_point, route_after_agent, Node, Transition};
pub use state::ConversationState;
pub use store::{IssueFilter, IssueRepository, PgIssueStore, SavedIssue};
