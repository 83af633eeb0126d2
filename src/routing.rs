//! Routing engine and entry-point resolver.
//!
//! A small explicit state machine replaces a generic graph-execution engine:
//! [`route_after_agent`] maps the most recent handoff decision to the next
//! node or the end of the turn, and [`entry_point`] decides which node a new
//! user turn starts from. Both are pure functions over the decision; neither
//! ever raises. Self-transitions are impossible upstream: each producing
//! role's decision type has a closed target enumeration without its own name,
//! so a turn visits each node at most once under normal operation.

use tracing::{info, warn};

use crate::handoff::{AgentName, HandoffDecision};

/// The agent nodes wired into the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Welcome,
    IssueFiller,
    IssueReporting,
}

impl Node {
    pub fn agent_name(self) -> AgentName {
        match self {
            Node::Welcome => AgentName::Welcome,
            Node::IssueFiller => AgentName::IssueFiller,
            Node::IssueReporting => AgentName::IssueReporting,
        }
    }
}

/// Outcome of one routing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Execute another node within the same turn.
    To(Node),
    /// Stop the turn; the next user message restarts via [`entry_point`].
    End,
}

/// Maps the most recent handoff decision to the next node.
///
/// The respond-to-user terminal ends the turn. A decision naming a role that
/// is not wired into the orchestrator ends the turn with a diagnostic rather
/// than crashing the conversation. A missing decision ends the turn likewise.
pub fn route_after_agent(decision: Option<&HandoffDecision>) -> Transition {
    let Some(decision) = decision else {
        warn!("no handoff decision in state, ending turn");
        return Transition::End;
    };

    match decision.next_agent() {
        AgentName::Welcome => Transition::To(Node::Welcome),
        AgentName::IssueFiller => Transition::To(Node::IssueFiller),
        AgentName::IssueReporting => Transition::To(Node::IssueReporting),
        AgentName::RespondToUser => Transition::End,
        AgentName::IssueEnquiry => {
            warn!(
                agent = %AgentName::IssueEnquiry,
                "decision routes to a role that is not wired, ending turn"
            );
            Transition::End
        }
    }
}

/// Resolves the node a new user turn starts from.
///
/// With no prior decision the conversation starts at triage. Otherwise the
/// prior decision's `agent_after_human_response` is used when it names a
/// startable node; anything else falls back to triage with a diagnostic.
/// This lets a collection workflow park on a specific agent across a user
/// reply instead of re-triaging from scratch.
pub fn entry_point(decision: Option<&HandoffDecision>) -> Node {
    let Some(decision) = decision else {
        info!("no previous handoff, starting at welcome_agent");
        return Node::Welcome;
    };

    let resume = decision.resume_agent();
    match resume {
        AgentName::Welcome => Node::Welcome,
        AgentName::IssueFiller => Node::IssueFiller,
        AgentName::IssueReporting => Node::IssueReporting,
        AgentName::IssueEnquiry | AgentName::RespondToUser => {
            warn!(agent = %resume, "invalid entry agent, defaulting to welcome_agent");
            Node::Welcome
        }
    }
}
