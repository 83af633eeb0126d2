//! Handoff decision contracts.
//!
//! Each producing agent role declares its own decision type with a closed
//! enumeration of legal `agent` targets, so "cannot hand off to self" is a
//! type-level property rather than a runtime check: the triage role's target
//! enum simply has no triage variant, and so on.
//!
//! All decision types share one shape (next agent, reasoning, optional
//! message to the next agent, optional message to the user, and the agent
//! that should resume once the user replies) and one invariant:
//! `message_to_user` is only meaningful when the decision routes to the
//! respond-to-user terminal. The invariant is enforced by a silent
//! post-construction normalization (the field is cleared, not rejected),
//! applied both by the builders here and on deserialization, so downstream
//! code can assume it holds unconditionally.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::issue::IssueDraft;

/// Every agent role in the workflow, wired or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AgentName {
    /// Triage: the conversation entry point.
    #[serde(rename = "welcome_agent")]
    Welcome,
    /// Detail collection: fills issue records field by field.
    #[serde(rename = "issue_filler_agent")]
    IssueFiller,
    /// Persistence: reviews completed records and saves them.
    #[serde(rename = "issue_reporting_agent")]
    IssueReporting,
    /// Status enquiries about reported issues. Declared but not wired yet.
    #[serde(rename = "issue_enquiry_agent")]
    IssueEnquiry,
    /// Terminal: surface text to the user and wait for their reply.
    #[serde(rename = "respond_to_user_agent")]
    RespondToUser,
}

impl AgentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Welcome => "welcome_agent",
            AgentName::IssueFiller => "issue_filler_agent",
            AgentName::IssueReporting => "issue_reporting_agent",
            AgentName::IssueEnquiry => "issue_enquiry_agent",
            AgentName::RespondToUser => "respond_to_user_agent",
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal handoff targets for the triage role. No `welcome_agent` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum WelcomeTarget {
    #[serde(rename = "issue_filler_agent")]
    IssueFiller,
    #[serde(rename = "issue_reporting_agent")]
    IssueReporting,
    #[serde(rename = "respond_to_user_agent")]
    RespondToUser,
}

impl WelcomeTarget {
    pub fn agent_name(self) -> AgentName {
        match self {
            WelcomeTarget::IssueFiller => AgentName::IssueFiller,
            WelcomeTarget::IssueReporting => AgentName::IssueReporting,
            WelcomeTarget::RespondToUser => AgentName::RespondToUser,
        }
    }
}

/// Legal handoff targets for the detail-collection role. No
/// `issue_filler_agent` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FillerTarget {
    #[serde(rename = "issue_reporting_agent")]
    IssueReporting,
    #[serde(rename = "welcome_agent")]
    Welcome,
    #[serde(rename = "respond_to_user_agent")]
    RespondToUser,
}

impl FillerTarget {
    pub fn agent_name(self) -> AgentName {
        match self {
            FillerTarget::IssueReporting => AgentName::IssueReporting,
            FillerTarget::Welcome => AgentName::Welcome,
            FillerTarget::RespondToUser => AgentName::RespondToUser,
        }
    }
}

/// Legal handoff targets for the persistence role. No
/// `issue_reporting_agent` variant; may hand back to the collection role
/// when details are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ReportingTarget {
    #[serde(rename = "issue_filler_agent")]
    IssueFiller,
    #[serde(rename = "issue_enquiry_agent")]
    IssueEnquiry,
    #[serde(rename = "welcome_agent")]
    Welcome,
    #[serde(rename = "respond_to_user_agent")]
    RespondToUser,
}

impl ReportingTarget {
    pub fn agent_name(self) -> AgentName {
        match self {
            ReportingTarget::IssueFiller => AgentName::IssueFiller,
            ReportingTarget::IssueEnquiry => AgentName::IssueEnquiry,
            ReportingTarget::Welcome => AgentName::Welcome,
            ReportingTarget::RespondToUser => AgentName::RespondToUser,
        }
    }
}

/// Decision produced by the triage role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WelcomeHandoffWire")]
pub struct WelcomeHandoff {
    /// The next agent. The triage role itself is not a legal value.
    pub agent: WelcomeTarget,
    /// Free-text justification. Diagnostic only, never parsed.
    pub reasoning: String,
    /// Optional context for the next agent.
    pub message_to_agent: Option<String>,
    /// Text to surface to the user. Present only when `agent` is the
    /// respond-to-user terminal; cleared otherwise.
    pub message_to_user: Option<String>,
    /// The agent that resumes once the user replies. Defaults to triage.
    pub agent_after_human_response: AgentName,
}

#[derive(Deserialize, JsonSchema)]
struct WelcomeHandoffWire {
    agent: WelcomeTarget,
    reasoning: String,
    #[serde(default)]
    message_to_agent: Option<String>,
    #[serde(default)]
    message_to_user: Option<String>,
    #[serde(default = "resume_welcome")]
    agent_after_human_response: AgentName,
}

fn resume_welcome() -> AgentName {
    AgentName::Welcome
}

impl From<WelcomeHandoffWire> for WelcomeHandoff {
    fn from(wire: WelcomeHandoffWire) -> Self {
        let mut decision = WelcomeHandoff {
            agent: wire.agent,
            reasoning: wire.reasoning,
            message_to_agent: wire.message_to_agent,
            message_to_user: wire.message_to_user,
            agent_after_human_response: wire.agent_after_human_response,
        };
        decision.normalize();
        decision
    }
}

impl WelcomeHandoff {
    /// Creates a decision with no messages and the triage resume default.
    pub fn new(agent: WelcomeTarget, reasoning: impl Into<String>) -> Self {
        Self {
            agent,
            reasoning: reasoning.into(),
            message_to_agent: None,
            message_to_user: None,
            agent_after_human_response: AgentName::Welcome,
        }
    }

    /// Sets the user-facing message, subject to normalization.
    pub fn with_message_to_user(mut self, message: impl Into<String>) -> Self {
        self.message_to_user = Some(message.into());
        self.normalize();
        self
    }

    /// Sets the context passed to the next agent.
    pub fn with_message_to_agent(mut self, message: impl Into<String>) -> Self {
        self.message_to_agent = Some(message.into());
        self
    }

    /// Sets the agent that resumes after the user replies.
    pub fn with_resume(mut self, agent: AgentName) -> Self {
        self.agent_after_human_response = agent;
        self
    }

    /// Clears `message_to_user` unless the decision routes to the terminal.
    /// Silent: downstream code assumes the invariant after construction.
    fn normalize(&mut self) {
        if self.agent != WelcomeTarget::RespondToUser {
            self.message_to_user = None;
        }
    }

    /// JSON schema of the wire shape, for prompt embedding.
    pub fn response_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(WelcomeHandoffWire))
            .expect("decision schema serializes")
    }
}

/// Decision produced by the detail-collection role. Built programmatically
/// by the orchestrator from the role's raw [`FillerReply`] after
/// completeness validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FillerHandoffWire")]
pub struct FillerHandoff {
    /// The next agent. The collection role itself is not a legal value.
    pub agent: FillerTarget,
    /// Free-text justification. Diagnostic only, never parsed.
    pub reasoning: String,
    /// Optional context for the next agent.
    pub message_to_agent: Option<String>,
    /// Text to surface to the user. Present only when `agent` is the
    /// respond-to-user terminal; cleared otherwise.
    pub message_to_user: Option<String>,
    /// The agent that resumes once the user replies. Defaults to the
    /// collection role so a parked workflow continues collecting.
    pub agent_after_human_response: AgentName,
}

#[derive(Deserialize, JsonSchema)]
struct FillerHandoffWire {
    agent: FillerTarget,
    reasoning: String,
    #[serde(default)]
    message_to_agent: Option<String>,
    #[serde(default)]
    message_to_user: Option<String>,
    #[serde(default = "resume_filler")]
    agent_after_human_response: AgentName,
}

fn resume_filler() -> AgentName {
    AgentName::IssueFiller
}

impl From<FillerHandoffWire> for FillerHandoff {
    fn from(wire: FillerHandoffWire) -> Self {
        let mut decision = FillerHandoff {
            agent: wire.agent,
            reasoning: wire.reasoning,
            message_to_agent: wire.message_to_agent,
            message_to_user: wire.message_to_user,
            agent_after_human_response: wire.agent_after_human_response,
        };
        decision.normalize();
        decision
    }
}

impl FillerHandoff {
    /// Creates a decision with no messages and the collection resume default.
    pub fn new(agent: FillerTarget, reasoning: impl Into<String>) -> Self {
        Self {
            agent,
            reasoning: reasoning.into(),
            message_to_agent: None,
            message_to_user: None,
            agent_after_human_response: AgentName::IssueFiller,
        }
    }

    /// Sets the user-facing message, subject to normalization.
    pub fn with_message_to_user(mut self, message: impl Into<String>) -> Self {
        self.message_to_user = Some(message.into());
        self.normalize();
        self
    }

    /// Sets the context passed to the next agent.
    pub fn with_message_to_agent(mut self, message: impl Into<String>) -> Self {
        self.message_to_agent = Some(message.into());
        self
    }

    /// Sets the agent that resumes after the user replies.
    pub fn with_resume(mut self, agent: AgentName) -> Self {
        self.agent_after_human_response = agent;
        self
    }

    fn normalize(&mut self) {
        if self.agent != FillerTarget::RespondToUser {
            self.message_to_user = None;
        }
    }

    /// JSON schema of the wire shape, for prompt embedding.
    pub fn response_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(FillerHandoffWire))
            .expect("decision schema serializes")
    }
}

/// Decision produced by the persistence role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReportingHandoffWire")]
pub struct ReportingHandoff {
    /// The next agent. The persistence role itself is not a legal value.
    pub agent: ReportingTarget,
    /// Free-text justification. Diagnostic only, never parsed.
    pub reasoning: String,
    /// Optional context for the next agent.
    pub message_to_agent: Option<String>,
    /// Text to surface to the user. Present only when `agent` is the
    /// respond-to-user terminal; cleared otherwise.
    pub message_to_user: Option<String>,
    /// The agent that resumes once the user replies. Defaults to triage.
    pub agent_after_human_response: AgentName,
}

#[derive(Deserialize, JsonSchema)]
struct ReportingHandoffWire {
    agent: ReportingTarget,
    reasoning: String,
    #[serde(default)]
    message_to_agent: Option<String>,
    #[serde(default)]
    message_to_user: Option<String>,
    #[serde(default = "resume_welcome")]
    agent_after_human_response: AgentName,
}

impl From<ReportingHandoffWire> for ReportingHandoff {
    fn from(wire: ReportingHandoffWire) -> Self {
        let mut decision = ReportingHandoff {
            agent: wire.agent,
            reasoning: wire.reasoning,
            message_to_agent: wire.message_to_agent,
            message_to_user: wire.message_to_user,
            agent_after_human_response: wire.agent_after_human_response,
        };
        decision.normalize();
        decision
    }
}

impl ReportingHandoff {
    /// Creates a decision with no messages and the triage resume default.
    pub fn new(agent: ReportingTarget, reasoning: impl Into<String>) -> Self {
        Self {
            agent,
            reasoning: reasoning.into(),
            message_to_agent: None,
            message_to_user: None,
            agent_after_human_response: AgentName::Welcome,
        }
    }

    /// Sets the user-facing message, subject to normalization.
    pub fn with_message_to_user(mut self, message: impl Into<String>) -> Self {
        self.message_to_user = Some(message.into());
        self.normalize();
        self
    }

    /// Sets the context passed to the next agent.
    pub fn with_message_to_agent(mut self, message: impl Into<String>) -> Self {
        self.message_to_agent = Some(message.into());
        self
    }

    /// Sets the agent that resumes after the user replies.
    pub fn with_resume(mut self, agent: AgentName) -> Self {
        self.agent_after_human_response = agent;
        self
    }

    fn normalize(&mut self) {
        if self.agent != ReportingTarget::RespondToUser {
            self.message_to_user = None;
        }
    }

    /// JSON schema of the wire shape, for prompt embedding.
    pub fn response_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(ReportingHandoffWire))
            .expect("decision schema serializes")
    }
}

/// The detail-collection role's next-step suggestion. Advisory only: the
/// orchestrator's completeness validation is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SuggestedHandoff {
    #[default]
    #[serde(rename = "continue_filling")]
    ContinueFilling,
    #[serde(rename = "issue_reporting_agent")]
    IssueReporting,
    #[serde(rename = "welcome_agent")]
    Welcome,
    #[serde(rename = "respond_to_user_agent")]
    RespondToUser,
}

/// Raw structured output of one detail-collection invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FillerReply {
    /// Text to surface to the user, usually a question about missing fields.
    #[serde(default)]
    pub message_to_user: Option<String>,
    /// The drafts as the role currently sees them, carrying everything
    /// gathered so far.
    #[serde(default)]
    pub issues: Option<Vec<IssueDraft>>,
    /// The role's own next-step suggestion.
    #[serde(default)]
    pub suggested_handoff: SuggestedHandoff,
}

impl FillerReply {
    /// JSON schema of the reply shape, for prompt embedding.
    pub fn response_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(FillerReply))
            .expect("reply schema serializes")
    }
}

/// The most recent handoff decision, polymorphic over the producing role.
/// Authoritative for routing; `current_node` is diagnostic only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "produced_by")]
pub enum HandoffDecision {
    #[serde(rename = "welcome_agent")]
    Welcome(WelcomeHandoff),
    #[serde(rename = "issue_filler_agent")]
    IssueFiller(FillerHandoff),
    #[serde(rename = "issue_reporting_agent")]
    IssueReporting(ReportingHandoff),
}

impl HandoffDecision {
    /// The role that produced this decision.
    pub fn produced_by(&self) -> AgentName {
        match self {
            HandoffDecision::Welcome(_) => AgentName::Welcome,
            HandoffDecision::IssueFiller(_) => AgentName::IssueFiller,
            HandoffDecision::IssueReporting(_) => AgentName::IssueReporting,
        }
    }

    /// The next agent this decision routes to.
    pub fn next_agent(&self) -> AgentName {
        match self {
            HandoffDecision::Welcome(d) => d.agent.agent_name(),
            HandoffDecision::IssueFiller(d) => d.agent.agent_name(),
            HandoffDecision::IssueReporting(d) => d.agent.agent_name(),
        }
    }

    /// The agent that should resume once the user replies.
    pub fn resume_agent(&self) -> AgentName {
        match self {
            HandoffDecision::Welcome(d) => d.agent_after_human_response,
            HandoffDecision::IssueFiller(d) => d.agent_after_human_response,
            HandoffDecision::IssueReporting(d) => d.agent_after_human_response,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            HandoffDecision::Welcome(d) => &d.reasoning,
            HandoffDecision::IssueFiller(d) => &d.reasoning,
            HandoffDecision::IssueReporting(d) => &d.reasoning,
        }
    }

    pub fn message_to_user(&self) -> Option<&str> {
        match self {
            HandoffDecision::Welcome(d) => d.message_to_user.as_deref(),
            HandoffDecision::IssueFiller(d) => d.message_to_user.as_deref(),
            HandoffDecision::IssueReporting(d) => d.message_to_user.as_deref(),
        }
    }

    pub fn message_to_agent(&self) -> Option<&str> {
        match self {
            HandoffDecision::Welcome(d) => d.message_to_agent.as_deref(),
            HandoffDecision::IssueFiller(d) => d.message_to_agent.as_deref(),
            HandoffDecision::IssueReporting(d) => d.message_to_agent.as_deref(),
        }
    }
}
