//! Orchestrator wiring.
//!
//! [`Graph`] composes the agent nodes with the routing engine and the
//! entry-point resolver and drives one user turn to completion. Each node
//! invokes its role through the [`AgentInvoker`] seam, writes the returned
//! decision into state, and appends any user-facing message to the history.
//! The detail-collection node additionally applies the merge/validate step
//! to `current_issues` and overrides the role's own next-step suggestion
//! whenever completeness validation fails.
//!
//! Self-transitions are unrepresentable in the decision contracts, so a turn
//! visits each node at most once under normal operation; a defensive hop cap
//! still bounds pathological cycles from malformed external decisions.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{NajuaError, Result};
use crate::handoff::{
    AgentName, FillerHandoff, FillerTarget, HandoffDecision, ReportingTarget, SuggestedHandoff,
};
use crate::issue::{self, IssueDraft};
use crate::llm::AgentInvoker;
use crate::routing::{entry_point, route_after_agent, Node, Transition};
use crate::state::ConversationState;
use crate::store::IssueRepository;

/// Defensive bound on node executions within one turn. Normal turns use at
/// most three hops.
const MAX_HOPS: usize = 8;

const NEED_MORE_INFO: &str = "I need a bit more information to complete your report.";

/// The orchestration graph: agent nodes plus routing edges.
pub struct Graph {
    invoker: Arc<dyn AgentInvoker>,
    repository: Option<Arc<dyn IssueRepository>>,
}

impl Graph {
    /// Builds a graph without persistence. The persistence node still runs
    /// and routes; it just skips saving.
    pub fn new(invoker: Arc<dyn AgentInvoker>) -> Self {
        Self {
            invoker,
            repository: None,
        }
    }

    /// Attaches the issue repository used by the persistence node.
    pub fn with_repository(mut self, repository: Arc<dyn IssueRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Drives one user turn: appends the user message, resolves the entry
    /// point, then executes nodes and edges until the turn ends.
    ///
    /// Adapter failure aborts the turn immediately; state keeps everything
    /// committed by nodes that already completed, plus the user message.
    pub async fn run_turn(
        &self,
        state: &mut ConversationState,
        user_text: impl Into<String>,
    ) -> Result<()> {
        state.push_user(user_text);

        let mut node = entry_point(state.handoff_decision.as_ref());
        info!(entry = %node.agent_name(), "turn started");

        for _ in 0..MAX_HOPS {
            match node {
                Node::Welcome => self.welcome_node(state).await?,
                Node::IssueFiller => self.filler_node(state).await?,
                Node::IssueReporting => self.reporting_node(state).await?,
            }

            match route_after_agent(state.handoff_decision.as_ref()) {
                Transition::To(next) => {
                    info!(from = %node.agent_name(), to = %next.agent_name(), "handoff");
                    node = next;
                }
                Transition::End => {
                    info!("turn ended");
                    return Ok(());
                }
            }
        }

        Err(NajuaError::MaxHopsExceeded { max_hops: MAX_HOPS })
    }

    /// Triage node: invoke, commit the decision, surface any message.
    async fn welcome_node(&self, state: &mut ConversationState) -> Result<()> {
        let decision = self.invoker.welcome(&state.conversation_history).await?;
        info!(target = %decision.agent.agent_name(), reasoning = %decision.reasoning, "triage decided");

        if let Some(message) = &decision.message_to_user {
            state.push_assistant(message.clone());
        }
        state.current_node = Some(AgentName::Welcome);
        state.handoff_decision = Some(HandoffDecision::Welcome(decision));
        Ok(())
    }

    /// Detail-collection node: invoke, merge the returned drafts into state,
    /// validate, and derive the handoff decision. The role's own suggestion
    /// is advisory; completeness validation is authoritative, so a
    /// save-ready suggestion over incomplete drafts is overridden to
    /// "continue collecting" with the missing fields enumerated.
    async fn filler_node(&self, state: &mut ConversationState) -> Result<()> {
        let reply = self
            .invoker
            .fill_issues(&state.conversation_history, state)
            .await?;

        let merged = match &reply.issues {
            Some(incoming) => merge_drafts(&state.current_issues, incoming),
            None => state.current_issues.clone(),
        };
        let validation = issue::validate_drafts(&merged);

        let mut suggestion = reply.suggested_handoff;
        let mut message_to_user = reply.message_to_user.clone();
        if suggestion == SuggestedHandoff::IssueReporting && !validation.all_complete {
            warn!(
                missing = ?validation.summary(),
                "save suggested over incomplete drafts, overriding to continue collecting"
            );
            suggestion = SuggestedHandoff::ContinueFilling;
            let enumeration = format!(
                "I still need the following before I can save: {}",
                validation.summary().join("; ")
            );
            message_to_user = Some(match message_to_user {
                Some(text) => format!("{text}\n\n{enumeration}"),
                None => enumeration,
            });
        }

        let decision = match suggestion {
            SuggestedHandoff::IssueReporting => {
                FillerHandoff::new(FillerTarget::IssueReporting, "all issue details collected")
                    .with_message_to_agent("All mandatory fields are filled; ready to save.")
                    .with_resume(AgentName::IssueReporting)
            }
            SuggestedHandoff::Welcome => {
                FillerHandoff::new(FillerTarget::Welcome, "user moved away from issue reporting")
                    .with_resume(AgentName::Welcome)
            }
            SuggestedHandoff::RespondToUser => FillerHandoff::new(
                FillerTarget::RespondToUser,
                "responding to the user directly",
            )
            .with_message_to_user(message_to_user.unwrap_or_else(|| NEED_MORE_INFO.to_string()))
            .with_resume(AgentName::IssueFiller),
            SuggestedHandoff::ContinueFilling => FillerHandoff::new(
                FillerTarget::RespondToUser,
                "mandatory issue details still missing",
            )
            .with_message_to_user(message_to_user.unwrap_or_else(|| NEED_MORE_INFO.to_string()))
            .with_resume(AgentName::IssueFiller),
        };

        if let Some(message) = &decision.message_to_user {
            state.push_assistant(message.clone());
        }
        state.current_issues = merged;
        state.current_node = Some(AgentName::IssueFiller);
        state.handoff_decision = Some(HandoffDecision::IssueFiller(decision));
        Ok(())
    }

    /// Persistence node: invoke, save completed drafts when the decision
    /// moves the conversation away from collection, commit the decision.
    ///
    /// Save failures are logged and the affected draft stays in state; they
    /// never abort the turn.
    async fn reporting_node(&self, state: &mut ConversationState) -> Result<()> {
        let decision = self
            .invoker
            .report_issues(&state.conversation_history, state)
            .await?;
        info!(target = %decision.agent.agent_name(), reasoning = %decision.reasoning, "persistence decided");

        let wants_more_details = decision.agent == ReportingTarget::IssueFiller;
        if !wants_more_details {
            if let Some(repository) = &self.repository {
                let mut remaining = Vec::new();
                for draft in state.current_issues.drain(..) {
                    if !draft.is_complete() {
                        remaining.push(draft);
                        continue;
                    }
                    match repository.save(&draft).await {
                        Ok(saved) => {
                            info!(issue_id = %saved.issue_id, "issue saved");
                        }
                        Err(e) => {
                            warn!(error = %e, "issue save failed, keeping draft in state");
                            remaining.push(draft);
                        }
                    }
                }
                state.current_issues = remaining;
            }
        }

        if let Some(message) = &decision.message_to_user {
            state.push_assistant(message.clone());
        }
        state.current_node = Some(AgentName::IssueReporting);
        state.handoff_decision = Some(HandoffDecision::IssueReporting(decision));
        Ok(())
    }
}

/// Merges a reply's drafts into the accumulated ones, pairwise by position.
/// Extra incoming drafts are appended; extra existing drafts are retained.
/// Timestamps default in the merged result when still unset.
fn merge_drafts(existing: &[IssueDraft], incoming: &[IssueDraft]) -> Vec<IssueDraft> {
    let mut merged: Vec<IssueDraft> = incoming
        .iter()
        .enumerate()
        .map(|(i, update)| IssueDraft::merge(existing.get(i), update))
        .collect();
    merged.extend(existing.iter().skip(incoming.len()).cloned());
    for draft in &mut merged {
        draft.default_timestamps();
    }
    merged
}
