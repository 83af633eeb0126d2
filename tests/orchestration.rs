//! End-to-end turns over the orchestration graph with a scripted agent
//! invoker and an in-memory issue repository.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;

use najua::store::generate_issue_id;
use najua::{
    AgentInvoker, AgentName, ConversationState, FillerReply, Graph, HandoffDecision, IssueDraft,
    IssueFilter, IssueRepository, IssueStatus, IssueType, Message, NajuaError, ReportingHandoff,
    ReportingTarget, Result, SavedIssue, Severity, SuggestedHandoff, WelcomeHandoff,
    WelcomeTarget,
};

/// Plays back queued responses, one per invocation, and counts calls.
#[derive(Default)]
struct ScriptedInvoker {
    welcome_script: Mutex<VecDeque<WelcomeHandoff>>,
    filler_script: Mutex<VecDeque<FillerReply>>,
    reporting_script: Mutex<VecDeque<ReportingHandoff>>,
    welcome_calls: AtomicUsize,
    filler_calls: AtomicUsize,
    reporting_calls: AtomicUsize,
    fail_welcome: AtomicBool,
}

impl ScriptedInvoker {
    fn new() -> Self {
        Self::default()
    }

    fn push_welcome(&self, decision: WelcomeHandoff) {
        self.welcome_script.lock().unwrap().push_back(decision);
    }

    fn push_filler(&self, reply: FillerReply) {
        self.filler_script.lock().unwrap().push_back(reply);
    }

    fn push_reporting(&self, decision: ReportingHandoff) {
        self.reporting_script.lock().unwrap().push_back(decision);
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn welcome(&self, _history: &[Message]) -> Result<WelcomeHandoff> {
        self.welcome_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_welcome.load(Ordering::SeqCst) {
            return Err(NajuaError::AllProvidersFailed {
                message: "simulated provider outage".to_string(),
            });
        }
        self.welcome_script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| NajuaError::DecisionContract {
                message: "welcome script exhausted".to_string(),
            })
    }

    async fn fill_issues(
        &self,
        _history: &[Message],
        _state: &ConversationState,
    ) -> Result<FillerReply> {
        self.filler_calls.fetch_add(1, Ordering::SeqCst);
        self.filler_script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| NajuaError::DecisionContract {
                message: "filler script exhausted".to_string(),
            })
    }

    async fn report_issues(
        &self,
        _history: &[Message],
        _state: &ConversationState,
    ) -> Result<ReportingHandoff> {
        self.reporting_calls.fetch_add(1, Ordering::SeqCst);
        self.reporting_script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| NajuaError::DecisionContract {
                message: "reporting script exhausted".to_string(),
            })
    }
}

/// In-memory issue repository with injectable save failure.
#[derive(Default)]
struct MemoryRepo {
    issues: Mutex<Vec<SavedIssue>>,
    fail_saves: AtomicBool,
}

#[async_trait]
impl IssueRepository for MemoryRepo {
    async fn save(&self, draft: &IssueDraft) -> Result<SavedIssue> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(NajuaError::ConfigError(
                "simulated storage failure".to_string(),
            ));
        }
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(NajuaError::IncompleteIssue {
                fields: missing.join(", "),
            });
        }
        let saved = SavedIssue {
            issue_id: generate_issue_id(),
            issue_status: IssueStatus::Saved,
            issue_type: draft.issue_type.ok_or_else(|| NajuaError::IncompleteIssue {
                fields: "issue_type".to_string(),
            })?,
            issue_description: draft.issue_description.clone().unwrap_or_default(),
            issue_location: draft.issue_location.clone().unwrap_or_default(),
            issue_date: draft.issue_date.clone(),
            issue_time: draft.issue_time.clone(),
            issue_severity: draft.issue_severity,
            created_at: Utc::now(),
        };
        self.issues.lock().unwrap().push(saved.clone());
        Ok(saved)
    }

    async fn update_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
    ) -> Result<Option<SavedIssue>> {
        let mut issues = self.issues.lock().unwrap();
        for issue in issues.iter_mut() {
            if issue.issue_id == issue_id {
                issue.issue_status = status;
                return Ok(Some(issue.clone()));
            }
        }
        Ok(None)
    }

    async fn get(&self, issue_id: &str) -> Result<Option<SavedIssue>> {
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.issue_id == issue_id)
            .cloned())
    }

    async fn list(&self, filter: IssueFilter) -> Result<Vec<SavedIssue>> {
        let issues = self.issues.lock().unwrap();
        Ok(issues
            .iter()
            .filter(|i| filter.status.map_or(true, |s| i.issue_status == s))
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }
}

fn complete_draft() -> IssueDraft {
    IssueDraft {
        issue_type: Some(IssueType::Infrastructure),
        issue_description: Some("deep pothole damaging vehicles".to_string()),
        issue_location: Some("Moi Avenue, near the roundabout".to_string()),
        issue_severity: Some(Severity::High),
        ..Default::default()
    }
}

#[tokio::test]
async fn chitchat_turn_ends_at_welcome() {
    let invoker = Arc::new(ScriptedInvoker::new());
    invoker.push_welcome(
        WelcomeHandoff::new(WelcomeTarget::RespondToUser, "greeting only")
            .with_message_to_user("Karibu! How can I help you today?"),
    );

    let graph = Graph::new(invoker.clone());
    let mut state = ConversationState::new();
    graph.run_turn(&mut state, "hello").await.unwrap();

    assert_eq!(
        state.last_assistant_message(),
        Some("Karibu! How can I help you today?")
    );
    assert_eq!(state.current_node, Some(AgentName::Welcome));
    assert_eq!(invoker.welcome_calls.load(Ordering::SeqCst), 1);
    assert_eq!(invoker.filler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn collection_parks_on_filler_and_resumes_without_retriage() {
    let invoker = Arc::new(ScriptedInvoker::new());
    // Turn 1: triage hands off to collection; collection needs the location.
    invoker.push_welcome(WelcomeHandoff::new(
        WelcomeTarget::IssueFiller,
        "user reported an issue",
    ));
    invoker.push_filler(FillerReply {
        message_to_user: Some("Where exactly is the pothole?".to_string()),
        issues: Some(vec![IssueDraft {
            issue_type: Some(IssueType::Infrastructure),
            issue_description: Some("deep pothole damaging vehicles".to_string()),
            ..Default::default()
        }]),
        suggested_handoff: SuggestedHandoff::ContinueFilling,
    });
    // Turn 2: collection completes and hands off; persistence confirms.
    invoker.push_filler(FillerReply {
        message_to_user: None,
        issues: Some(vec![IssueDraft {
            issue_location: Some("Moi Avenue, near the roundabout".to_string()),
            ..Default::default()
        }]),
        suggested_handoff: SuggestedHandoff::IssueReporting,
    });
    invoker.push_reporting(
        ReportingHandoff::new(ReportingTarget::RespondToUser, "issue saved")
            .with_message_to_user("Your issue has been saved. Asante!"),
    );

    let repo = Arc::new(MemoryRepo::default());
    let graph = Graph::new(invoker.clone()).with_repository(repo.clone());
    let mut state = ConversationState::new();

    graph
        .run_turn(&mut state, "There is a deep pothole damaging vehicles")
        .await
        .unwrap();
    assert_eq!(
        state.last_assistant_message(),
        Some("Where exactly is the pothole?")
    );
    assert_eq!(state.current_issues.len(), 1);
    assert!(!state.current_issues[0].is_complete());
    // Parked on the collection role.
    assert_eq!(
        state.handoff_decision.as_ref().unwrap().resume_agent(),
        AgentName::IssueFiller
    );

    graph
        .run_turn(&mut state, "Moi Avenue, near the roundabout")
        .await
        .unwrap();

    // No re-triage on resume.
    assert_eq!(invoker.welcome_calls.load(Ordering::SeqCst), 1);
    assert_eq!(invoker.filler_calls.load(Ordering::SeqCst), 2);
    assert_eq!(invoker.reporting_calls.load(Ordering::SeqCst), 1);

    // The completed draft was saved and removed from state.
    let saved = repo.list(IssueFilter::default()).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].issue_type, IssueType::Infrastructure);
    assert_eq!(saved[0].issue_location, "Moi Avenue, near the roundabout");
    assert_eq!(saved[0].issue_status, IssueStatus::Saved);
    assert!(state.current_issues.is_empty());
    assert_eq!(
        state.last_assistant_message(),
        Some("Your issue has been saved. Asante!")
    );
}

#[tokio::test]
async fn premature_save_suggestion_is_overridden() {
    let invoker = Arc::new(ScriptedInvoker::new());
    invoker.push_welcome(WelcomeHandoff::new(
        WelcomeTarget::IssueFiller,
        "user reported an issue",
    ));
    // The role suggests saving even though the location is missing.
    invoker.push_filler(FillerReply {
        message_to_user: Some("I have everything I need.".to_string()),
        issues: Some(vec![IssueDraft {
            issue_type: Some(IssueType::Health),
            issue_description: Some("clinic has no medicine".to_string()),
            ..Default::default()
        }]),
        suggested_handoff: SuggestedHandoff::IssueReporting,
    });

    let graph = Graph::new(invoker.clone());
    let mut state = ConversationState::new();
    graph
        .run_turn(&mut state, "The clinic has no medicine")
        .await
        .unwrap();

    // Persistence never ran; the turn ended asking for the missing field.
    assert_eq!(invoker.reporting_calls.load(Ordering::SeqCst), 0);
    let decision = state.handoff_decision.as_ref().unwrap();
    assert_eq!(decision.next_agent(), AgentName::RespondToUser);
    assert_eq!(decision.resume_agent(), AgentName::IssueFiller);
    let message = state.last_assistant_message().unwrap();
    assert!(message.contains("issue_location"));
    assert_eq!(state.current_issues.len(), 1);
}

#[tokio::test]
async fn failed_save_keeps_draft_in_state() {
    let invoker = Arc::new(ScriptedInvoker::new());
    invoker.push_welcome(WelcomeHandoff::new(
        WelcomeTarget::IssueReporting,
        "details already collected",
    ));
    invoker.push_reporting(
        ReportingHandoff::new(ReportingTarget::RespondToUser, "confirming save")
            .with_message_to_user("Saving your issue now."),
    );

    let repo = Arc::new(MemoryRepo::default());
    repo.fail_saves.store(true, Ordering::SeqCst);

    let graph = Graph::new(invoker).with_repository(repo.clone());
    let mut state = ConversationState::new();
    state.current_issues.push(complete_draft());

    // The save failure is logged, not raised.
    graph.run_turn(&mut state, "please save it").await.unwrap();

    assert_eq!(state.current_issues.len(), 1);
    assert!(repo.list(IssueFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn reporting_handback_to_filler_skips_saving() {
    let invoker = Arc::new(ScriptedInvoker::new());
    invoker.push_welcome(WelcomeHandoff::new(
        WelcomeTarget::IssueReporting,
        "user asked to save",
    ));
    invoker.push_reporting(
        ReportingHandoff::new(ReportingTarget::IssueFiller, "description too vague")
            .with_message_to_agent("Ask for a clearer description."),
    );
    invoker.push_filler(FillerReply {
        message_to_user: Some("Could you describe the issue in more detail?".to_string()),
        issues: None,
        suggested_handoff: SuggestedHandoff::ContinueFilling,
    });

    let repo = Arc::new(MemoryRepo::default());
    let graph = Graph::new(invoker.clone()).with_repository(repo.clone());
    let mut state = ConversationState::new();
    state.current_issues.push(complete_draft());

    graph.run_turn(&mut state, "save my issue").await.unwrap();

    // Handing back to collection must not consume the drafts.
    assert!(repo.list(IssueFilter::default()).await.unwrap().is_empty());
    assert_eq!(state.current_issues.len(), 1);
    assert_eq!(invoker.filler_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        state.last_assistant_message(),
        Some("Could you describe the issue in more detail?")
    );
}

#[tokio::test]
async fn adapter_failure_aborts_turn_without_decision() {
    let invoker = Arc::new(ScriptedInvoker::new());
    invoker.fail_welcome.store(true, Ordering::SeqCst);

    let graph = Graph::new(invoker);
    let mut state = ConversationState::new();
    let err = graph.run_turn(&mut state, "hello").await.unwrap_err();

    assert!(matches!(err, NajuaError::AllProvidersFailed { .. }));
    // The user message is committed; nothing else is.
    assert_eq!(state.conversation_history.len(), 1);
    assert!(state.handoff_decision.is_none());
    assert!(state.current_node.is_none());
}

#[tokio::test]
async fn pathological_ping_pong_hits_the_hop_cap() {
    /// Always bounces welcome -> filler -> welcome -> ...
    struct PingPong;

    #[async_trait]
    impl AgentInvoker for PingPong {
        async fn welcome(&self, _history: &[Message]) -> Result<WelcomeHandoff> {
            Ok(WelcomeHandoff::new(WelcomeTarget::IssueFiller, "bounce"))
        }

        async fn fill_issues(
            &self,
            _history: &[Message],
            _state: &ConversationState,
        ) -> Result<FillerReply> {
            Ok(FillerReply {
                message_to_user: None,
                issues: None,
                suggested_handoff: SuggestedHandoff::Welcome,
            })
        }

        async fn report_issues(
            &self,
            _history: &[Message],
            _state: &ConversationState,
        ) -> Result<ReportingHandoff> {
            Ok(ReportingHandoff::new(ReportingTarget::Welcome, "bounce"))
        }
    }

    let graph = Graph::new(Arc::new(PingPong));
    let mut state = ConversationState::new();
    let err = graph.run_turn(&mut state, "loop forever").await.unwrap_err();
    assert!(matches!(err, NajuaError::MaxHopsExceeded { .. }));
}

#[tokio::test]
async fn message_to_user_never_leaks_on_non_terminal_decisions() {
    let invoker = Arc::new(ScriptedInvoker::new());
    // Normalization cleared this message at construction time.
    invoker.push_welcome(
        WelcomeHandoff::new(WelcomeTarget::IssueFiller, "issue detected")
            .with_message_to_user("must not appear in history"),
    );
    invoker.push_filler(FillerReply {
        message_to_user: Some("What type of issue is it?".to_string()),
        issues: Some(vec![IssueDraft::default()]),
        suggested_handoff: SuggestedHandoff::ContinueFilling,
    });

    let graph = Graph::new(invoker);
    let mut state = ConversationState::new();
    graph.run_turn(&mut state, "something is wrong").await.unwrap();

    let history: Vec<&str> = state
        .conversation_history
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert!(!history.contains(&"must not appear in history"));
    assert_eq!(
        state.last_assistant_message(),
        Some("What type of issue is it?")
    );
}

#[tokio::test]
async fn decision_survives_state_serialization_between_turns() {
    let invoker = Arc::new(ScriptedInvoker::new());
    invoker.push_welcome(WelcomeHandoff::new(
        WelcomeTarget::IssueFiller,
        "user reported an issue",
    ));
    invoker.push_filler(FillerReply {
        message_to_user: Some("Where is it?".to_string()),
        issues: Some(vec![IssueDraft {
            issue_description: Some("broken street light".to_string()),
            ..Default::default()
        }]),
        suggested_handoff: SuggestedHandoff::ContinueFilling,
    });
    invoker.push_filler(FillerReply {
        message_to_user: Some("Noted, what type of issue is it?".to_string()),
        issues: Some(vec![IssueDraft {
            issue_location: Some("Tom Mboya Street".to_string()),
            ..Default::default()
        }]),
        suggested_handoff: SuggestedHandoff::ContinueFilling,
    });

    let graph = Graph::new(invoker.clone());
    let mut state = ConversationState::new();
    graph
        .run_turn(&mut state, "the street light is broken")
        .await
        .unwrap();

    // Simulate external persistence between turns.
    let json = serde_json::to_string(&state).unwrap();
    let mut reloaded: ConversationState = serde_json::from_str(&json).unwrap();

    graph
        .run_turn(&mut reloaded, "Tom Mboya Street")
        .await
        .unwrap();

    // Entry point resolution still honored the parked decision.
    assert_eq!(invoker.welcome_calls.load(Ordering::SeqCst), 1);
    assert_eq!(reloaded.current_issues.len(), 1);
    assert_eq!(
        reloaded.current_issues[0].issue_location.as_deref(),
        Some("Tom Mboya Street")
    );
    assert_eq!(
        reloaded.current_issues[0].issue_description.as_deref(),
        Some("broken street light")
    );
    assert!(matches!(
        reloaded.handoff_decision,
        Some(HandoffDecision::IssueFiller(_))
    ));
}
