//! Agent invocation adapter.
//!
//! [`AgentInvoker`] is the seam between the orchestration core and the
//! completion service: one decision-producing call per agent role. The core
//! never inspects how a decision was produced; it only requires that the
//! returned value satisfies the role's declared contract, which the typed
//! deserialization in [`crate::handoff`] guarantees.
//!
//! [`LlmInvoker`] is the production implementation: OpenAI-compatible chat
//! completions with structured output (a JSON-schema instruction appended to
//! the system prompt plus `json_object` response format) and a provider
//! fallback chain: each configured provider is tried once, in order, and
//! the first success wins. Retry/backoff beyond that ordering is
//! deliberately not the core's business.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{NajuaError, Result};
use crate::handoff::{FillerReply, ReportingHandoff, WelcomeHandoff};
use crate::items::{Message, Role};
use crate::prompts;
use crate::state::ConversationState;

/// OpenRouter's OpenAI-compatible endpoint.
pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// One decision-producing invocation per agent role.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Invokes the triage role over the conversation history.
    async fn welcome(&self, history: &[Message]) -> Result<WelcomeHandoff>;

    /// Invokes the detail-collection role. Returns the role's raw reply; the
    /// orchestrator derives the handoff decision from it after validation.
    async fn fill_issues(
        &self,
        history: &[Message],
        state: &ConversationState,
    ) -> Result<FillerReply>;

    /// Invokes the persistence role.
    async fn report_issues(
        &self,
        history: &[Message],
        state: &ConversationState,
    ) -> Result<ReportingHandoff>;
}

/// One OpenAI-compatible completion endpoint in the fallback chain.
pub struct Provider {
    name: String,
    client: Client<OpenAIConfig>,
    model: String,
}

impl Provider {
    pub fn new(
        name: impl Into<String>,
        client: Client<OpenAIConfig>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            model: model.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("model", &self.model)
            .finish()
    }
}

/// Production [`AgentInvoker`] backed by a chain of completion providers.
pub struct LlmInvoker {
    providers: Vec<Provider>,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for LlmInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmInvoker")
            .field("providers", &self.providers)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl LlmInvoker {
    /// Creates an invoker over the given fallback chain. Providers are tried
    /// in order for every invocation.
    pub fn new(providers: Vec<Provider>) -> Result<Self> {
        if providers.is_empty() {
            return Err(NajuaError::ConfigError(
                "no completion providers configured".to_string(),
            ));
        }
        Ok(Self {
            providers,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Builds the provider chain from the environment: `OPENAI_API_KEY`
    /// (model `NAJUA_OPENAI_MODEL`, default `gpt-4o-mini`) then
    /// `OPENROUTER_API_KEY` (model `NAJUA_OPENROUTER_MODEL`, default
    /// `openai/gpt-4o-mini`). At least one key must be set.
    pub fn from_env() -> Result<Self> {
        let mut providers = Vec::new();

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            let config = OpenAIConfig::new().with_api_key(key);
            let model = std::env::var("NAJUA_OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string());
            providers.push(Provider::new("openai", Client::with_config(config), model));
        }

        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            let config = OpenAIConfig::new()
                .with_api_key(key)
                .with_api_base(OPENROUTER_API_BASE);
            let model = std::env::var("NAJUA_OPENROUTER_MODEL")
                .unwrap_or_else(|_| "openai/gpt-4o-mini".to_string());
            providers.push(Provider::new(
                "openrouter",
                Client::with_config(config),
                model,
            ));
        }

        Self::new(providers)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Runs one structured-output completion through the fallback chain and
    /// deserializes the reply into the role's contract type.
    async fn complete_structured<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        schema: serde_json::Value,
        history: &[Message],
    ) -> Result<T> {
        let system = append_schema_instruction(system_prompt, &schema);
        let messages = build_request_messages(&system, history)?;

        let mut last_error: Option<NajuaError> = None;
        for provider in &self.providers {
            info!(
                provider = %provider.name,
                model = %provider.model,
                messages = messages.len(),
                "calling completion provider"
            );
            match self.try_provider::<T>(provider, messages.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(provider = %provider.name, error = %e, "provider failed, trying fallback");
                    last_error = Some(e);
                }
            }
        }

        Err(NajuaError::AllProvidersFailed {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no providers configured".to_string()),
        })
    }

    async fn try_provider<T: DeserializeOwned>(
        &self,
        provider: &Provider,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<T> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&provider.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .response_format(ResponseFormat::JsonObject)
            .build()?;

        let response = provider.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| NajuaError::DecisionContract {
                message: "provider returned no content".to_string(),
            })?;

        debug!(provider = %provider.name, chars = content.len(), "completion received");

        serde_json::from_str::<T>(&content).map_err(|e| NajuaError::DecisionContract {
            message: format!("failed to parse structured response: {e}"),
        })
    }
}

#[async_trait]
impl AgentInvoker for LlmInvoker {
    async fn welcome(&self, history: &[Message]) -> Result<WelcomeHandoff> {
        self.complete_structured(
            &prompts::welcome_prompt(),
            WelcomeHandoff::response_schema(),
            history,
        )
        .await
    }

    async fn fill_issues(
        &self,
        history: &[Message],
        state: &ConversationState,
    ) -> Result<FillerReply> {
        self.complete_structured(
            &prompts::issue_filler_prompt(state),
            FillerReply::response_schema(),
            history,
        )
        .await
    }

    async fn report_issues(
        &self,
        history: &[Message],
        state: &ConversationState,
    ) -> Result<ReportingHandoff> {
        self.complete_structured(
            &prompts::issue_reporting_prompt(state),
            ReportingHandoff::response_schema(),
            history,
        )
        .await
    }
}

/// Appends the role's response schema to the system prompt so providers
/// without native schema support still produce conforming JSON.
fn append_schema_instruction(system_prompt: &str, schema: &serde_json::Value) -> String {
    format!("{system_prompt}\n\nRespond in valid JSON matching this schema: {schema}")
}

/// Converts the system prompt plus stored history into request messages.
fn build_request_messages(
    system_prompt: &str,
    history: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> =
        Vec::with_capacity(history.len() + 1);
    messages.push(
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()?
            .into(),
    );
    for msg in history {
        let converted = match msg.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
        };
        messages.push(converted);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_instruction_is_appended() {
        let schema = serde_json::json!({"type": "object"});
        let out = append_schema_instruction("You are a triage agent.", &schema);
        assert!(out.starts_with("You are a triage agent."));
        assert!(out.contains("Respond in valid JSON matching this schema:"));
        assert!(out.contains("\"object\""));
    }

    #[test]
    fn test_build_request_messages_prepends_system() {
        let history = vec![
            Message::user("hello"),
            Message::assistant("Karibu!"),
            Message::user("I want to report a pothole"),
        ];
        let messages = build_request_messages("system prompt", &history).unwrap();
        assert_eq!(messages.len(), 4);
        assert!(matches!(
            messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(
            messages[2],
            ChatCompletionRequestMessage::Assistant(_)
        ));
    }

    #[test]
    fn test_invoker_requires_a_provider() {
        let err = LlmInvoker::new(Vec::new()).unwrap_err();
        assert!(matches!(err, NajuaError::ConfigError(_)));
    }

    #[test]
    fn test_invoker_debug_hides_credentials() {
        let invoker = LlmInvoker::new(vec![Provider::new(
            "openai",
            Client::new(),
            "gpt-4o-mini",
        )])
        .unwrap();
        let debug = format!("{invoker:?}");
        assert!(debug.contains("LlmInvoker"));
        assert!(debug.contains("gpt-4o-mini"));
        assert!(!debug.contains("api_key"));
    }

    #[test]
    fn test_provider_debug_hides_client() {
        let provider = Provider::new("openai", Client::new(), "gpt-4o-mini");
        let debug = format!("{provider:?}");
        assert!(debug.contains("openai"));
        assert!(debug.contains("gpt-4o-mini"));
        assert!(!debug.contains("api_key"));
    }
}
