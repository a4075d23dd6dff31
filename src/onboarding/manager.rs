//! OnboardingManager: runs one chat turn end to end.
//!
//! Per request: load or create the session, advance the state machine,
//! retrieve knowledge, ask the model (or skip it), fall back to a scripted
//! reply on any model failure, record the exchange, and save.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{AppConfig, DEFAULT_HISTORY_LIMIT, DEFAULT_PROMPT_HISTORY};
use crate::error::ChatError;
use crate::knowledge::KnowledgeIndex;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::session::SessionStore;

use super::model::{Slots, UserType};
use super::prompts::{I_DONT_KNOW, fallback_reply, system_prompt};
use super::services::Service;
use super::state::{ConversationState, Stage};
use super::transition::advance;

/// Inbound chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    /// Opaque client metadata, accepted and ignored.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Diagnostic fields returned when debug mode is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    pub state: Stage,
    pub user_type: Option<UserType>,
    pub goal: Option<String>,
    pub selected_service: Option<Service>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub history_length: usize,
    pub knowledge_matched: bool,
}

/// Response envelope for one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
    pub state: Stage,
    /// True once the conversation has reached the terminal stage.
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

/// Tunables the manager reads per request.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub debug_mode: bool,
    pub history_limit: usize,
    pub prompt_history: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            debug_mode: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
            prompt_history: DEFAULT_PROMPT_HISTORY,
        }
    }
}

impl From<&AppConfig> for ChatSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            debug_mode: config.debug_mode,
            history_limit: config.history_limit,
            prompt_history: config.prompt_history,
        }
    }
}

/// Everything a chat turn depends on.
#[derive(Clone)]
pub struct OnboardingDeps {
    pub knowledge: Arc<KnowledgeIndex>,
    pub sessions: Arc<dyn SessionStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub settings: ChatSettings,
}

/// Coordinates the onboarding dialogue.
pub struct OnboardingManager {
    deps: OnboardingDeps,
}

impl OnboardingManager {
    pub fn new(deps: OnboardingDeps) -> Self {
        Self { deps }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.deps.sessions
    }

    /// Handle one user message.
    ///
    /// Model failures never surface here: they are logged and replaced by
    /// the scripted reply for the stage. The only error is an empty message.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        if request.message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let span = tracing::info_span!(
            "chat",
            request_id = %Uuid::new_v4(),
            session_id = %request.session_id,
        );
        Ok(self.run_turn(request).instrument(span).await)
    }

    async fn run_turn(&self, request: ChatRequest) -> ChatResponse {
        let ChatRequest {
            session_id,
            message,
            ..
        } = request;
        let settings = &self.deps.settings;

        let mut conversation = self.deps.sessions.load_or_create(&session_id).await;
        let previous = conversation.stage;

        let transition = advance(
            conversation.stage,
            &conversation.slots,
            &message,
            conversation.history.is_empty(),
        );
        let prompt_stage = transition.prompt_stage();
        conversation.stage = transition.stage;
        conversation.slots = transition.slots;
        tracing::debug!(from = %previous, to = %conversation.stage, prompt = %prompt_stage, "Stage transition");

        let (excerpt, knowledge_matched) = self.deps.knowledge.build_context(&message);

        let reply = if conversation.stage == Stage::Done && !knowledge_matched {
            tracing::debug!("No knowledge match after onboarding; skipping model call");
            I_DONT_KNOW.to_string()
        } else {
            self.generate_reply(&conversation, prompt_stage, &message, &excerpt, knowledge_matched)
                .await
        };

        conversation.push_exchange(message, reply.clone(), settings.history_limit);
        self.deps
            .sessions
            .save(&session_id, conversation.clone())
            .await;

        if matches!(conversation.stage, Stage::Summary | Stage::Done) {
            log_summary(&conversation.slots);
        }

        let debug = settings
            .debug_mode
            .then(|| debug_info(&conversation, knowledge_matched));

        ChatResponse {
            reply,
            session_id,
            state: conversation.stage,
            finished: conversation.stage.is_terminal(),
            debug,
        }
    }

    /// Ask the model for a reply; on any failure use the scripted one.
    async fn generate_reply(
        &self,
        conversation: &ConversationState,
        prompt_stage: Stage,
        message: &str,
        excerpt: &str,
        knowledge_matched: bool,
    ) -> String {
        let slots = &conversation.slots;
        let system = system_prompt(prompt_stage, slots, excerpt, knowledge_matched);

        let mut messages: Vec<ChatMessage> = conversation
            .recent_history(self.deps.settings.prompt_history)
            .to_vec();
        messages.push(ChatMessage::user(message));

        match self
            .deps
            .llm
            .complete(CompletionRequest::new(system, messages))
            .await
        {
            Ok(response) => response.content,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    stage = %prompt_stage,
                    "LLM request failed; falling back to scripted reply"
                );
                fallback_reply(prompt_stage, slots, excerpt, knowledge_matched)
            }
        }
    }
}

fn log_summary(slots: &Slots) {
    tracing::info!(
        user_type = ?slots.user_type,
        goal = ?slots.goal,
        selected_service = ?slots.selected_service.map(|s| s.name()),
        name = ?slots.name,
        email = ?slots.email.as_ref().map(|e| e.as_str()),
        "Onboarding conversation summary"
    );
}

fn debug_info(conversation: &ConversationState, knowledge_matched: bool) -> DebugInfo {
    let slots = &conversation.slots;
    DebugInfo {
        state: conversation.stage,
        user_type: slots.user_type,
        goal: slots.goal.clone(),
        selected_service: slots.selected_service,
        name: slots.name.clone(),
        email: slots.email.as_ref().map(|e| e.to_string()),
        history_length: conversation.history.len(),
        knowledge_matched,
    }
}
