use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use psyche_persona::EmotionMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use uuid::Uuid;

use crate::{error::DialogueError, memory::EnhancedConversationContext};

/// Header carrying the API key next to the bearer token.
pub const API_KEY_HEADER: &str = "x-api-key";

/// One prior exchange forwarded to the dialogue API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    /// What the player said.
    pub prompt: String,
    /// What the character answered.
    pub response: String,
}

/// Character state forwarded with a prompt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DialogueOptions {
    /// Player identifier.
    pub player_id: String,
    /// Character display name.
    pub player_name: String,
    /// Current emotions.
    #[serde(default)]
    pub emotions: EmotionMap,
    /// Recent exchanges, oldest first.
    #[serde(default)]
    pub recent_history: Vec<HistoryTurn>,
    /// Retrieved memories and their summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_context: Option<EnhancedConversationContext>,
    /// Derived consciousness, self-awareness and behaviour annotations.
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct DialogueRequestBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    options: &'a DialogueOptions,
}

/// Reply produced by the dialogue API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueResponse {
    /// Response identifier.
    pub id: String,
    /// Reply text.
    pub text: String,
    /// Emotions attached to the reply.
    #[serde(default)]
    pub emotions: EmotionMap,
    /// Suggested follow-up prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_prompts: Option<Vec<String>>,
    /// Context string echoed by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_context: Option<String>,
    /// Free-form emotion annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_metadata: Option<Value>,
}

/// Remote text generation contract.
#[async_trait]
pub trait DialogueClient: Send + Sync {
    /// Generates a reply to `prompt`.
    async fn generate_dialogue(
        &self,
        prompt: &str,
        context: Option<&str>,
        options: &DialogueOptions,
    ) -> Result<DialogueResponse, DialogueError>;
}

/// JSON-over-HTTP client for the dialogue API.
#[derive(Debug, Clone)]
pub struct HttpDialogueClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpDialogueClient {
    /// Creates a client posting to `endpoint` with a per-request timeout.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, DialogueError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("psyche-dialogue/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Target URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DialogueClient for HttpDialogueClient {
    async fn generate_dialogue(
        &self,
        prompt: &str,
        context: Option<&str>,
        options: &DialogueOptions,
    ) -> Result<DialogueResponse, DialogueError> {
        let body = DialogueRequestBody {
            prompt,
            context,
            options,
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key).bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DialogueError::RemoteService {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<DialogueResponse>()
            .await
            .map_err(|err| DialogueError::Transport(format!("invalid dialogue payload: {err}")))
    }
}

/// Offline client replaying canned replies in order.
#[derive(Debug, Default)]
pub struct ScriptedDialogueClient {
    replies: Vec<String>,
    emotions: EmotionMap,
    latency: Duration,
    failure: Option<(u16, String)>,
    cursor: AtomicUsize,
    prompts: Mutex<Vec<(String, DialogueOptions)>>,
}

impl ScriptedDialogueClient {
    /// Cycles through `replies`; echoes the prompt when empty.
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Emotions attached to every reply.
    #[must_use]
    pub fn with_emotions(mut self, emotions: EmotionMap) -> Self {
        self.emotions = emotions;
        self
    }

    /// Waits this long before answering.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fails every call with the given status.
    #[must_use]
    pub fn failing(mut self, status: u16, body: impl Into<String>) -> Self {
        self.failure = Some((status, body.into()));
        self
    }

    /// Prompts and options received so far.
    #[must_use]
    pub fn received(&self) -> Vec<(String, DialogueOptions)> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl DialogueClient for ScriptedDialogueClient {
    async fn generate_dialogue(
        &self,
        prompt: &str,
        context: Option<&str>,
        options: &DialogueOptions,
    ) -> Result<DialogueResponse, DialogueError> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        self.prompts.lock().push((prompt.to_string(), options.clone()));
        if let Some((status, body)) = &self.failure {
            return Err(DialogueError::RemoteService {
                status: *status,
                body: body.clone(),
            });
        }
        let turn = self.cursor.fetch_add(1, Ordering::Relaxed);
        let text = if self.replies.is_empty() {
            format!("{} considers: {prompt}", options.player_name)
        } else {
            self.replies[turn % self.replies.len()].clone()
        };
        Ok(DialogueResponse {
            id: Uuid::new_v4().to_string(),
            text,
            emotions: self.emotions.clone(),
            next_prompts: None,
            conversation_context: context.map(str::to_string),
            emotional_metadata: None,
        })
    }
}
