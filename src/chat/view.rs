//! Chat view reconciler
//!
//! Presents one ordered, duplicate-free message list per conversation,
//! merged from three sources: the bulk load at open, the optimistic local
//! echo at submit, and assistant messages pushed over the feed.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::agent::RunAgentRequest;
use crate::chat::handoff::ChatHandoff;
use crate::core::AppState;
use crate::store::repositories::chat::Chat;
use crate::store::repositories::message::{Message, MessageRole};
use crate::store::{FeedSubscription, MessageEvent};

#[derive(Debug, thiserror::Error)]
pub enum ChatViewError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Conversation {0} does not belong to the current user")]
    NotOwned(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// View state for one active conversation
pub struct ChatView {
    state: Arc<AppState>,
    chat: Chat,
    messages: Vec<Message>,
    subscription: Option<FeedSubscription>,
}

impl ChatView {
    /// Open a conversation with a bulk load of its chat row and messages.
    ///
    /// The chat row is checked first: a foreign or missing conversation
    /// fails without ever loading messages or subscribing.
    pub async fn open(state: Arc<AppState>, chat_id: &str) -> Result<Self, ChatViewError> {
        let chat = state
            .chats
            .get(chat_id)
            .await?
            .ok_or_else(|| ChatViewError::NotFound(chat_id.to_string()))?;

        if chat.owner_id != state.session.user_id() {
            return Err(ChatViewError::NotOwned(chat_id.to_string()));
        }

        let messages = state.messages.list_for_chat(chat_id).await?;

        let mut view = Self {
            state,
            chat,
            messages,
            subscription: None,
        };
        view.ensure_subscribed();
        Ok(view)
    }

    /// Open a conversation handed over by the creating view. No bulk read
    /// happens; the handoff already carries the chat and its first message.
    /// The agent run is triggered immediately with the initial prompt.
    pub async fn open_from_handoff(state: Arc<AppState>, handoff: ChatHandoff) -> Result<Self> {
        let ChatHandoff {
            chat,
            initial_message,
        } = handoff;
        let prompt = initial_message.content.clone();

        let mut view = Self {
            state,
            chat,
            messages: vec![initial_message],
            subscription: None,
        };
        view.ensure_subscribed();
        view.invoke_agent(&prompt).await?;
        Ok(view)
    }

    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Subscribe to the active conversation's feed. A live subscription
    /// already bound to this conversation is left alone.
    pub fn ensure_subscribed(&mut self) {
        if let Some(subscription) = &self.subscription {
            if subscription.chat_id() == self.chat.id {
                debug!("Already subscribed to chat {}, skipping", self.chat.id);
                return;
            }
            // Bound to another conversation: release before re-subscribing
            self.subscription = None;
        }
        self.subscription = Some(self.state.feed.subscribe(&self.chat.id));
    }

    /// Make another conversation active. Re-selecting the current one with a
    /// live subscription is a no-op; otherwise the old subscription is torn
    /// down before the new one is opened.
    pub async fn switch(&mut self, chat_id: &str) -> Result<(), ChatViewError> {
        if self
            .subscription
            .as_ref()
            .is_some_and(|s| s.chat_id() == chat_id)
        {
            debug!("Chat {} already active, skipping switch", chat_id);
            return Ok(());
        }

        let chat = self
            .state
            .chats
            .get(chat_id)
            .await?
            .ok_or_else(|| ChatViewError::NotFound(chat_id.to_string()))?;
        if chat.owner_id != self.state.session.user_id() {
            return Err(ChatViewError::NotOwned(chat_id.to_string()));
        }
        let messages = self.state.messages.list_for_chat(chat_id).await?;

        self.subscription = None;
        self.chat = chat;
        self.messages = messages;
        self.ensure_subscribed();
        Ok(())
    }

    /// Merge one pushed event into the list. Returns whether the list
    /// changed.
    ///
    /// User-authored inserts arrive through the optimistic local path, so
    /// only assistant messages are accepted from the feed; a known id is a
    /// no-op. Accepted messages land at their timestamp-ordered position,
    /// which keeps the display correct even if the feed replays late.
    pub fn apply_event(&mut self, event: MessageEvent) -> bool {
        let MessageEvent::Inserted(message) = event;

        if message.role != MessageRole::Assistant {
            return false;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            debug!("Message {} already present, skipping", message.id);
            return false;
        }

        let position = self
            .messages
            .iter()
            .rposition(|m| m.created_at <= message.created_at)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.messages.insert(position, message);
        true
    }

    /// Send a prompt: echo it locally before any I/O, persist the same row,
    /// then ask the backend to start an agent run.
    pub async fn submit(&mut self, prompt: &str) -> Result<()> {
        let message = Message::new(&self.chat.id, MessageRole::User, prompt);
        self.messages.push(message.clone());

        self.state.messages.insert(&message).await?;

        self.invoke_agent(prompt).await
    }

    /// Await the next pushed event for the active conversation
    pub async fn next_event(&mut self) -> Option<MessageEvent> {
        match &mut self.subscription {
            Some(subscription) => subscription.recv().await,
            None => None,
        }
    }

    /// Release the subscription unconditionally
    pub fn close(&mut self) {
        if self.subscription.take().is_some() {
            debug!("Released feed subscription for chat {}", self.chat.id);
        }
    }

    /// Fire-and-forget agent invocation: only the ack status is interpreted
    /// here, the actual reply arrives over the feed.
    async fn invoke_agent(&mut self, prompt: &str) -> Result<()> {
        let request = RunAgentRequest {
            chat_id: self.chat.id.clone(),
            repo_url: self.chat.repo_url.clone(),
            user_github_username: self.state.session.user().display_handle(),
            prompt: prompt.to_string(),
        };

        match self.state.agent.run_agent(&request).await {
            Ok(ack) if ack.is_started() => {
                debug!("Agent run started for chat {}", self.chat.id);
                Ok(())
            }
            Ok(ack) => {
                let detail = ack
                    .error
                    .unwrap_or_else(|| "Failed to start the AI agent".to_string());
                warn!("Agent backend refused the run: {}", detail);
                self.insert_agent_error(&detail).await
            }
            Err(e) => {
                warn!("Agent backend unreachable: {:#}", e);
                self.insert_agent_error(
                    "Failed to connect to the AI backend. Please check if the backend is running.",
                )
                .await
            }
        }
    }

    /// Surface an invocation failure as a visible assistant message instead
    /// of silence.
    async fn insert_agent_error(&mut self, detail: &str) -> Result<()> {
        let message = Message::new(
            &self.chat.id,
            MessageRole::Assistant,
            format!("Error: {}", detail),
        );
        self.state.messages.insert(&message).await?;
        // The feed will re-deliver this insert; apply_event drops the
        // duplicate by id.
        self.messages.push(message);
        Ok(())
    }
}
