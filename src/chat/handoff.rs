//! Conversation creation handoff
//!
//! The creating view inserts the chat and its first message, then hands both
//! to the chat view in memory. The chat view can thereby skip its bulk load
//! and invoke the agent without a read-after-write round trip.

use anyhow::Result;

use crate::core::AppState;
use crate::store::repositories::chat::Chat;
use crate::store::repositories::message::{Message, MessageRole};

/// A freshly created conversation handed from the creating view to the chat
/// view, in memory
#[derive(Debug, Clone)]
pub struct ChatHandoff {
    pub chat: Chat,
    pub initial_message: Message,
}

/// Create a conversation from a first prompt. The chat row and the first
/// user message are inserted in one logical step.
pub async fn start_chat(
    state: &AppState,
    prompt: &str,
    repo_url: Option<String>,
) -> Result<ChatHandoff> {
    let chat = state
        .chats
        .create(state.session.user_id(), title_from_prompt(prompt), repo_url)
        .await?;

    let initial_message = state
        .messages
        .create(&chat.id, MessageRole::User, prompt)
        .await?;

    tracing::info!("Started chat {} ({:?})", chat.id, chat.title);

    Ok(ChatHandoff {
        chat,
        initial_message,
    })
}

/// Chat titles are the first prompt's prefix
fn title_from_prompt(prompt: &str) -> String {
    const MAX_TITLE_CHARS: usize = 50;

    let trimmed = prompt.trim();
    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        return trimmed.to_string();
    }

    let prefix: String = trimmed.chars().take(MAX_TITLE_CHARS).collect();
    format!("{}...", prefix.trim_end())
}
