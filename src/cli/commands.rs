//! CLI commands

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{CreateSandboxRequest, HttpAgentRunner};
use crate::auth::Session;
use crate::chat::{start_chat, ChatView, ChatViewError};
use crate::config::Config;
use crate::core::AppState;
use crate::store::repositories::message::{Message, MessageRole};
use crate::store::{Database, MessageEvent};

#[derive(Parser)]
#[command(name = "codechat")]
#[command(about = "Terminal client for a chat-based AI coding assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.codechat/config.yml)
    #[arg(long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new conversation from a prompt
    Start {
        /// First prompt of the conversation
        prompt: String,

        /// GitHub repository URL to work against
        #[arg(long)]
        repo: Option<String>,
    },

    /// Open an existing conversation
    Open {
        /// Conversation ID
        chat_id: String,
    },

    /// List recent conversations
    Chats,

    /// Rename a conversation
    Rename {
        /// Conversation ID
        chat_id: String,

        /// New title
        title: String,
    },

    /// Prepare a sandbox for a conversation's repository
    Sandbox {
        /// Conversation ID
        chat_id: String,
    },

    /// Check whether the GitHub app is installed for the current user
    Github,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    if config.identity.is_empty() {
        anyhow::bail!(
            "No signed-in identity configured. Add one under `identity:` in the config file."
        );
    }

    let db = Database::new(config.resolve_db_path()?)?;
    let agent = Arc::new(HttpAgentRunner::new(&config.backend_url));
    let session = Session::new(config.identity.clone());
    let state = Arc::new(AppState::new(db, agent, session));

    // Create a multi-threaded runtime for CLI operations
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        match cli.command {
            Commands::Start { prompt, repo } => {
                let prompt = prompt.trim();
                if prompt.is_empty() {
                    anyhow::bail!("Prompt must not be empty");
                }

                let handoff = start_chat(&state, prompt, repo).await?;
                println!("Started conversation: {}", handoff.chat.id);

                let mut view = ChatView::open_from_handoff(state.clone(), handoff).await?;
                run_chat_loop(&mut view).await
            }

            Commands::Open { chat_id } => match ChatView::open(state.clone(), &chat_id).await {
                Ok(mut view) => run_chat_loop(&mut view).await,
                Err(e @ (ChatViewError::NotFound(_) | ChatViewError::NotOwned(_))) => {
                    // Fall back to the listing instead of a dead chat view
                    tracing::warn!("{}", e);
                    print_chats(&state).await
                }
                Err(ChatViewError::Store(e)) => Err(e),
            },

            Commands::Chats => print_chats(&state).await,

            Commands::Rename { chat_id, title } => {
                state.chats.update_title(&chat_id, &title).await?;
                println!("Renamed conversation: {}", chat_id);
                Ok(())
            }

            Commands::Sandbox { chat_id } => {
                let chat = state
                    .chats
                    .get(&chat_id)
                    .await?
                    .filter(|c| c.owner_id == state.session.user_id())
                    .ok_or_else(|| anyhow::anyhow!("Conversation not found: {}", chat_id))?;

                let repo_url = chat.repo_url.clone().ok_or_else(|| {
                    anyhow::anyhow!("Conversation {} has no repository attached", chat_id)
                })?;

                let request = CreateSandboxRequest {
                    chat_id: chat.id.clone(),
                    repo_url,
                    user_github_username: state.session.user().display_handle(),
                };

                let response = state.agent.create_sandbox(&request).await?;
                if !response.is_success() {
                    anyhow::bail!(
                        "Sandbox creation failed: {}",
                        response.error.as_deref().unwrap_or("unknown error")
                    );
                }

                if let Some(snapshot_id) = &response.snapshot_id {
                    state.chats.set_snapshot_id(&chat.id, snapshot_id).await?;
                }

                println!(
                    "Sandbox ready (snapshot: {})",
                    response.snapshot_id.as_deref().unwrap_or("-")
                );
                Ok(())
            }

            Commands::Github => {
                let handle = match state.session.user().handle.clone() {
                    Some(h) if !h.is_empty() => h,
                    _ => anyhow::bail!("No GitHub handle configured for the current user"),
                };

                let status = state.agent.check_github_app(&handle).await?;
                if status.installed {
                    println!(
                        "GitHub app installed for {} (installation: {})",
                        handle,
                        status
                            .installation_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string())
                    );
                } else {
                    println!("GitHub app not installed for {}", handle);
                }
                Ok(())
            }
        }
    })
}

/// Interactive loop over one conversation: stdin lines go out as prompts,
/// feed events come in as assistant replies.
async fn run_chat_loop(view: &mut ChatView) -> Result<()> {
    println!("--- {} ---", view.chat().title);
    for message in view.messages() {
        println!("{}", render_message(message));
    }
    println!("(enter a message, /quit to leave)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = view.next_event() => {
                let Some(event) = event else { break };
                let MessageEvent::Inserted(message) = &event;
                let message = message.clone();
                if view.apply_event(event) {
                    println!("{}", render_message(&message));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                let seen = view.messages().len();
                match view.submit(line).await {
                    Ok(()) => {
                        for message in &view.messages()[seen..] {
                            println!("{}", render_message(message));
                        }
                    }
                    Err(e) => tracing::error!("Failed to send message: {:#}", e),
                }
            }
        }
    }

    view.close();
    Ok(())
}

async fn print_chats(state: &AppState) -> Result<()> {
    let chats = state.chats.list_for_owner(state.session.user_id()).await?;

    if chats.is_empty() {
        println!("No conversations yet. Start one with `codechat start`.");
    } else {
        for chat in chats {
            println!(
                "[{}] {} - {} ({})",
                chat.id.chars().take(8).collect::<String>(),
                chat.title,
                chat.repo_url.as_deref().unwrap_or("-"),
                chat.updated_at.format("%Y-%m-%d %H:%M"),
            );
        }
    }
    Ok(())
}

/// One line per message; tool steps show their tool_data instead of raw
/// content.
fn render_message(message: &Message) -> String {
    if message.is_tool_use {
        if let Some(tool) = message.metadata.get("tool_data") {
            let description = tool
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or(&message.content);
            return match tool.get("summary").and_then(|v| v.as_str()) {
                Some(summary) => format!("[tool] {}: {}", description, summary),
                None => format!("[tool] {}", description),
            };
        }
    }

    match message.role {
        MessageRole::User => format!("you> {}", message.content),
        MessageRole::Assistant => format!("assistant> {}", message.content),
        MessageRole::System => format!("system> {}", message.content),
    }
}
