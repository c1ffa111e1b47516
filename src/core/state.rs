//! Application state

use std::sync::Arc;

use crate::agent::AgentRunner;
use crate::auth::Session;
use crate::store::repositories::chat::ChatRepository;
use crate::store::repositories::message::MessageRepository;
use crate::store::{Database, MessageFeed};

pub struct AppState {
    pub db: Database,
    pub feed: MessageFeed,
    pub chats: ChatRepository,
    pub messages: MessageRepository,
    pub agent: Arc<dyn AgentRunner>,
    pub session: Session,
}

impl AppState {
    pub fn new(db: Database, agent: Arc<dyn AgentRunner>, session: Session) -> Self {
        let feed = MessageFeed::new();
        Self {
            chats: ChatRepository::new(db.clone()),
            messages: MessageRepository::new(db.clone(), feed.clone()),
            feed,
            db,
            agent,
            session,
        }
    }
}
