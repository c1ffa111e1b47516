//! Conversation store

pub mod connection;
pub mod feed;
pub mod repositories;
pub mod schema;

pub use connection::Database;
pub use feed::{FeedSubscription, MessageEvent, MessageFeed};
pub use repositories::chat::{Chat, ChatRepository};
pub use repositories::message::{Message, MessageRepository, MessageRole};
