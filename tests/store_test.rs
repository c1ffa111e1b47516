// Tests for the conversation store

use std::time::Duration;

use codechat::store::{
    repositories::chat::ChatRepository,
    repositories::message::{Message, MessageRepository, MessageRole},
    Database, MessageEvent, MessageFeed,
};
use tempfile::TempDir;

fn create_test_store() -> (Database, MessageFeed, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(db_path).unwrap();
    let feed = MessageFeed::new();
    (db, feed, temp_dir)
}

#[tokio::test]
async fn test_store_initialization() {
    let (db, _feed, _temp) = create_test_store();
    // Basic smoke test - if we get here, the store initialized
    assert!(db.path().contains("test.db"));
}

#[tokio::test]
async fn test_create_and_get_chat() {
    let (db, _feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db);

    let chat = chats
        .create(
            "user-1",
            "Fix the bug".to_string(),
            Some("https://github.com/x/y".to_string()),
        )
        .await
        .unwrap();

    assert!(!chat.id.is_empty());
    assert_eq!(chat.owner_id, "user-1");
    assert_eq!(chat.created_at, chat.updated_at);
    assert!(chat.snapshot_id.is_none());

    let retrieved = chats.get(&chat.id).await.unwrap().unwrap();
    assert_eq!(retrieved.id, chat.id);
    assert_eq!(retrieved.title, "Fix the bug");
    assert_eq!(retrieved.repo_url.as_deref(), Some("https://github.com/x/y"));
}

#[tokio::test]
async fn test_chat_not_found() {
    let (db, _feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db);

    let result = chats.get("nonexistent-id").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_list_chats_filters_by_owner_and_orders_by_update() {
    let (db, feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db.clone());
    let messages = MessageRepository::new(db, feed);

    let first = chats
        .create("user-1", "First task".to_string(), None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = chats
        .create("user-1", "Second task".to_string(), None)
        .await
        .unwrap();
    chats
        .create("user-2", "Someone else's task".to_string(), None)
        .await
        .unwrap();

    let listed = chats.list_for_owner("user-1").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|c| c.owner_id == "user-1"));
    assert_eq!(listed[0].id, second.id);

    // A new message bumps its chat back to the top of the listing
    tokio::time::sleep(Duration::from_millis(5)).await;
    messages
        .create(&first.id, MessageRole::User, "hello again")
        .await
        .unwrap();

    let listed = chats.list_for_owner("user-1").await.unwrap();
    assert_eq!(listed[0].id, first.id);
}

#[tokio::test]
async fn test_update_title_and_snapshot() {
    let (db, _feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db);

    let chat = chats
        .create("user-1", "Old title".to_string(), None)
        .await
        .unwrap();

    chats.update_title(&chat.id, "New title").await.unwrap();
    chats.set_snapshot_id(&chat.id, "snap-42").await.unwrap();

    let updated = chats.get(&chat.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.snapshot_id.as_deref(), Some("snap-42"));
    assert!(updated.updated_at >= chat.updated_at);
}

#[tokio::test]
async fn test_messages_ordered_by_creation_ascending() {
    let (db, feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db.clone());
    let messages = MessageRepository::new(db, feed);

    let chat = chats
        .create("user-1", "Ordering".to_string(), None)
        .await
        .unwrap();

    for content in ["one", "two", "three"] {
        messages
            .create(&chat.id, MessageRole::User, content)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let listed = messages.list_for_chat(&chat.id).await.unwrap();
    let contents: Vec<&str> = listed.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "two", "three"]);
    assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn test_message_insert_bumps_chat_timestamp() {
    let (db, feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db.clone());
    let messages = MessageRepository::new(db, feed);

    let chat = chats
        .create("user-1", "Timestamps".to_string(), None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let message = messages
        .create(&chat.id, MessageRole::User, "bump")
        .await
        .unwrap();

    let bumped = chats.get(&chat.id).await.unwrap().unwrap();
    assert!(bumped.updated_at > chat.updated_at);
    assert!(bumped.updated_at >= message.created_at);

    // Never goes backwards across further inserts
    tokio::time::sleep(Duration::from_millis(5)).await;
    messages
        .create(&chat.id, MessageRole::Assistant, "reply")
        .await
        .unwrap();
    let again = chats.get(&chat.id).await.unwrap().unwrap();
    assert!(again.updated_at >= bumped.updated_at);
}

#[tokio::test]
async fn test_message_requires_existing_chat() {
    let (db, feed, _temp) = create_test_store();
    let messages = MessageRepository::new(db, feed);

    let result = messages
        .create("missing-chat", MessageRole::User, "orphan")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_tool_use_metadata_round_trip() {
    let (db, feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db.clone());
    let messages = MessageRepository::new(db, feed);

    let chat = chats
        .create("user-1", "Tools".to_string(), None)
        .await
        .unwrap();

    let tool_message = Message::new(&chat.id, MessageRole::Assistant, "Reading file")
        .with_tool_use()
        .with_metadata(serde_json::json!({
            "tool_data": {
                "description": "Read",
                "summary": "src/main.rs",
                "input": {"path": "src/main.rs"}
            }
        }));
    messages.insert(&tool_message).await.unwrap();

    let listed = messages.list_for_chat(&chat.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_tool_use);
    assert_eq!(
        listed[0].metadata["tool_data"]["summary"],
        serde_json::json!("src/main.rs")
    );
}

#[tokio::test]
async fn test_insert_publishes_filtered_feed_events() {
    let (db, feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db.clone());
    let messages = MessageRepository::new(db, feed.clone());

    let watched = chats
        .create("user-1", "Watched".to_string(), None)
        .await
        .unwrap();
    let other = chats
        .create("user-1", "Other".to_string(), None)
        .await
        .unwrap();

    let mut subscription = feed.subscribe(&watched.id);

    messages
        .create(&other.id, MessageRole::Assistant, "elsewhere")
        .await
        .unwrap();
    let inserted = messages
        .create(&watched.id, MessageRole::Assistant, "here")
        .await
        .unwrap();

    // The other chat's event is filtered out; only the watched insert lands
    let event = subscription.try_recv().expect("expected a feed event");
    let MessageEvent::Inserted(received) = event;
    assert_eq!(received.id, inserted.id);
    assert_eq!(received.content, "here");
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn test_delete_chat_cascades_to_messages() {
    let (db, feed, _temp) = create_test_store();
    let chats = ChatRepository::new(db.clone());
    let messages = MessageRepository::new(db, feed);

    let chat = chats
        .create("user-1", "Doomed".to_string(), None)
        .await
        .unwrap();
    messages
        .create(&chat.id, MessageRole::User, "soon gone")
        .await
        .unwrap();

    chats.delete(&chat.id).await.unwrap();

    assert!(chats.get(&chat.id).await.unwrap().is_none());
    let remaining = messages.list_for_chat(&chat.id).await.unwrap();
    assert!(remaining.is_empty());
}
