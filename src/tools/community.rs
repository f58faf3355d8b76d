//! Community MCP Tools
//!
//! Group browsing and the coaching inbox.

use serde::Serialize;

use crate::db::Database;
use crate::models::{Conversation, Group, Message};
use crate::session::SessionManager;

/// Longest message body accepted by send_message, in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Response for list_groups
#[derive(Debug, Serialize)]
pub struct ListGroupsResponse {
    pub groups: Vec<Group>,
    pub count: usize,
}

/// Response for list_conversations
#[derive(Debug, Serialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<Conversation>,
    pub unread_total: u32,
}

/// Response for get_messages
#[derive(Debug, Serialize)]
pub struct ConversationMessagesResponse {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

fn require_signed_in(session: &SessionManager) -> Result<(), String> {
    session.require_user().map(|_| ()).map_err(|e| e.to_string())
}

// ============================================================================
// Group Tools
// ============================================================================

pub fn list_groups(db: &Database) -> Result<ListGroupsResponse, String> {
    let groups = db
        .with_conn(Group::list)
        .map_err(|e| format!("Failed to list groups: {}", e))?;
    Ok(ListGroupsResponse {
        count: groups.len(),
        groups,
    })
}

pub fn get_group(db: &Database, id: &str) -> Result<Group, String> {
    db.with_conn(|conn| Group::get_by_id(conn, id))
        .map_err(|e| format!("Failed to get group: {}", e))?
        .ok_or_else(|| format!("Group not found: {}", id))
}

// ============================================================================
// Messaging Tools
// ============================================================================

pub fn list_conversations(session: &SessionManager, db: &Database) -> Result<ListConversationsResponse, String> {
    require_signed_in(session)?;
    let conversations = db
        .with_conn(Conversation::list)
        .map_err(|e| format!("Failed to list conversations: {}", e))?;
    Ok(ListConversationsResponse {
        unread_total: conversations.iter().map(|c| c.unread_count).sum(),
        conversations,
    })
}

/// Messages of a conversation, oldest first. Unknown ids give an empty thread.
pub fn get_messages(session: &SessionManager, db: &Database, conversation_id: &str) -> Result<ConversationMessagesResponse, String> {
    require_signed_in(session)?;
    let messages = db
        .with_conn(|conn| Message::list_for_conversation(conn, conversation_id))
        .map_err(|e| format!("Failed to get messages: {}", e))?;
    Ok(ConversationMessagesResponse {
        conversation_id: conversation_id.to_string(),
        messages,
    })
}

pub fn send_message(session: &SessionManager, db: &Database, conversation_id: &str, text: &str) -> Result<Message, String> {
    require_signed_in(session)?;
    let text = text.trim();
    if text.is_empty() {
        return Err("Message text must not be empty".to_string());
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(format!("Message text is limited to {} characters", MAX_MESSAGE_CHARS));
    }

    let now = chrono::Utc::now().timestamp_millis();
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        if Conversation::get_by_id(&tx, conversation_id)?.is_none() {
            return Ok(None);
        }
        let message = Message::send(&tx, conversation_id, text, now)?;
        tx.commit()?;
        Ok(Some(message))
    })
    .map_err(|e| format!("Failed to send message: {}", e))?
    .ok_or_else(|| format!("Conversation not found: {}", conversation_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::db::migrations::run_migrations;
    use crate::session::{MemoryProfileStore, DEMO_EMAIL};

    fn setup() -> (SessionManager, Database) {
        let db = Database::in_memory().unwrap();
        db.with_conn(run_migrations).unwrap();
        let session = SessionManager::new(Arc::new(MemoryProfileStore::with_demo_account()));
        session.start();
        (session, db)
    }

    #[test]
    fn test_groups_are_listed() {
        let (_session, db) = setup();
        let response = list_groups(&db).unwrap();
        assert_eq!(response.count, 3);
        assert_eq!(response.groups[0].name, "Morning Cardio Crew");

        let keto = get_group(&db, "g2").unwrap();
        assert_eq!(keto.member_count, 42);
        assert_eq!(keto.next_session.as_deref(), Some("Wed, 8:00 PM"));
        assert!(get_group(&db, "missing").unwrap_err().contains("not found"));
    }

    #[test]
    fn test_inbox_requires_sign_in() {
        let (session, db) = setup();
        assert!(list_conversations(&session, &db).is_err());
        assert!(get_messages(&session, &db, "c1").is_err());
        assert!(send_message(&session, &db, "c1", "hi").is_err());
    }

    #[test]
    fn test_conversation_thread() {
        let (session, db) = setup();
        session.login(DEMO_EMAIL).unwrap();

        let inbox = list_conversations(&session, &db).unwrap();
        assert_eq!(inbox.conversations[0].participant_name, "Coach Sarah");
        assert_eq!(inbox.unread_total, 1);

        let thread = get_messages(&session, &db, "c1").unwrap();
        assert_eq!(thread.messages.len(), 3);
        assert_eq!(thread.messages[0].text, "Hey! How are you feeling today?");
        assert!(get_messages(&session, &db, "c404").unwrap().messages.is_empty());
    }

    #[test]
    fn test_send_message_appends_and_reorders() {
        let (session, db) = setup();
        session.login(DEMO_EMAIL).unwrap();

        let sent = send_message(&session, &db, "c3", "  Thank you!  ").unwrap();
        assert_eq!(sent.text, "Thank you!");
        assert!(sent.is_mine && sent.is_read);

        let thread = get_messages(&session, &db, "c3").unwrap();
        assert_eq!(thread.messages, vec![sent]);

        let inbox = list_conversations(&session, &db).unwrap();
        assert_eq!(inbox.conversations[0].id, "c3");
        assert_eq!(inbox.conversations[0].last_message, "Thank you!");
    }

    #[test]
    fn test_send_message_rejects_bad_input() {
        let (session, db) = setup();
        session.login(DEMO_EMAIL).unwrap();

        assert!(send_message(&session, &db, "c1", "   ").is_err());
        assert!(send_message(&session, &db, "c1", &"x".repeat(MAX_MESSAGE_CHARS + 1)).is_err());
        assert!(send_message(&session, &db, "c404", "hello").unwrap_err().contains("not found"));
        assert!(get_messages(&session, &db, "c404").unwrap().messages.is_empty());
    }
}
