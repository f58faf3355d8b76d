//! Conversation and message models
//!
//! A shared inbox of conversations with coaches and support. Timestamps
//! are Unix milliseconds.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Sender id and name used for messages written from this inbox
pub const SELF_SENDER_ID: &str = "me";
pub const SELF_SENDER_NAME: &str = "Me";

/// A conversation thread summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_name: String,
    pub last_message: String,
    pub unread_count: u32,
    pub avatar: Option<String>,
    pub timestamp: i64,
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp: i64,
    pub is_read: bool,
    pub is_mine: bool,
}

impl Conversation {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            participant_name: row.get("participant_name")?,
            last_message: row.get("last_message")?,
            unread_count: row.get("unread_count")?,
            avatar: row.get("avatar")?,
            timestamp: row.get("timestamp")?,
        })
    }

    pub fn insert(conn: &Connection, conversation: &Conversation) -> DbResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO conversations
                (id, participant_name, last_message, unread_count, avatar, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                conversation.id,
                conversation.participant_name,
                conversation.last_message,
                conversation.unread_count,
                conversation.avatar,
                conversation.timestamp,
            ],
        )?;
        Ok(rows > 0)
    }

    /// All conversations, most recent first
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM conversations ORDER BY timestamp DESC, id")?;
        let conversations = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conversations)
    }

    pub fn get_by_id(conn: &Connection, id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM conversations WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(conversation) => Ok(Some(conversation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Message {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            conversation_id: row.get("conversation_id")?,
            sender_id: row.get("sender_id")?,
            sender_name: row.get("sender_name")?,
            text: row.get("text")?,
            timestamp: row.get("timestamp")?,
            is_read: row.get("is_read")?,
            is_mine: row.get("is_mine")?,
        })
    }

    fn insert(conn: &Connection, conversation_id: &str, message: &SeedMessage, timestamp: i64) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO messages
                (conversation_id, sender_id, sender_name, text, timestamp, is_read, is_mine)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                conversation_id,
                message.sender_id,
                message.sender_name,
                message.text,
                timestamp,
                message.is_read,
                message.sender_id == SELF_SENDER_ID,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row("SELECT * FROM messages WHERE id = ?1", [id], Self::from_row)?)
    }

    /// Messages of a conversation, oldest first; unknown ids give an empty list
    pub fn list_for_conversation(conn: &Connection, conversation_id: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY timestamp, id",
        )?;
        let messages = stmt
            .query_map([conversation_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Append an outgoing message and bump the conversation to the top
    pub fn send(conn: &Connection, conversation_id: &str, text: &str, timestamp: i64) -> DbResult<Self> {
        let message = Self::insert(
            conn,
            conversation_id,
            &SeedMessage {
                sender_id: SELF_SENDER_ID,
                sender_name: SELF_SENDER_NAME,
                text,
                is_read: true,
            },
            timestamp,
        )?;

        conn.execute(
            "UPDATE conversations SET last_message = ?1, timestamp = ?2 WHERE id = ?3",
            params![text, timestamp, conversation_id],
        )?;
        Ok(message)
    }
}

struct SeedMessage<'a> {
    sender_id: &'a str,
    sender_name: &'a str,
    text: &'a str,
    is_read: bool,
}

const MINUTE_MS: i64 = 60 * 1000;

/// Seed the inbox relative to `now` (Unix ms). Returns the number of
/// conversations inserted; messages are only added with a new conversation.
pub fn seed_default_inbox(conn: &Connection, now: i64) -> DbResult<usize> {
    let conversation = |id: &str, name: &str, last: &str, unread: u32, age_ms: i64| Conversation {
        id: id.into(),
        participant_name: name.into(),
        last_message: last.into(),
        unread_count: unread,
        avatar: None,
        timestamp: now - age_ms,
    };

    let conversations = [
        conversation("c1", "Coach Sarah", "Great progress this week! Keep it up.", 1, 5 * MINUTE_MS),
        conversation("c2", "Dr. Mike", "Don't forget to track your water intake.", 0, 120 * MINUTE_MS),
        conversation("c3", "Support Team", "Your subscription has been renewed.", 0, 24 * 60 * MINUTE_MS),
    ];

    let mut inserted = 0;
    for c in &conversations {
        if Conversation::insert(conn, c)? {
            inserted += 1;
        }
    }
    if inserted == 0 {
        return Ok(0);
    }

    let coach = |text, is_read| SeedMessage {
        sender_id: "coach",
        sender_name: "Coach Sarah",
        text,
        is_read,
    };
    let thread = [
        (coach("Hey! How are you feeling today?", true), 100_000),
        (
            SeedMessage {
                sender_id: SELF_SENDER_ID,
                sender_name: SELF_SENDER_NAME,
                text: "Feeling great, thanks similar to last week.",
                is_read: true,
            },
            90_000,
        ),
        (coach("Great progress this week! Keep it up.", false), 50_000),
    ];
    for (message, age_ms) in thread {
        Message::insert(conn, "c1", &message, now - age_ms)?;
    }

    Ok(inserted)
}
