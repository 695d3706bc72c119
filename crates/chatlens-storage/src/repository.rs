//! Repository implementations for SQLite-backed persistence.
//!
//! Provides UserRepository, TurnRepository and AttachmentRepository that
//! operate on the Database pool using raw SQL. Timestamps are stored as
//! UTC epoch milliseconds.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use chatlens_core::error::ChatlensError;
use chatlens_core::types::{Attachment, ConversationKey, ConversationTurn, SentimentLabel, User};

use crate::db::Database;

/// Repository for registered users.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a user unless one already exists for the key.
    ///
    /// Returns `true` when a row was written.
    pub fn insert(&self, user: &User) -> Result<bool, ChatlensError> {
        self.db.with_conn(|conn| {
            let rows = conn
                .execute(
                    "INSERT OR IGNORE INTO users
                        (conversation_key, display_name, handle, phone_number, registered_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        user.conversation_key.as_str(),
                        user.display_name,
                        user.handle,
                        user.phone_number,
                        user.registered_at.timestamp_millis(),
                    ],
                )
                .map_err(|e| ChatlensError::Storage(format!("Failed to insert user: {}", e)))?;
            Ok(rows == 1)
        })
    }

    /// Find a user by conversation key.
    pub fn find_by_key(&self, key: &ConversationKey) -> Result<Option<User>, ChatlensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT conversation_key, display_name, handle, phone_number, registered_at
                     FROM users WHERE conversation_key = ?1",
                )
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![key.as_str()], |row| Ok(row_to_user(row)))
                .optional()
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            match result {
                Some(user) => Ok(Some(user?)),
                None => Ok(None),
            }
        })
    }

    /// Set the phone number if it has never been set.
    ///
    /// Returns `true` when the row was updated, `false` if the user is
    /// missing or already has a phone number.
    pub fn set_phone_if_unset(
        &self,
        key: &ConversationKey,
        phone: &str,
    ) -> Result<bool, ChatlensError> {
        self.db.with_conn(|conn| {
            let rows = conn
                .execute(
                    "UPDATE users SET phone_number = ?2
                     WHERE conversation_key = ?1 AND phone_number IS NULL",
                    rusqlite::params![key.as_str(), phone],
                )
                .map_err(|e| ChatlensError::Storage(format!("Failed to update phone: {}", e)))?;
            Ok(rows == 1)
        })
    }

    /// Count registered users.
    #[cfg(test)]
    pub(crate) fn count(&self) -> Result<u64, ChatlensError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for conversation turns. Append-only.
#[derive(Clone)]
pub struct TurnRepository {
    db: Arc<Database>,
}

impl TurnRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new turn.
    pub fn save(&self, turn: &ConversationTurn) -> Result<(), ChatlensError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversation_turns
                    (id, conversation_key, inbound_text, reply_text, sentiment, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    turn.id.to_string(),
                    turn.conversation_key.as_str(),
                    turn.inbound_text,
                    turn.reply_text,
                    turn.sentiment.as_str(),
                    turn.timestamp.timestamp_millis(),
                ],
            )
            .map_err(|e| ChatlensError::Storage(format!("Failed to save turn: {}", e)))?;
            Ok(())
        })
    }

    /// Most recent turns of one conversation, oldest first.
    pub fn find_by_conversation(
        &self,
        key: &ConversationKey,
        limit: u64,
    ) -> Result<Vec<ConversationTurn>, ChatlensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, conversation_key, inbound_text, reply_text, sentiment, timestamp
                     FROM (
                        SELECT * FROM conversation_turns
                        WHERE conversation_key = ?1
                        ORDER BY timestamp DESC, rowid DESC
                        LIMIT ?2
                     )
                     ORDER BY timestamp ASC, rowid ASC",
                )
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![key.as_str(), limit as i64], |row| {
                    Ok(row_to_turn(row))
                })
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            let mut turns = Vec::new();
            for row in rows {
                let turn = row.map_err(|e| ChatlensError::Storage(e.to_string()))??;
                turns.push(turn);
            }
            Ok(turns)
        })
    }

    /// Count all turns.
    #[cfg(test)]
    pub(crate) fn count(&self) -> Result<u64, ChatlensError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM conversation_turns", [], |row| row.get(0))
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for media attachments. Append-only.
#[derive(Clone)]
pub struct AttachmentRepository {
    db: Arc<Database>,
}

impl AttachmentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new attachment.
    pub fn save(&self, attachment: &Attachment) -> Result<(), ChatlensError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO attachments
                    (id, conversation_key, file_ref, media_type, description, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    attachment.id.to_string(),
                    attachment.conversation_key.as_str(),
                    attachment.file_ref,
                    attachment.media_type,
                    attachment.description,
                    attachment.timestamp.timestamp_millis(),
                ],
            )
            .map_err(|e| ChatlensError::Storage(format!("Failed to save attachment: {}", e)))?;
            Ok(())
        })
    }

    /// Attachments of one conversation, oldest first.
    pub fn find_by_conversation(
        &self,
        key: &ConversationKey,
        limit: u64,
    ) -> Result<Vec<Attachment>, ChatlensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, conversation_key, file_ref, media_type, description, timestamp
                     FROM attachments
                     WHERE conversation_key = ?1
                     ORDER BY timestamp ASC, rowid ASC
                     LIMIT ?2",
                )
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![key.as_str(), limit as i64], |row| {
                    Ok(row_to_attachment(row))
                })
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            let mut attachments = Vec::new();
            for row in rows {
                let attachment = row.map_err(|e| ChatlensError::Storage(e.to_string()))??;
                attachments.push(attachment);
            }
            Ok(attachments)
        })
    }

    /// Count all attachments.
    #[cfg(test)]
    pub(crate) fn count(&self) -> Result<u64, ChatlensError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM attachments", [], |row| row.get(0))
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

// ============================================================================
// Helper functions for row-to-entity conversion.
// ============================================================================

pub(crate) fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User, ChatlensError> {
    let key: String = row
        .get(0)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let display_name: Option<String> = row
        .get(1)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let handle: Option<String> = row
        .get(2)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let phone_number: Option<String> = row
        .get(3)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let registered_at: i64 = row
        .get(4)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;

    Ok(User {
        conversation_key: ConversationKey::new(key),
        display_name,
        handle,
        phone_number,
        registered_at: millis_to_utc(registered_at),
    })
}

fn row_to_turn(row: &rusqlite::Row<'_>) -> Result<ConversationTurn, ChatlensError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let key: String = row
        .get(1)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let inbound_text: String = row
        .get(2)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let reply_text: String = row
        .get(3)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let sentiment: Option<String> = row
        .get(4)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let timestamp: i64 = row
        .get(5)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;

    let sentiment = sentiment
        .as_deref()
        .unwrap_or_default()
        .parse::<SentimentLabel>()
        .map_err(|e| ChatlensError::Storage(format!("Turn {}: {}", id_str, e)))?;

    Ok(ConversationTurn {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| ChatlensError::Storage(format!("Invalid UUID: {}", e)))?,
        conversation_key: ConversationKey::new(key),
        inbound_text,
        reply_text,
        sentiment,
        timestamp: millis_to_utc(timestamp),
    })
}

fn row_to_attachment(row: &rusqlite::Row<'_>) -> Result<Attachment, ChatlensError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let key: String = row
        .get(1)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let file_ref: String = row
        .get(2)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let media_type: String = row
        .get(3)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let description: String = row
        .get(4)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;
    let timestamp: i64 = row
        .get(5)
        .map_err(|e| ChatlensError::Storage(e.to_string()))?;

    Ok(Attachment {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| ChatlensError::Storage(format!("Invalid UUID: {}", e)))?,
        conversation_key: ConversationKey::new(key),
        file_ref,
        media_type,
        description,
        timestamp: millis_to_utc(timestamp),
    })
}

/// Extension trait for rusqlite to support optional query results.
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn key(k: &str) -> ConversationKey {
        ConversationKey::new(k)
    }

    // ========================================================================
    // UserRepository tests
    // ========================================================================

    #[test]
    fn test_user_insert_and_find() {
        let repo = UserRepository::new(make_db());
        let user = User::new(key("1"), Some("Ada".into()), Some("ada".into()));

        assert!(repo.insert(&user).unwrap());

        let found = repo.find_by_key(&key("1")).unwrap().unwrap();
        assert_eq!(found.conversation_key, key("1"));
        assert_eq!(found.display_name.as_deref(), Some("Ada"));
        assert_eq!(found.handle.as_deref(), Some("ada"));
        assert!(found.phone_number.is_none());
        assert_eq!(
            found.registered_at.timestamp_millis(),
            user.registered_at.timestamp_millis()
        );
    }

    #[test]
    fn test_user_insert_is_unique_per_key() {
        let repo = UserRepository::new(make_db());
        assert!(repo.insert(&User::new(key("1"), Some("First".into()), None)).unwrap());
        assert!(!repo.insert(&User::new(key("1"), Some("Second".into()), None)).unwrap());

        assert_eq!(repo.count().unwrap(), 1);
        let found = repo.find_by_key(&key("1")).unwrap().unwrap();
        assert_eq!(found.display_name.as_deref(), Some("First"));
    }

    #[test]
    fn test_user_find_nonexistent() {
        let repo = UserRepository::new(make_db());
        assert!(repo.find_by_key(&key("missing")).unwrap().is_none());
    }

    #[test]
    fn test_phone_set_exactly_once() {
        let repo = UserRepository::new(make_db());
        repo.insert(&User::new(key("1"), None, None)).unwrap();

        assert!(repo.set_phone_if_unset(&key("1"), "+15550001").unwrap());
        assert!(!repo.set_phone_if_unset(&key("1"), "+15550002").unwrap());

        let found = repo.find_by_key(&key("1")).unwrap().unwrap();
        assert_eq!(found.phone_number.as_deref(), Some("+15550001"));
    }

    #[test]
    fn test_phone_for_missing_user() {
        let repo = UserRepository::new(make_db());
        assert!(!repo.set_phone_if_unset(&key("ghost"), "+1").unwrap());
    }

    // ========================================================================
    // TurnRepository tests
    // ========================================================================

    #[test]
    fn test_turn_save_and_find() {
        let repo = TurnRepository::new(make_db());
        let turn = ConversationTurn::new(key("1"), "I love it", "Glad!", SentimentLabel::Positive);
        repo.save(&turn).unwrap();

        let turns = repo.find_by_conversation(&key("1"), 10).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].id, turn.id);
        assert_eq!(turns[0].inbound_text, "I love it");
        assert_eq!(turns[0].reply_text, "Glad!");
        assert_eq!(turns[0].sentiment, SentimentLabel::Positive);
    }

    #[test]
    fn test_turns_scoped_to_conversation() {
        let repo = TurnRepository::new(make_db());
        repo.save(&ConversationTurn::new(key("1"), "a", "b", SentimentLabel::Neutral)).unwrap();
        repo.save(&ConversationTurn::new(key("2"), "c", "d", SentimentLabel::Neutral)).unwrap();

        assert_eq!(repo.find_by_conversation(&key("1"), 10).unwrap().len(), 1);
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_turns_limit_keeps_most_recent_in_order() {
        let repo = TurnRepository::new(make_db());
        for i in 0..5 {
            let mut turn =
                ConversationTurn::new(key("1"), format!("m{}", i), "r", SentimentLabel::Neutral);
            turn.timestamp = millis_to_utc(1_000 + i);
            repo.save(&turn).unwrap();
        }

        let turns = repo.find_by_conversation(&key("1"), 2).unwrap();
        let texts: Vec<_> = turns.iter().map(|t| t.inbound_text.as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4"]);
    }

    #[test]
    fn test_turn_with_corrupt_label_is_reported() {
        let db = make_db();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversation_turns
                    (id, conversation_key, inbound_text, reply_text, sentiment, timestamp)
                 VALUES (?1, '1', 'x', 'y', 'Elated', 0)",
                [Uuid::new_v4().to_string()],
            )
            .map_err(|e| ChatlensError::Storage(e.to_string()))?;
            Ok(())
        })
        .unwrap();

        let repo = TurnRepository::new(db);
        assert!(repo.find_by_conversation(&key("1"), 10).is_err());
    }

    // ========================================================================
    // AttachmentRepository tests
    // ========================================================================

    #[test]
    fn test_attachment_save_and_find() {
        let repo = AttachmentRepository::new(make_db());
        let attachment = Attachment::new(key("1"), "file-abc", "image/jpeg", "A cat on a sofa");
        repo.save(&attachment).unwrap();

        let found = repo.find_by_conversation(&key("1"), 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_ref, "file-abc");
        assert_eq!(found[0].media_type, "image/jpeg");
        assert_eq!(found[0].description, "A cat on a sofa");
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_attachment_count_empty() {
        let repo = AttachmentRepository::new(make_db());
        assert_eq!(repo.count().unwrap(), 0);
    }
}
