//! Read-only projections for the analytics engine.
//!
//! Rows are returned with their stored labels untouched so the aggregation
//! layer can decide how to bucket missing or unrecognized values.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use chatlens_core::error::ChatlensError;
use chatlens_core::types::ConversationKey;

use crate::db::Database;
use crate::repository::millis_to_utc;

/// Projection of a registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub conversation_key: ConversationKey,
    pub display_name: Option<String>,
}

/// Projection of a conversation turn. `sentiment` is the raw stored label.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRow {
    pub conversation_key: ConversationKey,
    pub sentiment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Storage statistics from the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbStats {
    pub users: u64,
    pub turns: u64,
    pub attachments: u64,
    pub db_size_bytes: u64,
}

/// Whole-table reads used by summaries and dashboards.
#[derive(Clone)]
pub struct AnalyticsQueries {
    db: Arc<Database>,
}

impl AnalyticsQueries {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All users in registration order.
    pub fn users(&self) -> Result<Vec<UserRow>, ChatlensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT conversation_key, display_name FROM users
                     ORDER BY registered_at ASC, rowid ASC",
                )
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let key: String = row.get(0)?;
                    Ok(UserRow {
                        conversation_key: ConversationKey::new(key),
                        display_name: row.get(1)?,
                    })
                })
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| ChatlensError::Storage(e.to_string()))
        })
    }

    /// All turns in insertion order.
    pub fn turns(&self) -> Result<Vec<TurnRow>, ChatlensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT conversation_key, sentiment, timestamp FROM conversation_turns
                     ORDER BY rowid ASC",
                )
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let key: String = row.get(0)?;
                    let ts: i64 = row.get(2)?;
                    Ok(TurnRow {
                        conversation_key: ConversationKey::new(key),
                        sentiment: row.get(1)?,
                        timestamp: millis_to_utc(ts),
                    })
                })
                .map_err(|e| ChatlensError::Storage(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| ChatlensError::Storage(e.to_string()))
        })
    }

    /// Row counts and on-disk size.
    pub fn stats(&self) -> Result<DbStats, ChatlensError> {
        self.db.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64, ChatlensError> {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| n as u64)
                    .map_err(|e| ChatlensError::Storage(e.to_string()))
            };

            let users = count("SELECT COUNT(*) FROM users")?;
            let turns = count("SELECT COUNT(*) FROM conversation_turns")?;
            let attachments = count("SELECT COUNT(*) FROM attachments")?;

            let page_count = count("PRAGMA page_count")?;
            let page_size = count("PRAGMA page_size")?;

            Ok(DbStats {
                users,
                turns,
                attachments,
                db_size_bytes: page_count * page_size,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{AttachmentRepository, TurnRepository, UserRepository};
    use chatlens_core::types::{Attachment, ConversationTurn, SentimentLabel, User};

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    #[test]
    fn test_empty_projections() {
        let queries = AnalyticsQueries::new(make_db());
        assert!(queries.users().unwrap().is_empty());
        assert!(queries.turns().unwrap().is_empty());

        let stats = queries.stats().unwrap();
        assert_eq!(stats.users, 0);
        assert_eq!(stats.turns, 0);
        assert_eq!(stats.attachments, 0);
    }

    #[test]
    fn test_projections_reflect_writes() {
        let db = make_db();
        let users = UserRepository::new(Arc::clone(&db));
        let turns = TurnRepository::new(Arc::clone(&db));
        let attachments = AttachmentRepository::new(Arc::clone(&db));

        users.insert(&User::new("1".into(), Some("Ada".into()), None)).unwrap();
        turns
            .save(&ConversationTurn::new("1".into(), "great", "yay", SentimentLabel::Positive))
            .unwrap();
        turns
            .save(&ConversationTurn::new("1".into(), "meh", "ok", SentimentLabel::Neutral))
            .unwrap();
        attachments
            .save(&Attachment::new("1".into(), "f1", "image/jpeg", "a photo"))
            .unwrap();

        let queries = AnalyticsQueries::new(db);
        let user_rows = queries.users().unwrap();
        assert_eq!(user_rows.len(), 1);
        assert_eq!(user_rows[0].display_name.as_deref(), Some("Ada"));

        let turn_rows = queries.turns().unwrap();
        let labels: Vec<_> = turn_rows
            .iter()
            .map(|r| r.sentiment.as_deref().unwrap())
            .collect();
        assert_eq!(labels, vec!["Positive", "Neutral"]);

        let stats = queries.stats().unwrap();
        assert_eq!((stats.users, stats.turns, stats.attachments), (1, 2, 1));
        assert!(stats.db_size_bytes > 0);
    }

    #[test]
    fn test_turns_keep_raw_labels() {
        let db = make_db();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO conversation_turns (id, conversation_key, sentiment, timestamp)
                    VALUES ('a', '1', NULL, 0);
                 INSERT INTO conversation_turns (id, conversation_key, sentiment, timestamp)
                    VALUES ('b', '1', ' positive ', 0);",
            )
            .map_err(|e| ChatlensError::Storage(e.to_string()))
        })
        .unwrap();

        let rows = AnalyticsQueries::new(db).turns().unwrap();
        assert_eq!(rows[0].sentiment, None);
        assert_eq!(rows[1].sentiment.as_deref(), Some(" positive "));
    }
}
