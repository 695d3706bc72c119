//! The async record store seam.
//!
//! `RecordStore` is what the pipeline and the analytics engine talk to.
//! `SqliteRecordStore` adapts the synchronous repositories by running each
//! call on the blocking thread pool.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use chatlens_core::error::{ChatlensError, Result};
use chatlens_core::types::{Attachment, ConversationKey, ConversationTurn, User};

use crate::db::Database;
use crate::queries::{AnalyticsQueries, DbStats, TurnRow, UserRow};
use crate::repository::{AttachmentRepository, TurnRepository, UserRepository};

/// Durable storage for users, turns and attachments.
///
/// Implementations must be safe for concurrent use from many tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a user. Returns `false` if one already exists for the key.
    async fn insert_user(&self, user: &User) -> Result<bool>;

    async fn find_user_by_key(&self, key: &ConversationKey) -> Result<Option<User>>;

    /// Record a phone number for a user that has none yet.
    ///
    /// Returns `false` if the user is missing or already has a number.
    async fn update_user_phone(&self, key: &ConversationKey, phone: &str) -> Result<bool>;

    async fn insert_turn(&self, turn: &ConversationTurn) -> Result<()>;

    async fn insert_attachment(&self, attachment: &Attachment) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<UserRow>>;

    async fn list_turns(&self) -> Result<Vec<TurnRow>>;

    /// Most recent turns of one conversation, oldest first.
    async fn turns_for(&self, key: &ConversationKey, limit: u64) -> Result<Vec<ConversationTurn>>;

    async fn attachments_for(&self, key: &ConversationKey, limit: u64) -> Result<Vec<Attachment>>;

    async fn stats(&self) -> Result<DbStats>;

    /// Refuse further work. Idempotent.
    async fn close(&self);
}

/// SQLite-backed `RecordStore`.
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Arc<Database>,
    users: UserRepository,
    turns: TurnRepository,
    attachments: AttachmentRepository,
    queries: AnalyticsQueries,
}

impl SqliteRecordStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            users: UserRepository::new(Arc::clone(&db)),
            turns: TurnRepository::new(Arc::clone(&db)),
            attachments: AttachmentRepository::new(Arc::clone(&db)),
            queries: AnalyticsQueries::new(Arc::clone(&db)),
            db,
        }
    }

    /// Store over a fresh in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(Database::in_memory()?)))
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || f(&this))
            .await
            .map_err(|e| ChatlensError::Storage(format!("Storage task failed: {}", e)))?
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert_user(&self, user: &User) -> Result<bool> {
        let user = user.clone();
        let inserted = self.blocking(move |s| s.users.insert(&user)).await?;
        if inserted {
            debug!("Registered new user");
        }
        Ok(inserted)
    }

    async fn find_user_by_key(&self, key: &ConversationKey) -> Result<Option<User>> {
        let key = key.clone();
        self.blocking(move |s| s.users.find_by_key(&key)).await
    }

    async fn update_user_phone(&self, key: &ConversationKey, phone: &str) -> Result<bool> {
        let key = key.clone();
        let phone = phone.to_string();
        self.blocking(move |s| s.users.set_phone_if_unset(&key, &phone))
            .await
    }

    async fn insert_turn(&self, turn: &ConversationTurn) -> Result<()> {
        let turn = turn.clone();
        self.blocking(move |s| s.turns.save(&turn)).await
    }

    async fn insert_attachment(&self, attachment: &Attachment) -> Result<()> {
        let attachment = attachment.clone();
        self.blocking(move |s| s.attachments.save(&attachment)).await
    }

    async fn list_users(&self) -> Result<Vec<UserRow>> {
        self.blocking(|s| s.queries.users()).await
    }

    async fn list_turns(&self) -> Result<Vec<TurnRow>> {
        self.blocking(|s| s.queries.turns()).await
    }

    async fn turns_for(&self, key: &ConversationKey, limit: u64) -> Result<Vec<ConversationTurn>> {
        let key = key.clone();
        self.blocking(move |s| s.turns.find_by_conversation(&key, limit))
            .await
    }

    async fn attachments_for(&self, key: &ConversationKey, limit: u64) -> Result<Vec<Attachment>> {
        let key = key.clone();
        self.blocking(move |s| s.attachments.find_by_conversation(&key, limit))
            .await
    }

    async fn stats(&self) -> Result<DbStats> {
        self.blocking(|s| s.queries.stats()).await
    }

    async fn close(&self) {
        if !self.db.is_closed() {
            self.db.close();
            info!("Record store closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlens_core::types::SentimentLabel;

    fn key(k: &str) -> ConversationKey {
        ConversationKey::new(k)
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let store = SqliteRecordStore::in_memory().unwrap();

        assert!(store
            .insert_user(&User::new(key("9"), Some("Bo".into()), Some("bo".into())))
            .await
            .unwrap());
        store
            .insert_turn(&ConversationTurn::new(key("9"), "hi", "hello", SentimentLabel::Neutral))
            .await
            .unwrap();
        store
            .insert_attachment(&Attachment::new(key("9"), "f", "image/jpeg", "desc"))
            .await
            .unwrap();

        assert_eq!(store.list_users().await.unwrap().len(), 1);
        assert_eq!(store.list_turns().await.unwrap().len(), 1);
        assert_eq!(store.turns_for(&key("9"), 10).await.unwrap()[0].reply_text, "hello");
        assert_eq!(store.attachments_for(&key("9"), 10).await.unwrap()[0].file_ref, "f");

        let stats = store.stats().await.unwrap();
        assert_eq!((stats.users, stats.turns, stats.attachments), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_update_phone_once() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.insert_user(&User::new(key("1"), None, None)).await.unwrap();

        assert!(store.update_user_phone(&key("1"), "+100").await.unwrap());
        assert!(!store.update_user_phone(&key("1"), "+200").await.unwrap());

        let user = store.find_user_by_key(&key("1")).await.unwrap().unwrap();
        assert_eq!(user.phone_number.as_deref(), Some("+100"));
    }

    #[tokio::test]
    async fn test_closed_store_rejects_writes() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.close().await;
        store.close().await;

        let result = store
            .insert_turn(&ConversationTurn::new(key("1"), "x", "y", SentimentLabel::Neutral))
            .await;
        assert!(matches!(result, Err(ChatlensError::ShuttingDown)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(
            &dir.path().join("store.db"),
            4,
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let store = Arc::new(SqliteRecordStore::new(Arc::new(db)));

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let turn = ConversationTurn::new(
                    ConversationKey::from(i as i64 % 3),
                    format!("msg {}", i),
                    "ok",
                    SentimentLabel::Neutral,
                );
                store.insert_turn(&turn).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.list_turns().await.unwrap().len(), 20);
    }
}
