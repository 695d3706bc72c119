//! Analytics over the record store.
//!
//! Reads are taken without any lock and may miss writes that are still in
//! flight. Aggregation itself is pure and lives in free functions so it can
//! be tested without a store.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use chatlens_core::config::AnalyticsConfig;
use chatlens_core::types::{ConversationKey, SentimentLabel};
use chatlens_storage::{RecordStore, TurnRow};

use crate::dashboard;
use crate::error::InsightError;
use crate::types::{DashboardArtifact, DashboardStats, TextSummary, Totals, UNLABELED_BUCKET};

/// Produces summaries and dashboards from stored records.
pub struct AnalyticsEngine {
    store: Arc<dyn RecordStore>,
    config: AnalyticsConfig,
    output_path: PathBuf,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn RecordStore>, config: AnalyticsConfig, output_path: PathBuf) -> Self {
        Self {
            store,
            config,
            output_path,
        }
    }

    /// Where `render_dashboard` writes its image.
    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Total users, total turns and turn counts per sentiment bucket.
    pub async fn summarize(&self) -> Result<TextSummary, InsightError> {
        let users = self.store.list_users().await?;
        let turns = self.store.list_turns().await?;
        let attachments = self.store.stats().await?.attachments;

        let summary = TextSummary {
            totals: Totals {
                users: users.len() as u64,
                messages: turns.len() as u64,
                attachments,
            },
            breakdown: sentiment_breakdown(&turns),
        };

        debug!(
            users = summary.totals.users,
            messages = summary.totals.messages,
            attachments = summary.totals.attachments,
            unclassified = summary.count_for(SentimentLabel::Error.as_str()),
            buckets = summary.breakdown.len(),
            "Summary computed"
        );
        Ok(summary)
    }

    /// Render the composite dashboard and overwrite the output image.
    pub async fn render_dashboard(&self) -> Result<DashboardArtifact, InsightError> {
        let users = self.store.list_users().await?;
        let turns = self.store.list_turns().await?;
        let attachments = self.store.stats().await?.attachments;

        let stats = DashboardStats {
            totals: Totals {
                users: users.len() as u64,
                messages: turns.len() as u64,
                attachments,
            },
            breakdown: sentiment_breakdown(&turns),
            daily_volume: daily_volume(&turns),
            top_conversations: top_conversations(&turns, self.config.top_n),
        };

        let (width, height) = (self.config.width, self.config.height);
        let path = self.output_path.clone();
        let render_stats = stats.clone();
        let write_path = path.clone();

        tokio::task::spawn_blocking(move || {
            let img = dashboard::render(&render_stats, width, height)?;
            dashboard::write_png(&img, &write_path)
        })
        .await
        .map_err(|e| InsightError::Render(format!("render task failed: {}", e)))??;

        info!(
            path = %path.display(),
            messages = stats.totals.messages,
            days = stats.daily_volume.len(),
            "Dashboard rendered"
        );

        Ok(DashboardArtifact {
            path,
            width,
            height,
            stats,
        })
    }
}

/// Bucket name for a stored label: canonical label text when it parses,
/// the trimmed raw text when it does not, `Unlabeled` when missing.
fn bucket_for(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") => UNLABELED_BUCKET.to_string(),
        Some(label) => match label.parse::<SentimentLabel>() {
            Ok(parsed) => parsed.as_str().to_string(),
            Err(_) => label.to_string(),
        },
    }
}

/// Turn counts grouped by sentiment bucket, largest first, ties by name.
pub fn sentiment_breakdown(turns: &[TurnRow]) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for turn in turns {
        *counts.entry(bucket_for(turn.sentiment.as_deref())).or_insert(0) += 1;
    }

    let mut breakdown: Vec<(String, u64)> = counts.into_iter().collect();
    breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    breakdown
}

/// Turns per UTC calendar date, ascending. Dates with no turns are omitted.
pub fn daily_volume(turns: &[TurnRow]) -> Vec<(NaiveDate, u64)> {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for turn in turns {
        *by_day.entry(turn.timestamp.date_naive()).or_insert(0) += 1;
    }
    by_day.into_iter().collect()
}

/// The `n` conversations with the most turns.
///
/// Equal counts keep the order in which keys were first seen in `turns`;
/// callers should not rely on that order.
pub fn top_conversations(turns: &[TurnRow], n: usize) -> Vec<(ConversationKey, u64)> {
    let mut order: Vec<ConversationKey> = Vec::new();
    let mut counts: HashMap<&ConversationKey, u64> = HashMap::new();
    for turn in turns {
        let count = counts.entry(&turn.conversation_key).or_insert(0);
        if *count == 0 {
            order.push(turn.conversation_key.clone());
        }
        *count += 1;
    }

    let mut ranked: Vec<(ConversationKey, u64)> = order
        .into_iter()
        .map(|key| {
            let count = counts.get(&key).copied().unwrap_or(0);
            (key, count)
        })
        .collect();
    // Stable sort keeps first-seen order among ties.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlens_core::types::{Attachment, ConversationTurn, User};
    use chatlens_storage::SqliteRecordStore;
    use chrono::{Duration, TimeZone, Utc};

    fn row(key: &str, label: Option<&str>, day: u32) -> TurnRow {
        TurnRow {
            conversation_key: ConversationKey::new(key),
            sentiment: label.map(String::from),
            timestamp: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
        }
    }

    fn engine(store: Arc<dyn RecordStore>, dir: &std::path::Path) -> AnalyticsEngine {
        AnalyticsEngine::new(store, AnalyticsConfig::default(), dir.join("dashboard.png"))
    }

    #[test]
    fn test_breakdown_counts_and_order() {
        let turns = vec![
            row("1", Some("Positive"), 1),
            row("1", Some("Negative"), 1),
            row("1", Some("Positive"), 2),
        ];
        assert_eq!(
            sentiment_breakdown(&turns),
            vec![("Positive".to_string(), 2), ("Negative".to_string(), 1)]
        );
    }

    #[test]
    fn test_breakdown_tolerates_missing_and_unknown_labels() {
        let turns = vec![
            row("1", None, 1),
            row("1", Some(""), 1),
            row("1", Some(" positive "), 1),
            row("1", Some("Elated"), 1),
        ];
        let breakdown = sentiment_breakdown(&turns);
        assert!(breakdown.contains(&(UNLABELED_BUCKET.to_string(), 2)));
        assert!(breakdown.contains(&("Positive".to_string(), 1)));
        assert!(breakdown.contains(&("Elated".to_string(), 1)));
    }

    #[test]
    fn test_breakdown_ties_sorted_by_name() {
        let turns = vec![row("1", Some("Neutral"), 1), row("1", Some("Error"), 1)];
        let names: Vec<_> = sentiment_breakdown(&turns).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Error", "Neutral"]);
    }

    #[test]
    fn test_daily_volume_three_dates() {
        let turns = vec![
            row("1", Some("Positive"), 3),
            row("2", Some("Positive"), 1),
            row("1", Some("Neutral"), 1),
            row("3", Some("Negative"), 2),
            row("1", Some("Negative"), 3),
        ];
        let daily = daily_volume(&turns);
        assert_eq!(daily.len(), 3);
        assert_eq!(daily.iter().map(|(_, n)| n).sum::<u64>(), turns.len() as u64);
        assert!(daily.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(daily[0], (NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 2));
    }

    #[test]
    fn test_daily_volume_uses_utc_date() {
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap();
        let turns = vec![
            TurnRow {
                conversation_key: ConversationKey::new("1"),
                sentiment: None,
                timestamp: late,
            },
            TurnRow {
                conversation_key: ConversationKey::new("1"),
                sentiment: None,
                timestamp: late + Duration::seconds(2),
            },
        ];
        assert_eq!(daily_volume(&turns).len(), 2);
    }

    #[test]
    fn test_top_conversations_ranked_and_truncated() {
        let mut turns = Vec::new();
        for (key, n) in [("a", 1), ("b", 4), ("c", 2), ("d", 3), ("e", 6), ("f", 5)] {
            for _ in 0..n {
                turns.push(row(key, Some("Neutral"), 1));
            }
        }
        let top = top_conversations(&turns, 5);
        let keys: Vec<_> = top.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["e", "f", "b", "d", "c"]);
    }

    #[test]
    fn test_top_conversations_ties_include_all_counts() {
        let turns = vec![row("x", None, 1), row("y", None, 1)];
        let top = top_conversations(&turns, 5);
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|(_, n)| *n == 1));
    }

    #[tokio::test]
    async fn test_summarize_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        let summary = engine(store, dir.path()).summarize().await.unwrap();

        assert_eq!(summary.totals, Totals::default());
        assert!(summary.breakdown.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_counts_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        store.insert_user(&User::new("1".into(), None, None)).await.unwrap();
        store
            .insert_attachment(&Attachment::new("1".into(), "f1", "image/jpeg", "a photo"))
            .await
            .unwrap();
        store
            .insert_turn(&ConversationTurn::new("1".into(), "t", "r", SentimentLabel::Error))
            .await
            .unwrap();

        let engine = engine(store, dir.path());
        let summary = engine.summarize().await.unwrap();
        assert_eq!(
            summary.totals,
            Totals {
                users: 1,
                messages: 1,
                attachments: 1,
            }
        );
        assert_eq!(summary.count_for("Error"), 1);
        assert!(summary.to_text().contains("Total attachments: 1"));

        let artifact = engine.render_dashboard().await.unwrap();
        assert_eq!(artifact.stats.totals.attachments, 1);
        assert_eq!(&artifact.path, engine.output_path());
    }

    #[tokio::test]
    async fn test_summarize_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        store.insert_user(&User::new("1".into(), None, None)).await.unwrap();
        for label in [SentimentLabel::Positive, SentimentLabel::Negative, SentimentLabel::Positive] {
            store
                .insert_turn(&ConversationTurn::new("1".into(), "t", "r", label))
                .await
                .unwrap();
        }

        let summary = engine(store, dir.path()).summarize().await.unwrap();
        assert_eq!(summary.totals.users, 1);
        assert_eq!(summary.totals.messages, 3);
        assert_eq!(
            summary.breakdown,
            vec![("Positive".to_string(), 2), ("Negative".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_render_dashboard_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        let engine = engine(store, dir.path());

        let artifact = engine.render_dashboard().await.unwrap();
        assert!(artifact.path.exists());
        assert!(artifact.stats.daily_volume.is_empty());
        assert!(artifact.stats.top_conversations.is_empty());
    }

    #[tokio::test]
    async fn test_render_dashboard_three_days() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        store.insert_user(&User::new("7".into(), None, None)).await.unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        for (i, day) in [0, 0, 1, 2, 2, 2].iter().enumerate() {
            let mut turn =
                ConversationTurn::new("7".into(), format!("m{}", i), "r", SentimentLabel::Neutral);
            turn.timestamp = base + Duration::days(*day);
            store.insert_turn(&turn).await.unwrap();
        }

        let artifact = engine(store, dir.path()).render_dashboard().await.unwrap();
        let stats = &artifact.stats;
        assert_eq!(stats.daily_volume.len(), 3);
        assert_eq!(stats.daily_volume.iter().map(|(_, n)| n).sum::<u64>(), 6);
        assert_eq!(stats.totals.messages, 6);
        assert_eq!(stats.top_conversations, vec![(ConversationKey::new("7"), 6)]);

        let img = image::open(&artifact.path).unwrap();
        assert_eq!((img.width(), img.height()), (1200, 800));
    }

    #[tokio::test]
    async fn test_closed_store_is_aggregation_fault() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
        store.close().await;

        let result = engine(store, dir.path()).summarize().await;
        assert!(matches!(result, Err(InsightError::Storage(_))));
    }
}
