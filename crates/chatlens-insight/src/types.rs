use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use chatlens_core::types::ConversationKey;

/// Bucket name for turns stored without a sentiment label.
pub const UNLABELED_BUCKET: &str = "Unlabeled";

/// Aggregate entity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub users: u64,
    pub messages: u64,
    pub attachments: u64,
}

/// Result of `AnalyticsEngine::summarize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextSummary {
    pub totals: Totals,
    /// Turn counts per sentiment bucket, largest first, ties by name.
    pub breakdown: Vec<(String, u64)>,
}

impl TextSummary {
    /// Count for one bucket, zero if absent.
    pub fn count_for(&self, bucket: &str) -> u64 {
        self.breakdown
            .iter()
            .find(|(name, _)| name == bucket)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Plain-text rendering for chat replies.
    pub fn to_text(&self) -> String {
        let mut out = String::from("Analytics Summary\n");
        out.push_str(&format!("Total users: {}\n", self.totals.users));
        out.push_str(&format!("Total messages: {}\n", self.totals.messages));
        out.push_str(&format!("Total attachments: {}\n", self.totals.attachments));
        out.push_str("Sentiment breakdown:\n");
        if self.breakdown.is_empty() {
            out.push_str("  (no messages yet)\n");
        }
        for (label, count) in &self.breakdown {
            out.push_str(&format!("  {}: {}\n", label, count));
        }
        out
    }
}

/// Everything a dashboard shows, computed from one read of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub totals: Totals,
    pub breakdown: Vec<(String, u64)>,
    /// Turns per UTC calendar date, ascending.
    pub daily_volume: Vec<(NaiveDate, u64)>,
    /// Most active conversations by turn count. Order among equal counts
    /// follows the store's read order and is not guaranteed.
    pub top_conversations: Vec<(ConversationKey, u64)>,
}

/// A rendered dashboard and the figures drawn into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardArtifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub stats: DashboardStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text_lists_buckets() {
        let summary = TextSummary {
            totals: Totals {
                users: 2,
                messages: 5,
                attachments: 1,
            },
            breakdown: vec![("Positive".into(), 3), ("Negative".into(), 2)],
        };
        let text = summary.to_text();
        assert!(text.contains("Total users: 2"));
        assert!(text.contains("Total messages: 5"));
        assert!(text.contains("Total attachments: 1"));
        assert!(text.contains("Positive: 3"));
        assert!(text.contains("Negative: 2"));
        assert_eq!(summary.count_for("Positive"), 3);
        assert_eq!(summary.count_for("Neutral"), 0);
    }

    #[test]
    fn test_empty_summary_text() {
        let text = TextSummary::default().to_text();
        assert!(text.contains("Total messages: 0"));
        assert!(text.contains("no messages yet"));
    }
}
