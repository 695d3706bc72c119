//! chatlens insight crate - sentiment classification and usage analytics.
//!
//! Provides:
//! - A lexical sentiment classifier (no training step, no network)
//! - Text summaries over the record store
//! - A composite PNG dashboard with totals, sentiment, daily volume and
//!   most active conversations

pub mod analytics;
pub mod chart;
pub mod dashboard;
pub mod error;
mod font;
mod lexicon;
pub mod sentiment;
pub mod types;

pub use analytics::AnalyticsEngine;
pub use error::{ClassificationFault, InsightError};
pub use sentiment::SentimentClassifier;
pub use types::{DashboardArtifact, DashboardStats, TextSummary, Totals, UNLABELED_BUCKET};
