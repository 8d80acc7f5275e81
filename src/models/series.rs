use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Monthly occurrence count for one keyword. `month` is always the first day
/// of the month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyOccurrence {
    pub keyword: String,
    pub month: NaiveDate,
    pub word_count: u64,
}

/// Global archive-wide tweet count for one month, keyword-independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub month: NaiveDate,
    pub tweet_count: u64,
}

/// One keyword's occurrence series, kept in the caller's keyword order so the
/// chart legend matches the input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSeries {
    pub keyword: String,
    pub months: Vec<MonthlyOccurrence>,
}

/// One chartable point: the occurrence count joined against the global total
/// for the same month. `normalized_count` is occurrences per 1000 tweets when
/// normalization is on, otherwise the raw count.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedPoint {
    pub keyword: String,
    pub month: NaiveDate,
    pub raw_count: u64,
    pub tweet_count: u64,
    pub normalized_count: f64,
}

/// Archive-wide summary row, rendered in the dashboard header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_tweets: u64,
    pub total_accounts: u64,
    pub last_updated: Option<String>,
}

/// A selectable archive account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub username: String,
}
