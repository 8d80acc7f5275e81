//! Concurrent fetch orchestration: one fetch cycle fans out per keyword,
//! funnels every remote call through the TTL cache, and assembles results by
//! keyword regardless of completion order. A keyword whose fetch fails gets
//! an empty series plus an entry in the failure report; the batch as a whole
//! fails only when every task failed.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{FetchCache, OccurrenceKey, TweetSearchKey};
use crate::clients::{ArchiveError, ArchiveFetcher};
use crate::models::{
    Account, GlobalStats, KeywordSeries, MonthlyOccurrence, MonthlyTotal, SearchQuery, TweetRecord,
};

/// Which remote operation a per-keyword task was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOperation {
    TweetSearch,
    WordOccurrences,
}

impl std::fmt::Display for FetchOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TweetSearch => write!(f, "tweet search"),
            Self::WordOccurrences => write!(f, "word occurrences"),
        }
    }
}

/// One failed per-keyword task, kept for the caller's notice rendering.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub keyword: String,
    pub operation: FetchOperation,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Every task in the batch failed; partial results were impossible.
    #[error("all {} keyword fetches failed", .failures.len())]
    BatchFailed { failures: Vec<FetchFailure> },
}

/// Result of one fetch cycle. `occurrences` preserves the query's keyword
/// order and every keyword appears exactly once, failed ones with an empty
/// series.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub tweets: Vec<TweetRecord>,
    pub occurrences: Vec<KeywordSeries>,
    pub failures: Vec<FetchFailure>,
}

impl FetchOutcome {
    /// Series for one keyword, if the query contained it.
    #[must_use]
    pub fn series_for(&self, keyword: &str) -> Option<&KeywordSeries> {
        self.occurrences.iter().find(|s| s.keyword == keyword)
    }
}

/// Owns the client and cache for the life of the process; all dashboard
/// fetches go through here.
pub struct FetchOrchestrator {
    fetcher: Arc<dyn ArchiveFetcher>,
    cache: Arc<FetchCache>,
    fetch_limit: u32,
}

impl FetchOrchestrator {
    #[must_use]
    pub fn new(fetcher: Arc<dyn ArchiveFetcher>, cache: Arc<FetchCache>, fetch_limit: u32) -> Self {
        Self {
            fetcher,
            cache,
            fetch_limit,
        }
    }

    /// Runs both fan-outs for `query` and waits for every task.
    ///
    /// Tweet searches and occurrence lookups are independent task sets; each
    /// keyword gets one of each, and each task does its own cache lookup, so
    /// a warm cache turns a task into a map read. An empty keyword list
    /// returns immediately without touching the backend.
    pub async fn fetch_all(&self, query: &SearchQuery) -> Result<FetchOutcome, FetchError> {
        if query.is_empty() {
            debug!("empty keyword list, skipping fetch");
            return Ok(FetchOutcome::default());
        }

        let started = Instant::now();

        let tweet_tasks = query.keywords.iter().map(|keyword| async move {
            let result = self
                .cached_tweets(keyword, query.start_date, query.end_date)
                .await;
            (keyword.as_str(), result)
        });

        let occurrence_tasks = query.keywords.iter().map(|keyword| async move {
            let result = self.cached_occurrences(keyword, &query.account_ids).await;
            (keyword.as_str(), result)
        });

        let (tweet_results, occurrence_results) =
            futures::join!(join_all(tweet_tasks), join_all(occurrence_tasks));

        let task_count = tweet_results.len() + occurrence_results.len();
        let mut outcome = FetchOutcome::default();

        for (keyword, result) in tweet_results {
            match result {
                Ok(tweets) => outcome.tweets.extend(tweets),
                Err(e) => {
                    warn!(keyword, error = %e, "tweet search failed");
                    outcome.failures.push(FetchFailure {
                        keyword: keyword.to_string(),
                        operation: FetchOperation::TweetSearch,
                        message: e.to_string(),
                    });
                }
            }
        }

        for (keyword, result) in occurrence_results {
            let months = match result {
                Ok(months) => filter_to_range(months, query.start_date, query.end_date),
                Err(e) => {
                    warn!(keyword, error = %e, "occurrence lookup failed");
                    outcome.failures.push(FetchFailure {
                        keyword: keyword.to_string(),
                        operation: FetchOperation::WordOccurrences,
                        message: e.to_string(),
                    });
                    Vec::new()
                }
            };
            outcome.occurrences.push(KeywordSeries {
                keyword: keyword.to_string(),
                months,
            });
        }

        if outcome.failures.len() == task_count {
            return Err(FetchError::BatchFailed {
                failures: outcome.failures,
            });
        }

        info!(
            keywords = query.keywords.len(),
            tweets = outcome.tweets.len(),
            failures = outcome.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetch cycle complete"
        );

        Ok(outcome)
    }

    /// Tweets for a chart-selection window. Goes through the same tweet
    /// cache as the main cycle, so narrowing a selection after a fetch only
    /// hits the backend for windows not seen before.
    pub async fn tweets_for_selection(
        &self,
        keyword: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<TweetRecord>, ArchiveError> {
        self.cached_tweets(keyword, start_date, end_date).await
    }

    pub async fn monthly_totals(&self) -> Result<Vec<MonthlyTotal>, ArchiveError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.cache
            .totals
            .get_or_compute((), || async move { fetcher.monthly_tweet_totals().await })
            .await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, ArchiveError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.cache
            .accounts
            .get_or_compute((), || async move { fetcher.list_accounts().await })
            .await
    }

    pub async fn global_stats(&self) -> Result<Option<GlobalStats>, ArchiveError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.cache
            .stats
            .get_or_compute((), || async move { fetcher.global_stats().await })
            .await
    }

    async fn cached_tweets(
        &self,
        keyword: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<TweetRecord>, ArchiveError> {
        let key = TweetSearchKey {
            keyword: keyword.to_string(),
            start_date,
            end_date,
            limit: self.fetch_limit,
        };
        let fetcher = Arc::clone(&self.fetcher);
        let limit = self.fetch_limit;
        self.cache
            .tweets
            .get_or_compute(key, || async move {
                fetcher
                    .search_tweets(keyword, start_date, end_date, limit)
                    .await
            })
            .await
    }

    async fn cached_occurrences(
        &self,
        keyword: &str,
        account_ids: &[String],
    ) -> Result<Vec<MonthlyOccurrence>, ArchiveError> {
        let key = OccurrenceKey::new(keyword, account_ids);
        let fetcher = Arc::clone(&self.fetcher);
        let ids = key.account_ids().to_vec();
        self.cache
            .occurrences
            .get_or_compute(key, || async move {
                fetcher.word_occurrences(keyword, &ids).await
            })
            .await
    }
}

/// Narrows an all-months payload to the query range and sorts ascending so
/// downstream joins see months in order.
fn filter_to_range(
    mut months: Vec<MonthlyOccurrence>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<MonthlyOccurrence> {
    months.retain(|m| m.month >= start_date && m.month <= end_date);
    months.sort_by_key(|m| m.month);
    months
}
