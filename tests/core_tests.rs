//! End-to-end tests for the fetch pipeline: orchestrator fan-out, cache
//! behavior across cycles, and series building, all against an in-memory
//! archive fake.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};

use trendlens::cache::FetchCache;
use trendlens::clients::{ArchiveError, ArchiveFetcher};
use trendlens::models::{
    Account, GlobalStats, MonthlyOccurrence, MonthlyTotal, SearchQuery, TweetRecord,
};
use trendlens::services::{FetchError, FetchOrchestrator, build_series};

fn month(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// In-memory stand-in for the archive backend. Keywords listed in `failing`
/// error on every call; everything else serves canned rows and counts how
/// often each operation was hit.
#[derive(Default)]
struct FakeArchive {
    failing: HashSet<String>,
    occurrences: HashMap<String, Vec<(NaiveDate, u64)>>,
    totals: Vec<(NaiveDate, u64)>,
    tweet_calls: AtomicUsize,
    occurrence_calls: AtomicUsize,
    total_calls: AtomicUsize,
}

impl FakeArchive {
    fn failing_for(keywords: &[&str]) -> Self {
        Self {
            failing: keywords.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ArchiveFetcher for FakeArchive {
    async fn search_tweets(
        &self,
        keyword: &str,
        start_date: NaiveDate,
        _end_date: NaiveDate,
        _limit: u32,
    ) -> Result<Vec<TweetRecord>, ArchiveError> {
        self.tweet_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(keyword) {
            return Err(ArchiveError::RemoteUnavailable("backend down".to_string()));
        }
        let created_at = Utc
            .from_utc_datetime(&start_date.and_hms_opt(12, 0, 0).unwrap());
        Ok(vec![TweetRecord {
            tweet_id: 1,
            username: format!("user_{keyword}"),
            avatar_url: None,
            created_at,
            full_text: format!("something about {keyword}"),
            matched_keyword: keyword.to_string(),
        }])
    }

    async fn word_occurrences(
        &self,
        keyword: &str,
        _account_ids: &[String],
    ) -> Result<Vec<MonthlyOccurrence>, ArchiveError> {
        self.occurrence_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(keyword) {
            return Err(ArchiveError::RemoteUnavailable("backend down".to_string()));
        }
        Ok(self
            .occurrences
            .get(keyword)
            .map(|rows| {
                rows.iter()
                    .map(|&(m, count)| MonthlyOccurrence {
                        keyword: keyword.to_string(),
                        month: m,
                        word_count: count,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn monthly_tweet_totals(&self) -> Result<Vec<MonthlyTotal>, ArchiveError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .totals
            .iter()
            .map(|&(m, tweet_count)| MonthlyTotal {
                month: m,
                tweet_count,
            })
            .collect())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ArchiveError> {
        Ok(vec![Account {
            account_id: "16884623".to_string(),
            username: "exgenesis".to_string(),
        }])
    }

    async fn global_stats(&self) -> Result<Option<GlobalStats>, ArchiveError> {
        Ok(None)
    }
}

fn orchestrator(archive: Arc<FakeArchive>) -> FetchOrchestrator {
    let cache = Arc::new(FetchCache::new(Duration::from_secs(3600)));
    FetchOrchestrator::new(archive, cache, 100)
}

fn query(keywords: &[&str], start: NaiveDate, end: NaiveDate) -> SearchQuery {
    SearchQuery::new(
        keywords.iter().map(ToString::to_string),
        start,
        end,
        vec![],
    )
    .unwrap()
}

#[tokio::test]
async fn test_partial_failure_preserves_surviving_keywords() {
    let archive = Arc::new(FakeArchive {
        occurrences: HashMap::from([
            ("alpha".to_string(), vec![(month(2020, 1), 4)]),
            ("gamma".to_string(), vec![(month(2020, 1), 2)]),
        ]),
        ..FakeArchive::failing_for(&["beta"])
    });
    let orch = orchestrator(Arc::clone(&archive));
    let q = query(&["alpha", "beta", "gamma"], date(2020, 1, 1), date(2020, 12, 31));

    let outcome = orch.fetch_all(&q).await.unwrap();

    assert_eq!(outcome.tweets.len(), 2);
    assert!(outcome.tweets.iter().all(|t| t.matched_keyword != "beta"));

    assert!(!outcome.series_for("alpha").unwrap().months.is_empty());
    assert!(outcome.series_for("beta").unwrap().months.is_empty());
    assert!(!outcome.series_for("gamma").unwrap().months.is_empty());

    let failed_keywords: HashSet<&str> = outcome
        .failures
        .iter()
        .map(|f| f.keyword.as_str())
        .collect();
    assert_eq!(failed_keywords, HashSet::from(["beta"]));
    // Both the tweet leg and the occurrence leg failed for beta.
    assert_eq!(outcome.failures.len(), 2);
}

#[tokio::test]
async fn test_total_failure_surfaces_batch_error() {
    let archive = Arc::new(FakeArchive::failing_for(&["alpha", "beta"]));
    let orch = orchestrator(archive);
    let q = query(&["alpha", "beta"], date(2020, 1, 1), date(2020, 12, 31));

    let err = orch.fetch_all(&q).await.unwrap_err();
    let FetchError::BatchFailed { failures } = err;
    assert_eq!(failures.len(), 4);
}

#[tokio::test]
async fn test_empty_keywords_issue_no_remote_calls() {
    let archive = Arc::new(FakeArchive::default());
    let orch = orchestrator(Arc::clone(&archive));
    let q = query(&[], date(2020, 1, 1), date(2020, 12, 31));

    let outcome = orch.fetch_all(&q).await.unwrap();

    assert!(outcome.tweets.is_empty());
    assert!(outcome.occurrences.is_empty());
    assert!(outcome.failures.is_empty());
    assert_eq!(archive.tweet_calls.load(Ordering::SeqCst), 0);
    assert_eq!(archive.occurrence_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_repeated_cycle_served_from_cache() {
    let archive = Arc::new(FakeArchive {
        occurrences: HashMap::from([("tpot".to_string(), vec![(month(2020, 1), 5)])]),
        ..FakeArchive::default()
    });
    let orch = orchestrator(Arc::clone(&archive));
    let q = query(&["tpot"], date(2020, 1, 1), date(2020, 12, 31));

    orch.fetch_all(&q).await.unwrap();
    orch.fetch_all(&q).await.unwrap();

    assert_eq!(archive.tweet_calls.load(Ordering::SeqCst), 1);
    assert_eq!(archive.occurrence_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_occurrence_cache_survives_date_range_narrowing() {
    let archive = Arc::new(FakeArchive {
        occurrences: HashMap::from([(
            "tpot".to_string(),
            vec![(month(2020, 1), 5), (month(2020, 6), 3), (month(2021, 1), 9)],
        )]),
        ..FakeArchive::default()
    });
    let orch = orchestrator(Arc::clone(&archive));

    let wide = query(&["tpot"], date(2020, 1, 1), date(2021, 12, 31));
    let narrow = query(&["tpot"], date(2020, 1, 1), date(2020, 12, 31));

    let wide_outcome = orch.fetch_all(&wide).await.unwrap();
    let narrow_outcome = orch.fetch_all(&narrow).await.unwrap();

    assert_eq!(wide_outcome.series_for("tpot").unwrap().months.len(), 3);
    assert_eq!(narrow_outcome.series_for("tpot").unwrap().months.len(), 2);
    // The date range is not part of the occurrence key: one remote call
    // served both ranges. Tweet search keys on the range, so it refetched.
    assert_eq!(archive.occurrence_calls.load(Ordering::SeqCst), 1);
    assert_eq!(archive.tweet_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_selection_window_reuses_tweet_cache() {
    let archive = Arc::new(FakeArchive::default());
    let orch = orchestrator(Arc::clone(&archive));
    let q = query(&["tpot"], date(2020, 1, 1), date(2020, 12, 31));

    orch.fetch_all(&q).await.unwrap();

    // Same window as the cycle: cache hit.
    orch.tweets_for_selection("tpot", date(2020, 1, 1), date(2020, 12, 31))
        .await
        .unwrap();
    assert_eq!(archive.tweet_calls.load(Ordering::SeqCst), 1);

    // A narrowed selection is a new key and fetches once.
    orch.tweets_for_selection("tpot", date(2020, 3, 1), date(2020, 4, 30))
        .await
        .unwrap();
    assert_eq!(archive.tweet_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_monthly_totals_cached_globally() {
    let archive = Arc::new(FakeArchive {
        totals: vec![(month(2020, 1), 1000)],
        ..FakeArchive::default()
    });
    let orch = orchestrator(Arc::clone(&archive));

    orch.monthly_totals().await.unwrap();
    orch.monthly_totals().await.unwrap();

    assert_eq!(archive.total_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_full_pipeline_normalized_scenario() {
    let counts = [5u64, 3, 0, 8, 2, 1];
    let months: Vec<_> = (1..=6).map(|m| month(2020, m)).collect();
    let archive = Arc::new(FakeArchive {
        occurrences: HashMap::from([(
            "tpot".to_string(),
            months.iter().copied().zip(counts).collect(),
        )]),
        totals: months.iter().map(|&m| (m, 1000)).collect(),
        ..FakeArchive::default()
    });
    let orch = orchestrator(Arc::clone(&archive));
    let q = query(&["tpot"], date(2020, 1, 1), date(2020, 12, 31));

    let outcome = orch.fetch_all(&q).await.unwrap();
    let totals = orch.monthly_totals().await.unwrap();
    let points = build_series(&outcome.occurrences, &totals, true);

    let values: Vec<f64> = points.iter().map(|p| p.normalized_count).collect();
    assert_eq!(values, vec![5.0, 3.0, 0.0, 8.0, 2.0, 1.0]);
}
