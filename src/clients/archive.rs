//! Client for the remote tweet-archive backend (a PostgREST-style API with
//! RPC endpoints for the heavy queries). All four query shapes the dashboard
//! needs live here; callers never see the wire format.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ArchiveConfig;
use crate::models::{
    Account, GlobalStats, MonthlyOccurrence, MonthlyTotal, TweetRecord,
};

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Transport failure, backend error status, or timeout.
    #[error("archive unavailable: {0}")]
    RemoteUnavailable(String),

    /// The backend answered but the payload doesn't match the expected shape.
    #[error("malformed archive response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ArchiveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::RemoteUnavailable(err.to_string())
        }
    }
}

/// The remote operations the orchestrator fans out over. Implemented by
/// [`ArchiveClient`] for the real backend and by in-memory fakes in tests.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Tweets matching `keyword` within the inclusive date range, capped at
    /// `limit` rows. Filtering happens on the backend.
    async fn search_tweets(
        &self,
        keyword: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        limit: u32,
    ) -> Result<Vec<TweetRecord>, ArchiveError>;

    /// Monthly occurrence counts for `keyword`, across ALL months the archive
    /// holds; callers narrow the range locally. An empty `account_ids` means
    /// no account filter.
    async fn word_occurrences(
        &self,
        keyword: &str,
        account_ids: &[String],
    ) -> Result<Vec<MonthlyOccurrence>, ArchiveError>;

    /// Archive-wide tweet counts per month, keyword-independent.
    async fn monthly_tweet_totals(&self) -> Result<Vec<MonthlyTotal>, ArchiveError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, ArchiveError>;

    /// Latest archive summary row, if the backend has one.
    async fn global_stats(&self) -> Result<Option<GlobalStats>, ArchiveError>;
}

#[derive(Serialize)]
struct SearchTweetsParams<'a> {
    search_query: &'a str,
    since_date: String,
    until_date: String,
    limit_: u32,
}

#[derive(Serialize)]
struct WordOccurrencesParams<'a> {
    search_word: &'a str,
    user_ids: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct TweetRow {
    tweet_id: i64,
    username: String,
    avatar_media_url: Option<String>,
    created_at: String,
    full_text: String,
}

#[derive(Debug, Deserialize)]
struct OccurrenceRow {
    month: String,
    word_count: u64,
}

#[derive(Debug, Deserialize)]
struct TotalRow {
    month: String,
    tweet_count: u64,
}

#[derive(Debug, Deserialize)]
struct StatsRow {
    total_tweets: u64,
    total_accounts: u64,
    last_updated: Option<String>,
}

#[derive(Clone)]
pub struct ArchiveClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ArchiveClient {
    pub fn new(config: &ArchiveConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn rpc<P: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        function: &str,
        params: &P,
    ) -> Result<T, ArchiveError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let mut request = self.client.post(&url).json(params);
        if !self.api_key.is_empty() {
            request = request
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::RemoteUnavailable(format!(
                "{function}: {status} - {body}"
            )));
        }

        Ok(response.json().await?)
    }

    async fn select<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ArchiveError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let mut request = self.client.get(&url).query(query);
        if !self.api_key.is_empty() {
            request = request
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::RemoteUnavailable(format!(
                "{table}: {status} - {body}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ArchiveFetcher for ArchiveClient {
    async fn search_tweets(
        &self,
        keyword: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        limit: u32,
    ) -> Result<Vec<TweetRecord>, ArchiveError> {
        // The backend's full-text search expects spaces joined with '+'.
        let search_query = keyword.replace(' ', "+");
        let rows: Vec<TweetRow> = self
            .rpc(
                "search_tweets",
                &SearchTweetsParams {
                    search_query: &search_query,
                    since_date: start_date.to_string(),
                    until_date: end_date.to_string(),
                    limit_: limit,
                },
            )
            .await?;

        rows.into_iter()
            .map(|row| {
                let created_at = parse_timestamp(&row.created_at)?;
                Ok(TweetRecord {
                    tweet_id: row.tweet_id,
                    username: row.username,
                    avatar_url: row.avatar_media_url,
                    created_at,
                    full_text: row.full_text,
                    matched_keyword: keyword.to_string(),
                })
            })
            .collect()
    }

    async fn word_occurrences(
        &self,
        keyword: &str,
        account_ids: &[String],
    ) -> Result<Vec<MonthlyOccurrence>, ArchiveError> {
        let rows: Vec<OccurrenceRow> = self
            .rpc(
                "word_occurrences",
                &WordOccurrencesParams {
                    search_word: keyword,
                    user_ids: if account_ids.is_empty() {
                        None
                    } else {
                        Some(account_ids)
                    },
                },
            )
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(MonthlyOccurrence {
                    keyword: keyword.to_string(),
                    month: parse_month(&row.month)?,
                    word_count: row.word_count,
                })
            })
            .collect()
    }

    async fn monthly_tweet_totals(&self) -> Result<Vec<MonthlyTotal>, ArchiveError> {
        let rows: Vec<TotalRow> = self
            .rpc("get_monthly_tweet_counts", &serde_json::json!({}))
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(MonthlyTotal {
                    month: parse_month(&row.month)?,
                    tweet_count: row.tweet_count,
                })
            })
            .collect()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ArchiveError> {
        self.select("account", &[("select", "account_id,username")])
            .await
    }

    async fn global_stats(&self) -> Result<Option<GlobalStats>, ArchiveError> {
        let rows: Vec<StatsRow> = self
            .select(
                "global_activity_summary",
                &[
                    ("select", "*"),
                    ("order", "last_updated.desc"),
                    ("limit", "1"),
                ],
            )
            .await?;

        Ok(rows.into_iter().next().map(|row| GlobalStats {
            total_tweets: row.total_tweets,
            total_accounts: row.total_accounts,
            last_updated: row.last_updated,
        }))
    }
}

/// Parses a month column into the first day of that month. The backend emits
/// `YYYY-MM` from the occurrence RPC but a full timestamp from the totals
/// view, so both are accepted.
fn parse_month(raw: &str) -> Result<NaiveDate, ArchiveError> {
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Ok(date);
    }
    let prefix = raw.get(..10).unwrap_or(raw);
    if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
        return Ok(date.with_day(1).unwrap_or(date));
    }
    Err(ArchiveError::MalformedResponse(format!(
        "unparseable month: {raw}"
    )))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ArchiveError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ArchiveError::MalformedResponse(format!("unparseable timestamp: {raw}")))
}
