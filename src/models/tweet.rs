use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tweet row returned by the archive search. A tweet that matched several
/// keywords appears once per keyword, tagged via `matched_keyword`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetRecord {
    pub tweet_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub full_text: String,
    pub matched_keyword: String,
}

impl TweetRecord {
    /// Canonical web URL for the tweet.
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://twitter.com/i/web/status/{}", self.tweet_id)
    }
}
