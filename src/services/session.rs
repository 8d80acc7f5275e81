//! Per-dashboard state between fetch cycles: the last executed query, the
//! committed dataset, and a cycle counter that keeps a slow stale cycle from
//! clobbering a newer one.

use crate::models::{KeywordSeries, SearchQuery, TweetRecord};
use crate::services::change::has_changed;

/// Everything one completed fetch cycle produced, kept for rendering until
/// the next cycle commits.
#[derive(Debug)]
pub struct DashboardData {
    pub query: SearchQuery,
    pub tweets: Vec<TweetRecord>,
    pub occurrences: Vec<KeywordSeries>,
}

/// Session state owned by the caller (the UI loop), not by the orchestrator;
/// the previous query is explicit state here rather than an ambient bag.
#[derive(Debug, Default)]
pub struct DashboardSession {
    previous_query: Option<SearchQuery>,
    next_cycle: u64,
    committed_cycle: u64,
    data: Option<DashboardData>,
}

impl DashboardSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `query` warrants a fresh fetch cycle: the inputs changed, or
    /// nothing has been fetched yet.
    #[must_use]
    pub fn needs_fetch(&self, query: &SearchQuery) -> bool {
        self.data.is_none() || has_changed(query, self.previous_query.as_ref())
    }

    /// Starts a cycle and returns its token; pass it back to [`commit`].
    ///
    /// [`commit`]: DashboardSession::commit
    pub fn begin_cycle(&mut self) -> u64 {
        self.next_cycle += 1;
        self.next_cycle
    }

    /// Commits a completed cycle's results. Returns false (and discards the
    /// data) when a newer cycle already committed, so an overtaken fetch
    /// can't roll the dashboard backwards.
    pub fn commit(&mut self, cycle: u64, data: DashboardData) -> bool {
        if cycle <= self.committed_cycle {
            return false;
        }

        self.committed_cycle = cycle;
        self.previous_query = Some(data.query.clone());
        self.data = Some(data);
        true
    }

    #[must_use]
    pub fn data(&self) -> Option<&DashboardData> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn previous_query(&self) -> Option<&SearchQuery> {
        self.previous_query.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn query(keywords: &[&str]) -> SearchQuery {
        SearchQuery::new(
            keywords.iter().map(ToString::to_string),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
            vec![],
        )
        .unwrap()
    }

    fn data(q: &SearchQuery) -> DashboardData {
        DashboardData {
            query: q.clone(),
            tweets: vec![],
            occurrences: vec![],
        }
    }

    #[test]
    fn test_fresh_session_needs_fetch() {
        let session = DashboardSession::new();
        assert!(session.needs_fetch(&query(&["tpot"])));
    }

    #[test]
    fn test_committed_query_suppresses_refetch() {
        let mut session = DashboardSession::new();
        let q = query(&["tpot"]);

        let cycle = session.begin_cycle();
        assert!(session.commit(cycle, data(&q)));

        assert!(!session.needs_fetch(&q));
        assert!(session.needs_fetch(&query(&["postrat"])));
    }

    #[test]
    fn test_stale_cycle_discarded() {
        let mut session = DashboardSession::new();
        let slow = session.begin_cycle();
        let fast = session.begin_cycle();

        let newer = query(&["newer"]);
        assert!(session.commit(fast, data(&newer)));
        // The slower, older cycle finishes afterwards and must not win.
        assert!(!session.commit(slow, data(&query(&["older"]))));

        assert_eq!(
            session.data().unwrap().query.keywords,
            vec!["newer".to_string()]
        );
        assert_eq!(session.previous_query(), Some(&newer));
    }
}
