use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::limits;

/// Errors raised when constructing a [`SearchQuery`] from raw user input.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("too many keywords: {0} (maximum {max})", max = limits::MAX_KEYWORDS)]
    TooManyKeywords(usize),
}

/// One user-chosen query: keywords, inclusive date range, optional account
/// filter. Built fresh whenever any input changes and never mutated after.
///
/// Keyword order is preserved for display; change detection treats the
/// keywords as a set (see `services::change`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keywords: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub account_ids: Vec<String>,
}

impl SearchQuery {
    /// Builds a query from raw input. Keywords are trimmed, empties dropped,
    /// and duplicates removed while keeping first-seen order.
    pub fn new(
        keywords: impl IntoIterator<Item = String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        account_ids: Vec<String>,
    ) -> Result<Self, QueryError> {
        if start_date > end_date {
            return Err(QueryError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }

        let mut seen = std::collections::HashSet::new();
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .filter(|k| seen.insert(k.clone()))
            .collect();

        if keywords.len() > limits::MAX_KEYWORDS {
            return Err(QueryError::TooManyKeywords(keywords.len()));
        }

        Ok(Self {
            keywords,
            start_date,
            end_date,
            account_ids,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_keywords_deduped_in_order() {
        let q = SearchQuery::new(
            ["tpot", "postrat", " tpot ", ""].map(String::from),
            date(2020, 1, 1),
            date(2020, 12, 31),
            vec![],
        )
        .unwrap();
        assert_eq!(q.keywords, vec!["tpot", "postrat"]);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = SearchQuery::new(
            ["tpot".to_string()],
            date(2021, 1, 1),
            date(2020, 1, 1),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_too_many_keywords_rejected() {
        let keywords = (0..11).map(|i| format!("kw{i}"));
        let err =
            SearchQuery::new(keywords, date(2020, 1, 1), date(2020, 12, 31), vec![]).unwrap_err();
        assert!(matches!(err, QueryError::TooManyKeywords(11)));
    }
}
