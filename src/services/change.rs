//! Decides whether a fetch cycle is needed at all: a re-render with the same
//! inputs must not re-issue remote queries.

use std::collections::HashSet;

use crate::models::SearchQuery;

/// True when there is no previous query or any field differs.
///
/// Keywords and account ids compare as sets: reordering the same values is
/// not a change, since only membership affects what gets fetched.
#[must_use]
pub fn has_changed(current: &SearchQuery, previous: Option<&SearchQuery>) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    current.start_date != previous.start_date
        || current.end_date != previous.end_date
        || as_set(&current.keywords) != as_set(&previous.keywords)
        || as_set(&current.account_ids) != as_set(&previous.account_ids)
}

fn as_set(values: &[String]) -> HashSet<&str> {
    values.iter().map(String::as_str).collect()
}
