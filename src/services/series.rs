//! Merges per-keyword occurrence series with the global monthly totals into
//! chartable points, optionally normalized to occurrences per 1000 tweets.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{KeywordSeries, MonthlyTotal, NormalizedPoint};

/// Joins each keyword's months against the global totals (left join driven
/// by the occurrence rows; months missing a total are dropped) and computes
/// the chart value.
///
/// With `normalize` off, `normalized_count` carries the raw count and the
/// total rides along for reference. With it on, the value is
/// `raw / total * 1000`, and months whose total is zero are dropped rather
/// than divided.
///
/// Output is grouped by keyword in input order, months ascending within each
/// group. Keywords with no occurrence rows contribute nothing; months are
/// never synthesized.
#[must_use]
pub fn build_series(
    occurrences: &[KeywordSeries],
    totals: &[MonthlyTotal],
    normalize: bool,
) -> Vec<NormalizedPoint> {
    let totals_by_month: HashMap<NaiveDate, u64> = totals
        .iter()
        .map(|t| (t.month, t.tweet_count))
        .collect();

    let mut points = Vec::new();

    for series in occurrences {
        let mut months: Vec<_> = series.months.iter().collect();
        months.sort_by_key(|m| m.month);

        for occurrence in months {
            let Some(&tweet_count) = totals_by_month.get(&occurrence.month) else {
                continue;
            };

            #[allow(clippy::cast_precision_loss)]
            let normalized_count = if normalize {
                if tweet_count == 0 {
                    continue;
                }
                occurrence.word_count as f64 / tweet_count as f64 * 1000.0
            } else {
                occurrence.word_count as f64
            };

            points.push(NormalizedPoint {
                keyword: series.keyword.clone(),
                month: occurrence.month,
                raw_count: occurrence.word_count,
                tweet_count,
                normalized_count,
            });
        }
    }

    points
}

/// Human-readable tweet counts for the dashboard header: 950 stays 950,
/// 12_400 becomes "12.4K", and so on through M and B.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_tweet_count(count: u64) -> String {
    if count >= 1_000_000_000 {
        format!("{:.1}B", count as f64 / 1e9)
    } else if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1e6)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1e3)
    } else {
        count.to_string()
    }
}
