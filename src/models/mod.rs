pub mod query;
pub mod series;
pub mod tweet;

pub use query::{QueryError, SearchQuery};
pub use series::{Account, GlobalStats, KeywordSeries, MonthlyOccurrence, MonthlyTotal, NormalizedPoint};
pub use tweet::TweetRecord;
