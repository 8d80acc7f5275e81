pub mod change;
pub mod fetch;
pub mod series;
pub mod session;

pub use change::has_changed;
pub use fetch::{FetchError, FetchFailure, FetchOperation, FetchOrchestrator, FetchOutcome};
pub use series::{build_series, format_tweet_count};
pub use session::{DashboardData, DashboardSession};
