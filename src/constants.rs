pub mod cache {

    pub const QUERY_TTL_SECS: u64 = 3600;
}

pub mod limits {

    pub const DEFAULT_FETCH_LIMIT: u32 = 100;

    pub const MAX_KEYWORDS: usize = 10;
}

pub mod defaults {

    pub const KEYWORDS: &[&str] = &["ingroup", "postrat", "tpot"];

    pub const START_DATE: &str = "2020-01-01";
}
