//! Command-line interface for Trendlens.
//!
//! This module provides a structured CLI using clap for argument parsing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::cache::FetchCache;
use crate::clients::ArchiveClient;
use crate::config::Config;
use crate::models::SearchQuery;
use crate::services::{FetchError, FetchOrchestrator, build_series, format_tweet_count};

/// Trendlens - Community Archive trend explorer
/// Keyword trends and tweets from a remote tweet archive
#[derive(Parser)]
#[command(name = "trendlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch keyword trends and matching tweets
    #[command(alias = "q")]
    Query {
        /// Keywords to search for (up to the configured maximum)
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Start of the date range (YYYY-MM-DD, default from config)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End of the date range (YYYY-MM-DD, default today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Restrict occurrence counts to these account ids (repeatable)
        #[arg(long = "account", value_name = "ACCOUNT_ID")]
        accounts: Vec<String>,

        /// Print raw monthly counts instead of per-1000-tweets values
        #[arg(long)]
        raw: bool,

        /// How many tweets to print per keyword
        #[arg(long, default_value_t = 5)]
        show_tweets: usize,
    },

    /// List archive accounts usable with --account
    #[command(alias = "ls")]
    Accounts,

    /// Show archive-wide monthly tweet totals
    Totals,

    /// Show archive summary statistics
    Stats,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

fn build_orchestrator(config: &Config) -> Result<FetchOrchestrator> {
    let client = ArchiveClient::new(&config.archive)?;
    let cache = Arc::new(FetchCache::new(Duration::from_secs(config.cache.ttl_seconds)));
    Ok(FetchOrchestrator::new(
        Arc::new(client),
        cache,
        config.archive.fetch_limit,
    ))
}

#[allow(clippy::too_many_lines)]
pub async fn cmd_query(
    config: &Config,
    keywords: Vec<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    accounts: Vec<String>,
    raw: bool,
    show_tweets: usize,
) -> Result<()> {
    if keywords.len() > config.query.max_keywords {
        anyhow::bail!(
            "Too many keywords: {} (configured maximum is {})",
            keywords.len(),
            config.query.max_keywords
        );
    }

    let start = match start {
        Some(date) => date,
        None => config.default_start_date()?,
    };
    let end = end.unwrap_or_else(|| Local::now().date_naive());

    let query = SearchQuery::new(keywords, start, end, accounts)?;

    if query.is_empty() {
        println!("No keywords given. Nothing to fetch.");
        return Ok(());
    }

    let orchestrator = build_orchestrator(config)?;

    println!(
        "Fetching trends for {} keyword(s), {} to {}...",
        query.keywords.len(),
        query.start_date,
        query.end_date
    );

    let outcome = match orchestrator.fetch_all(&query).await {
        Ok(outcome) => outcome,
        Err(FetchError::BatchFailed { failures }) => {
            println!("All fetches failed. The archive may be unreachable.");
            for failure in failures.iter().take(3) {
                println!("  {} ({}): {}", failure.keyword, failure.operation, failure.message);
            }
            return Ok(());
        }
    };

    if !outcome.failures.is_empty() {
        println!();
        println!("Some fetches failed; results below are partial:");
        for failure in &outcome.failures {
            println!("  {} ({}): {}", failure.keyword, failure.operation, failure.message);
        }
    }

    let totals = orchestrator.monthly_totals().await?;
    let points = build_series(&outcome.occurrences, &totals, !raw);

    println!();
    if raw {
        println!("Monthly occurrence counts");
    } else {
        println!("Monthly occurrences per 1000 tweets");
    }
    println!("{:-<60}", "");

    let mut current_keyword = "";
    for point in &points {
        if point.keyword != current_keyword {
            current_keyword = &point.keyword;
            println!("{current_keyword}:");
        }
        println!(
            "  {}  {:>8.2}  ({} of {})",
            point.month.format("%Y-%m"),
            point.normalized_count,
            point.raw_count,
            format_tweet_count(point.tweet_count),
        );
    }
    if points.is_empty() {
        println!("No occurrence data in this date range.");
    }

    println!();
    println!("Related Tweets");
    println!("{:-<60}", "");

    for keyword in &query.keywords {
        let tweets: Vec<_> = outcome
            .tweets
            .iter()
            .filter(|t| t.matched_keyword == *keyword)
            .collect();

        println!("'{}' ({} tweets)", keyword, tweets.len());
        for tweet in tweets.iter().take(show_tweets) {
            let mut text: String = tweet.full_text.replace('\n', " ").chars().take(120).collect();
            if text.len() < tweet.full_text.len() {
                text.push_str("...");
            }
            println!(
                "  @{} - {} - {}",
                tweet.username,
                tweet.created_at.format("%Y-%m-%d"),
                tweet.url()
            );
            println!("    {text}");
        }
        if tweets.len() > show_tweets {
            println!("  ... and {} more", tweets.len() - show_tweets);
        }
        println!();
    }

    Ok(())
}

pub async fn cmd_accounts(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let accounts = orchestrator.list_accounts().await?;

    if accounts.is_empty() {
        println!("No accounts found in the archive.");
        return Ok(());
    }

    println!("Archive Accounts ({} total)", accounts.len());
    println!("{:-<60}", "");
    for account in &accounts {
        println!("@{:<24} {}", account.username, account.account_id);
    }
    println!();
    println!("Use with: trendlens query <keyword> --account <ACCOUNT_ID>");

    Ok(())
}

pub async fn cmd_totals(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let mut totals = orchestrator.monthly_totals().await?;
    totals.sort_by_key(|t| t.month);

    if totals.is_empty() {
        println!("The archive reported no monthly totals.");
        return Ok(());
    }

    println!("Archive Tweets per Month");
    println!("{:-<60}", "");
    for total in &totals {
        println!(
            "  {}  {:>10}",
            total.month.format("%Y-%m"),
            format_tweet_count(total.tweet_count)
        );
    }

    Ok(())
}

pub async fn cmd_stats(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    match orchestrator.global_stats().await? {
        Some(stats) => {
            println!("Community Archive");
            println!("{:-<60}", "");
            println!("Total tweets:   {}", format_tweet_count(stats.total_tweets));
            println!("Total accounts: {}", stats.total_accounts);
            if let Some(updated) = &stats.last_updated {
                println!("Last updated:   {updated}");
            }
        }
        None => {
            println!("An open database and API for tweet histories.");
            println!("Summary statistics are currently unavailable.");
        }
    }

    Ok(())
}

pub fn cmd_init() -> Result<()> {
    if Config::create_default_if_missing()? {
        println!("✓ Config file created. Edit config.toml and run again.");
    } else {
        println!("Config file already exists.");
    }
    Ok(())
}
