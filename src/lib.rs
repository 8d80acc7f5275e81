pub mod cache;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod models;
pub mod services;

use clap::{CommandFactory, Parser};
pub use config::Config;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

pub async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    let args = Cli::parse();

    match args.command {
        Some(Commands::Query {
            keywords,
            start,
            end,
            accounts,
            raw,
            show_tweets,
        }) => {
            cli::cmd_query(&config, keywords, start, end, accounts, raw, show_tweets).await
        }

        Some(Commands::Accounts) => cli::cmd_accounts(&config).await,

        Some(Commands::Totals) => cli::cmd_totals(&config).await,

        Some(Commands::Stats) => cli::cmd_stats(&config).await,

        Some(Commands::Init) => cli::cmd_init(),

        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
