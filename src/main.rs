mod cli;
mod output;

use crate::cli::{CacheCommand, Cli, Command, SearchArgs};
use crate::output::print_events;
use clap::Parser;
use miette::IntoDiagnostic;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use ziptrawl_cache::ContentCache;
use ziptrawl_config::Config;
use ziptrawl_pipeline::{Pipeline, Query};
use ziptrawl_storage::backend::FtpStore;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load(cli.config.as_deref()).map_err(report)?;
    match cli.command {
        Command::Search(args) => search(&config, args).await,
        Command::Roots => roots(&config),
        Command::Cache(command) => cache(&config, command).await,
    }
}

/// Logs go to stderr; stdout only carries results.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Turn an error tree into a report, keeping the full tree in the debug log.
pub(crate) fn report<E>(err: exn::Exn<E>) -> miette::Report
where
    E: std::error::Error + Send + Sync + 'static,
{
    tracing::debug!("{err:?}");
    miette::miette!("{err}")
}

async fn open_cache(config: &Config) -> miette::Result<ContentCache> {
    ContentCache::open(&config.cache.path, config.cache.capacity).await.map_err(report)
}

async fn search(config: &Config, args: SearchArgs) -> miette::Result<()> {
    let query = Query::parse(&args.root, args.dates.as_deref(), &args.terms, &config.roots).map_err(report)?;
    let store = FtpStore::new(config.remote.host.clone(), config.remote.port).with_timeout(config.timeout());
    let credentials = config.credential_router().map_err(report)?;
    let cache = open_cache(config).await?;
    let pipeline = Pipeline::new(Arc::new(store), credentials, cache.clone()).with_retry(config.retry_policy());
    let limit = args.limit.unwrap_or(config.max_results);

    let mut stdout = std::io::stdout().lock();
    let outcome = print_events(pipeline.run(&query), limit, &mut stdout).await;
    cache.close().await;
    let summary = outcome?;
    stdout.flush().into_diagnostic()?;

    if summary.limit_reached {
        tracing::info!(limit, "Result limit reached, stopped searching");
    }
    if let Some(stats) = summary.stats {
        tracing::info!(%stats, "Done");
    }
    Ok(())
}

fn roots(config: &Config) -> miette::Result<()> {
    let mut stdout = std::io::stdout().lock();
    let width = config.roots.keys().map(|alias| alias.chars().count()).max().unwrap_or(0);
    for (alias, path) in &config.roots {
        writeln!(stdout, "{alias:<width$}  {path}").into_diagnostic()?;
    }
    Ok(())
}

async fn cache(config: &Config, command: CacheCommand) -> miette::Result<()> {
    let cache = open_cache(config).await?;
    let mut stdout = std::io::stdout().lock();
    let result = match command {
        CacheCommand::Stats => match cache.records().await {
            Ok(records) => {
                writeln!(stdout, "{}", cache.dir().display()).into_diagnostic()?;
                writeln!(stdout, "{} of {} archives cached", records.len(), cache.capacity()).into_diagnostic()?;
                // Oldest first, so the first line is evicted next.
                for record in records {
                    writeln!(stdout, "\t{}", record.key).into_diagnostic()?;
                }
                Ok(())
            },
            Err(err) => Err(report(err)),
        },
        CacheCommand::Clear => match cache.clear().await {
            Ok(removed) => writeln!(stdout, "Removed {removed} cached archives").into_diagnostic(),
            Err(err) => Err(report(err)),
        },
    };
    cache.close().await;
    result
}
