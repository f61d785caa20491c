use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Search zipped XML bundles on a remote FTP archive.
#[derive(Parser, Debug)]
#[command(name = "ziptrawl", version, about)]
pub struct Cli {
    /// Configuration file (TOML, or YAML with a `.yaml`/`.yml` extension).
    #[arg(short, long, global = true, env = "ZIPTRAWL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log more; repeat for even more. Overrides `RUST_LOG`.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find archive entries containing any of the terms.
    Search(SearchArgs),
    /// List the configured root aliases.
    Roots,
    /// Inspect or empty the local archive cache.
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// A root alias (see `ziptrawl roots`) or an absolute remote path.
    pub root: String,

    /// Terms to look for, case-insensitively. Each may be a comma-separated list.
    #[arg(required = true)]
    pub terms: Vec<String>,

    /// Only archives covering this period: `FROM - TO`, either side optional,
    /// dates as `DD.MM.YYYY` or `YYYY-MM-DD`.
    #[arg(short, long, allow_hyphen_values = true)]
    pub dates: Option<String>,

    /// Stop after this many matches; 0 for no limit. Defaults to `max_results`.
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show where the cache lives and what it holds.
    Stats,
    /// Remove every cached archive.
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "ziptrawl", "-vv", "search", "contracts", "inn,kpp", "customer", "--dates", "01.01.2018 -", "--limit", "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Search(args) = cli.command else {
            panic!("expected the search command");
        };
        assert_eq!(args.root, "contracts");
        assert_eq!(args.terms, vec!["inn,kpp", "customer"]);
        assert_eq!(args.dates.as_deref(), Some("01.01.2018 -"));
        assert_eq!(args.limit, Some(5));
    }

    #[test]
    fn test_open_start_date_is_not_a_flag() {
        let cli = Cli::try_parse_from(["ziptrawl", "search", "/out/", "foo", "-d", "- 2018-02-01"]).unwrap();
        let Command::Search(args) = cli.command else {
            panic!("expected the search command");
        };
        assert_eq!(args.dates.as_deref(), Some("- 2018-02-01"));
    }

    #[test]
    fn test_search_needs_terms() {
        assert!(Cli::try_parse_from(["ziptrawl", "search", "contracts"]).is_err());
    }

    #[test]
    fn test_cache_subcommands() {
        let cli = Cli::try_parse_from(["ziptrawl", "cache", "clear"]).unwrap();
        assert!(matches!(cli.command, Command::Cache(CacheCommand::Clear)));
    }
}
