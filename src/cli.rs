//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Group Usenet article parts into binaries and publish complete ones as releases.
///
/// Parts and segments are read from the SQLite catalog; each release carries
/// an NZB manifest listing every segment needed to fetch it.
#[derive(Parser, Debug)]
#[command(name = "indexer")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/usenet-indexer/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite catalog path (default: indexer.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log every SQL statement
    #[arg(long = "debug-db", global = true)]
    pub debug_db: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the catalog database and its tables
    CreateDb,
    /// Group ungrouped parts into binaries
    MakeBinaries,
    /// Promote complete binaries into releases
    MakeReleases(ThresholdArgs),
    /// Run make-binaries then make-releases
    Process(ThresholdArgs),
    /// List parts with their segment availability
    ListParts {
        /// Print JSON instead of text lines
        #[arg(long)]
        json: bool,
    },
    /// List active newsgroups
    ListGroups,
}

impl Command {
    /// Threshold given on the command line, for commands that promote.
    #[must_use]
    pub fn threshold(&self) -> Option<u32> {
        match self {
            Self::MakeReleases(args) | Self::Process(args) => args.threshold,
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ThresholdArgs {
    /// Minimum percent of segments present for promotion (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub threshold: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_subcommand_required() {
        let result = Cli::try_parse_from(["indexer"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_create_db_parses() {
        let cli = Cli::try_parse_from(["indexer", "create-db"]).unwrap();
        assert!(matches!(cli.command, Command::CreateDb));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(cli.db.is_none());
        assert!(!cli.debug_db);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let cli = Cli::try_parse_from(["indexer", "-v", "make-binaries"]).unwrap();
        assert_eq!(cli.verbose, 1);

        let cli = Cli::try_parse_from(["indexer", "-vv", "make-binaries"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "indexer",
            "process",
            "-q",
            "--db",
            "/tmp/x.db",
            "--debug-db",
        ])
        .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(cli.debug_db);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Cli::try_parse_from(["indexer", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Cli::try_parse_from(["indexer", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Cli::try_parse_from(["indexer", "make-binaries", "--nonexistent"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_threshold_bounds() {
        let cli = Cli::try_parse_from(["indexer", "make-releases", "--threshold", "95"]).unwrap();
        assert_eq!(cli.command.threshold(), Some(95));

        let cli = Cli::try_parse_from(["indexer", "process", "--threshold", "1"]).unwrap();
        assert_eq!(cli.command.threshold(), Some(1));

        assert!(Cli::try_parse_from(["indexer", "make-releases", "--threshold", "0"]).is_err());
        assert!(Cli::try_parse_from(["indexer", "make-releases", "--threshold", "101"]).is_err());
    }

    #[test]
    fn test_cli_threshold_absent_by_default() {
        let cli = Cli::try_parse_from(["indexer", "make-releases"]).unwrap();
        assert_eq!(cli.command.threshold(), None);

        let cli = Cli::try_parse_from(["indexer", "list-groups"]).unwrap();
        assert_eq!(cli.command.threshold(), None);
    }

    #[test]
    fn test_cli_threshold_rejected_on_other_commands() {
        assert!(Cli::try_parse_from(["indexer", "make-binaries", "--threshold", "90"]).is_err());
    }

    #[test]
    fn test_cli_list_parts_json_flag() {
        let cli = Cli::try_parse_from(["indexer", "list-parts", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::ListParts { json: true }));
    }
}
