//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "idhub", version, about = "Identity hub batch commands")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,

    /// Run a JSON array of employee records through the importer.
    Import {
        /// File holding the records.
        #[arg(long, value_name = "FILE")]
        file: PathBuf,

        /// Source system the records come from.
        #[arg(long, default_value = "hr")]
        source: String,
    },

    /// Task queue monitoring and processing.
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Write derived flat-file views.
    #[command(subcommand)]
    Export(ExportCommand),
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Show per-queue task counts.
    Stats,

    /// Process due tasks against a source snapshot.
    Run {
        /// Snapshot file; task keys missing from it count as
        /// removals. Defaults to the configured snapshot path.
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Stop after this many tasks.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    /// Person feed, one line per person.
    Persons {
        /// Output file; defaults to the configured path.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Group membership map.
    Groups {
        /// Output file; defaults to the configured path.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use clap::Parser;

    use super::*;

    #[test]
    fn parses_import_with_default_source() {
        let cli = Cli::try_parse_from(["idhub", "import", "--file", "feed.json"]).unwrap();
        match cli.command {
            Command::Import { file, source } => {
                assert_eq!(file, PathBuf::from("feed.json"));
                assert_eq!(source, "hr");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_queue_run_with_limit() {
        let cli = Cli::try_parse_from([
            "idhub", "--config", "idhub.toml", "queue", "run", "--file", "snap.json",
            "--limit", "10",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("idhub.toml")));
        match cli.command {
            Command::Queue(QueueCommand::Run { limit, .. }) => assert_eq!(limit, Some(10)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn queue_run_file_is_optional() {
        let cli = Cli::try_parse_from(["idhub", "queue", "run"]).unwrap();
        match cli.command {
            Command::Queue(QueueCommand::Run { file, limit }) => {
                assert!(file.is_none());
                assert!(limit.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn export_out_is_optional() {
        let cli = Cli::try_parse_from(["idhub", "export", "persons"]).unwrap();
        match cli.command {
            Command::Export(ExportCommand::Persons { out }) => assert!(out.is_none()),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
