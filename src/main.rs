//! snapview - Entry Point

use clap::{Args as ClapArgs, Parser, Subcommand};
use snapview::commands::{self, ViewRequest};
use snapview::config::{self, CliOverrides};
use snapview::model::Snapshot;
use std::path::PathBuf;
use tracing::info;

/// snapview - filtered, diffable tables over memory snapshot dumps
#[derive(Parser, Debug)]
#[command(name = "snapview")]
#[command(version)]
#[command(about = "Print sorted, grouped, searched and diffed tables of snapshot dumps")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to log file for tracing output
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print sizes as raw byte counts
    #[arg(long, global = true)]
    pub raw_sizes: bool,

    /// Maximum number of rows to print
    #[arg(long, global = true)]
    pub rows: Option<usize>,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print one table of a snapshot
    Show {
        /// Snapshot dump (JSON)
        snapshot: PathBuf,
        /// Table to print
        #[arg(short, long)]
        table: String,
        /// Filters
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print the diff of one table across two snapshots
    Diff {
        /// First snapshot dump (JSON)
        first: PathBuf,
        /// Second snapshot dump (JSON)
        second: PathBuf,
        /// Table to diff
        #[arg(short, long)]
        table: String,
        /// Filters
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List the tables of a snapshot
    Tables {
        /// Snapshot dump (JSON)
        snapshot: PathBuf,
    },
}

/// Sort, group and search options shared by `show` and `diff`.
#[derive(ClapArgs, Debug, Default, PartialEq, Eq)]
pub struct FilterArgs {
    /// Sort key as COLUMN or COLUMN:desc; repeat for sub-sorts
    #[arg(short, long = "sort")]
    pub sort: Vec<String>,

    /// Group by COLUMN; repeat to nest groups
    #[arg(short, long = "group")]
    pub group: Vec<String>,

    /// Keep rows whose COLUMN contains TEXT, as COLUMN=TEXT
    #[arg(short = 'm', long = "match", value_parser = parse_match_arg)]
    pub matches: Vec<(String, String)>,

    /// Searches must match whole values
    #[arg(long)]
    pub exact: bool,

    /// Expand every group
    #[arg(long)]
    pub expand_all: bool,
}

fn parse_match_arg(arg: &str) -> Result<(String, String), String> {
    commands::parse_match(arg).ok_or_else(|| format!("expected COLUMN=TEXT, got '{arg}'"))
}

impl From<FilterArgs> for ViewRequest {
    fn from(args: FilterArgs) -> Self {
        ViewRequest {
            sort: args.sort,
            group: args.group,
            matches: args.matches,
            exact: args.exact,
            expand_all: args.expand_all,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Defaults → Config File → Env Vars → CLI Args
    let config = {
        let config_file = config::load_config_with_precedence(args.config.clone())?;
        let merged = config::merge_config(config_file);
        let with_env = config::apply_env_overrides(merged);
        let cli = CliOverrides {
            log_file_path: args.log_file.clone(),
            human_readable_sizes: args.raw_sizes.then_some(false),
            max_rows: args.rows,
        };
        config::apply_cli_overrides(with_env, cli).validate()?
    };

    snapview::logging::init(&config.log_file_path)?;
    info!(config = ?config, "Configuration loaded and resolved");

    let output = match args.command {
        Command::Show {
            snapshot,
            table,
            filters,
        } => {
            let snapshot = Snapshot::load(&snapshot)?;
            commands::show(&snapshot, &table, &filters.into(), &config)?
        }
        Command::Diff {
            first,
            second,
            table,
            filters,
        } => {
            let first = Snapshot::load(&first)?;
            let second = Snapshot::load(&second)?;
            commands::diff(first, second, &table, &filters.into(), &config)?
        }
        Command::Tables { snapshot } => commands::list_tables(&Snapshot::load(&snapshot)?),
    };
    println!("{output}");
    Ok(())
}
