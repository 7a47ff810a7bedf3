use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use geoharvest_core::model::SourceKind;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "geoharvest")]
#[command(
    author,
    version,
    about = "Incremental harvester for federal geospatial catalog metadata"
)]
#[command(after_help = "Examples:
  geoharvest scan gr                       # Walk the whole product feed
  geoharvest scan gr --monitor             # Resume from the saved monitor link
  geoharvest scan ec --since 2016-03-20    # CSW records modified since a date
  geoharvest convert gr --monitor          # Convert records scanned since last run
  geoharvest dump gr --monitor > new.jsonl # Emit fresh package updates")]
pub struct Config {
    /// SQLite database connection URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://geoharvest.db")]
    pub database_url: String,

    /// Custom path to harvester.toml configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a remote catalog into the raw record store
    #[command(after_help = "Examples:
  geoharvest scan gr                    # Full feed walk
  geoharvest scan gr --start-index 2000 # Resume a full walk mid-feed
  geoharvest scan gr --since 2016-03-20 # Products edited since a date
  geoharvest scan ec --monitor          # CSW records since the last scan")]
    Scan {
        /// Catalog to scan
        source: SourceArg,

        /// Only records edited on or after this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", conflicts_with_all = ["monitor", "start_index"])]
        since: Option<String>,

        /// Resume from the watermark saved by the previous run
        #[arg(long, conflicts_with = "start_index")]
        monitor: bool,

        /// Resume a full feed walk at an absolute product offset (gr only)
        #[arg(long, value_name = "N")]
        start_index: Option<u64>,
    },
    /// Convert raw records into portal package updates
    Convert {
        /// Source whose records to convert
        source: SourceArg,

        /// Only records scanned on or after this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", conflicts_with = "monitor")]
        since: Option<String>,

        /// Only records scanned since the last conversion run
        #[arg(long)]
        monitor: bool,
    },
    /// Dump converted package updates as JSON lines
    Dump {
        /// Source whose package updates to dump
        source: SourceArg,

        /// Only updates written at or after this timestamp (YYYY-MM-DD HH:MM:SS)
        #[arg(long, value_name = "TIMESTAMP", conflicts_with = "monitor")]
        since: Option<String>,

        /// Only updates written since the last conversion run
        #[arg(long)]
        monitor: bool,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
}

/// Harvestable catalogs
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    /// Geogratis product feed
    Gr,
    /// Environment Canada CSW catalog
    Ec,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Gr => SourceKind::Geogratis,
            SourceArg::Ec => SourceKind::EcCsw,
        }
    }
}
