use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Path to the configuration file
    #[arg(long, default_value = "tkz.conf")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy or reinstall the equipment catalog
    DbInstall {
        /// Drop and rebuild every table, regardless of
        /// DB_TABLES_CLEAR_INSTALL
        #[arg(long)]
        clear: bool,
        /// Directory holding the CSV catalog; defaults to the shipped data
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Evaluate a chain expression
    Run {
        /// Chain expression, e.g. "T(160, 'У/Ун-0'), QF(160), Line()"
        expression: String,
        /// Tabulate the currents at every intermediate fault point
        #[arg(long)]
        table: bool,
    },
    /// Catalog browsing
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Configuration store access
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Print a catalog table; fact tables come out joined to their
    /// dimensions
    Show {
        /// Table name in snake_case, e.g. "transformer" or "power_nominal"
        table: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the value of a key
    Get { key: String },
    /// Write a new value for a key
    Set { key: String, value: String },
}
