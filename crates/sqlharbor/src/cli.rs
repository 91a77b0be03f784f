use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sqlharbor")]
#[command(about = "Browse SQL Server objects and review schema designer changes")]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config dir>/sqlharbor/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Profile file (default: <config dir>/sqlharbor/profiles.json)
    #[arg(long, global = true)]
    pub profiles: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List saved connections
    List,

    /// Save a new connection
    Add,

    /// Connect and print the object tree
    Expand {
        /// Connection label, server name or profile id
        connection: String,

        /// How many levels below the server to expand
        #[arg(short, long, default_value_t = 1)]
        depth: usize,
    },

    /// Forget a saved connection
    Remove {
        /// Connection label, server name or profile id
        connection: String,
    },

    /// Fold copilot changes and reconcile them against a schema
    Ledger {
        #[arg(long)]
        schema: PathBuf,

        /// Changes proposed in this batch
        #[arg(long)]
        incoming: PathBuf,

        /// Changes tracked so far
        #[arg(long)]
        tracked: Option<PathBuf>,
    },

    /// Compare a schema with its baseline
    Diff {
        #[arg(long)]
        baseline: PathBuf,

        #[arg(long)]
        current: PathBuf,

        /// Print the diagram state, deleted entities included
        #[arg(long)]
        flow: bool,
    },
}
