//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// In-memory tree index over parent-referencing records
#[derive(Parser, Debug)]
#[command(name = "treeindex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// JSON array of records (default: `data_file` setting, then built-in demo records)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Config file to use instead of ./.treeindex.toml
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Accept records in any order (parents may follow children)
    #[arg(long, global = true)]
    pub two_pass: bool,

    /// Fail on repeated ids instead of keeping the last record
    #[arg(long, global = true)]
    pub reject_duplicates: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print all records in input order
    All,

    /// Print the record with this id
    Item {
        /// Record id
        id: String,
    },

    /// Print the direct children of a record
    Children {
        /// Record id
        id: String,
    },

    /// Print the ancestors of a record, nearest first
    Parents {
        /// Record id
        id: String,
    },

    /// Print the number of ancestors of a record
    Depth {
        /// Record id
        id: String,
    },

    /// Show hierarchy as tree
    Tree,

    /// Print records without children
    Leaves,

    /// Run the sample queries against the built-in records
    Demo,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Template,

    /// Show config paths
    Path,
}
