pub mod output;
pub mod prompt;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "LexArchive", about = "Local catalog and file store for legal documents")]
pub struct Cli {
    /// Data directory (defaults to $LEXARCHIVE_DATA_DIR, then ./data).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the data directory, config, database and default categories.
    Init,
    /// Copy one or more files into the catalog.
    Upload {
        #[arg(required = true, num_args = 1..)]
        sources: Vec<PathBuf>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        keywords: Option<String>,
        /// Never prompt; missing fields fall back to their defaults.
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },
    /// Find documents whose name or keywords contain the text.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Most recently accessed documents.
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },
    Show {
        id: i64,
    },
    /// Mark a document as accessed and open it with the default application.
    Open {
        id: i64,
        #[arg(long, default_value_t = false)]
        no_launch: bool,
    },
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Doctor,
    /// How to convert between PDF and Word.
    Convert,
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommands {
    List,
    Add {
        name: String,
    },
    Delete {
        name: String,
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },
    /// Documents filed under a category.
    Files {
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
