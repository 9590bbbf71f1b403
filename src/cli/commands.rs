//! CLI commands and argument parsing

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fnavro - schema-driven Avro exports to object storage
#[derive(Parser, Debug)]
#[command(name = "fnavro")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Bucket root URL (overrides the config file)
    /// Supports: /path, gs://bucket, s3://bucket, r2://bucket, az://container, memory://name
    #[arg(short, long, global = true)]
    pub bucket: Option<String>,

    /// Namespace between bucket and entity (overrides the config file)
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve an entity schema and print it
    Schema {
        /// Entity name, e.g. `nav`
        entity: String,
    },

    /// Map JSON lines to the entity schema and upload sharded container files
    Export {
        /// Entity name, e.g. `nav`
        entity: String,

        /// Input file with one JSON object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Partition date (YYYY-MM-DD, default today in UTC)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Number of output shards
        #[arg(short, long, default_value = "1")]
        shards: usize,
    },

    /// Decode a local container file and print records as JSON lines
    Inspect {
        /// Container file
        file: PathBuf,

        /// Maximum records to print
        #[arg(long)]
        limit: Option<usize>,
    },
}
