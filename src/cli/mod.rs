//! CLI module
//!
//! Command-line interface over the client library.
//!
//! # Commands
//!
//! - `schema` - Resolve an entity schema and print it
//! - `export` - Map JSON lines to an entity schema and upload sharded files
//! - `inspect` - Decode a local container file and print its records

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
