//! rtcache command line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cache::KeyEncoding;

/// rtcache - inspect runtime cache keys and configuration.
#[derive(Parser, Debug)]
#[command(name = "rtcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = crate::types::config::CONFIG_FILE)]
    pub config: PathBuf,

    /// Verbose mode.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode.
    #[arg(short, long)]
    pub quiet: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Writes a default configuration file.
    Init {
        /// Target directory (default: current directory).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Prints the normalized form of a key.
    Key {
        /// Key segments; one segment is a scalar key.
        #[arg(required = true)]
        segments: Vec<String>,

        /// Encoding to use instead of the configured one.
        #[arg(short, long)]
        encoding: Option<KeyEncoding>,

        /// Print the key under every encoding.
        #[arg(short, long, conflicts_with = "encoding")]
        all: bool,
    },

    /// Shows the effective configuration.
    Config {
        /// Print as JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },

    /// Shows version.
    Version,
}
