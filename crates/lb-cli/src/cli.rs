//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::day::DayArgs;
use crate::commands::list::ListArgs;
use crate::commands::range::RangeArgs;

/// Calendar journal inspector.
///
/// Loads journal entries and answers day, range and listing queries against
/// the same index the editor uses.
#[derive(Debug, Parser)]
#[command(name = "lb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the entries file, overriding the configured one.
    #[arg(short, long, global = true)]
    pub entries: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show entries touching a calendar date.
    Day(DayArgs),

    /// Show entries overlapping a period.
    Range(RangeArgs),

    /// List every entry.
    List(ListArgs),
}
