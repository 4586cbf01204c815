//! Command-line interface for flightsearch.
//!
//! This module provides the CLI structure for the `flightsearch` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DestinationsCommand, FavoritesCommand, SearchCommand, StatusCommand,
    SuggestCommand,
};

use crate::logging::Verbosity;

/// flightsearch - Find flight routes and keep your favorites
///
/// Looks up airports by code or name, lists destinations from a departure
/// airport, and remembers the routes you save.
#[derive(Debug, Parser)]
#[command(name = "flightsearch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Suggest airports matching a code or name
    Suggest(SuggestCommand),

    /// List destinations from a departure airport
    Destinations(DestinationsCommand),

    /// Search as you would type, remembering the text
    Search(SearchCommand),

    /// Manage saved routes
    #[command(subcommand)]
    Favorites(FavoritesCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
