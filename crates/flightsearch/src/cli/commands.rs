//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Airport suggestion arguments.
#[derive(Debug, Args)]
pub struct SuggestCommand {
    /// Text to match against airport codes and names
    pub query: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Destination listing arguments.
#[derive(Debug, Args)]
pub struct DestinationsCommand {
    /// IATA code of the departure airport
    pub code: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Search text; remembered for `--last`
    #[arg(required_unless_present = "last", conflicts_with = "last")]
    pub text: Option<String>,

    /// Repeat the last remembered search
    #[arg(short, long)]
    pub last: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Favorite route commands.
#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List saved routes, newest first
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Save a route
    Add {
        /// Departure IATA code
        from: String,
        /// Destination IATA code
        to: String,
    },

    /// Forget a route
    Remove {
        /// Departure IATA code
        from: String,
        /// Destination IATA code
        to: String,
    },

    /// Forget every saved route
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favorites_command_debug() {
        let cmd = FavoritesCommand::Add {
            from: "OPO".to_string(),
            to: "LIS".to_string(),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Add"));
        assert!(debug_str.contains("OPO"));
    }

    #[test]
    fn test_search_command_debug() {
        let cmd = SearchCommand {
            text: Some("Porto".to_string()),
            last: false,
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Porto"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
