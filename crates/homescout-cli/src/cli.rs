// SPDX-License-Identifier: AGPL-3.0
// Homescout CLI - Command-line interface definition

use clap::{Parser, Subcommand};
use homescout_core::ListingFilter;

/// Browse property listings and keep your favorites in sync
#[derive(Parser, Debug, Clone)]
#[command(name = "homescout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Backend URL, overriding the saved setting
    #[arg(long, env = "HOMESCOUT_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// Backend anon key, overriding the saved setting
    #[arg(long, env = "HOMESCOUT_ANON_KEY", global = true, hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Search listings
    Search {
        /// Quick filter: all, rent, sale or apartment
        #[arg(short, long)]
        filter: Option<ListingFilter>,

        /// Text matched against title, address and city
        query: Option<String>,
    },

    /// Show your saved properties
    Saved,

    /// Save a property, or unsave it if already saved
    Save {
        /// Property identifier
        property_id: String,
    },

    /// Show your profile and activity counts
    Profile,

    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "HOMESCOUT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "HOMESCOUT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Inspect or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the current settings
    Show,

    /// Point the client at a backend
    SetBackend {
        #[arg(long)]
        url: String,

        /// Anon key issued for the backend project
        #[arg(long)]
        key: String,
    },

    /// Change the filter preselected by `search`
    SetFilter {
        filter: ListingFilter,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_with_filter() {
        let cli = Cli::try_parse_from(["homescout", "search", "--filter", "rent", "harbor"]).unwrap();
        match cli.command {
            Commands::Search { filter, query } => {
                assert_eq!(filter, Some(ListingFilter::Rent));
                assert_eq!(query.as_deref(), Some("harbor"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_filter() {
        assert!(Cli::try_parse_from(["homescout", "search", "--filter", "villa"]).is_err());
    }

    #[test]
    fn test_parse_config_set_backend() {
        let cli = Cli::try_parse_from([
            "homescout",
            "config",
            "set-backend",
            "--url",
            "https://demo.supabase.co",
            "--key",
            "anon",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommand::SetBackend { .. }
            }
        ));
    }
}
