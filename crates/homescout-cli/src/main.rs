// SPDX-License-Identifier: AGPL-3.0
// Homescout CLI - Terminal frontend

mod cli;
mod commands;
mod render;
mod state;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ConfigCommand};
use homescout_core::SettingsStore;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("homescout={}", level).parse()?)
                .add_directive(format!("homescout_core={}", level).parse()?),
        )
        .init();

    tracing::info!("Starting Homescout v{}", env!("CARGO_PKG_VERSION"));

    let store = SettingsStore::new()?;

    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommand::Show => commands::show_config(&store),
            ConfigCommand::SetBackend { url, key } => {
                store.set_backend(url, key)?;
                println!("Backend set to {}", url.trim());
                Ok(())
            }
            ConfigCommand::SetFilter { filter } => {
                store.set_default_filter(*filter)?;
                println!("Default filter set to {}", filter.label());
                Ok(())
            }
        };
    }

    let mut settings = store.get();
    if let Some(url) = cli.backend_url {
        settings.backend_url = url;
    }
    if let Some(key) = cli.anon_key {
        settings.anon_key = key;
    }

    let state = AppState::connect(settings).await?;
    for notice in &state.notices {
        eprintln!("warning: {}", notice);
    }

    match cli.command {
        Commands::Search { filter, query } => {
            commands::search(&state, filter, query.as_deref().unwrap_or("")).await
        }
        Commands::Saved => commands::saved(&state).await,
        Commands::Save { property_id } => commands::toggle_save(&state, &property_id).await,
        Commands::Profile => commands::profile(&state),
        Commands::Login { email, password } => commands::login(&state, &email, &password).await,
        Commands::Signup { email, password } => {
            commands::signup(&state, &email, &password).await
        }
        Commands::Logout => commands::logout(&state).await,
        Commands::Config { .. } => Ok(()),
    }
}
