// SPDX-License-Identifier: AGPL-3.0
// Homescout CLI - Command handlers

use crate::render;
use crate::state::AppState;
use anyhow::{Context, Result};
use homescout_core::listings::{results_summary, saved_properties};
use homescout_core::{AppError, AppSettings, ListingFilter, ListingQuery, SettingsStore};

pub async fn search(state: &AppState, filter: Option<ListingFilter>, query: &str) -> Result<()> {
    let query = ListingQuery::new(filter.unwrap_or(state.settings.default_filter), query);

    let properties = state
        .sync
        .store()
        .list_properties()
        .await
        .context("Failed to load listings")?;
    let matches = query.apply(&properties);
    let snapshot = state.sync.snapshot();

    println!("{}", results_summary(matches.len()));
    for property in matches {
        println!();
        println!("{}", render::property_card(property, snapshot.is_saved(&property.id)));
    }
    Ok(())
}

pub async fn saved(state: &AppState) -> Result<()> {
    let snapshot = state.sync.snapshot();
    let Some(session) = snapshot.session.as_ref() else {
        println!("Sign in to see your saved properties");
        return Ok(());
    };

    let store = state.sync.store();
    let properties = saved_properties(store.as_ref(), session)
        .await
        .context("Failed to load saved properties")?;

    if properties.is_empty() {
        println!("No saved properties yet");
        println!("Start exploring and save properties you love with `homescout save <id>`");
        return Ok(());
    }

    println!("{} saved", properties.len());
    for property in &properties {
        println!();
        println!("{}", render::property_card(property, snapshot.is_saved(&property.id)));
    }
    Ok(())
}

pub async fn toggle_save(state: &AppState, property_id: &str) -> Result<()> {
    let pending = match state.sync.toggle_save(property_id) {
        Ok(pending) => pending,
        Err(AppError::SignInRequired) => {
            eprintln!("{}", AppError::SignInRequired);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let saved = pending.saved;
    if pending.wait().await {
        if saved {
            println!("Saved {}", property_id);
        } else {
            println!("Removed {} from saved", property_id);
        }
    } else {
        eprintln!("Could not sync the change for {}; it may reappear later", property_id);
    }
    Ok(())
}

pub fn profile(state: &AppState) -> Result<()> {
    let snapshot = state.sync.snapshot();
    match snapshot.session.as_ref() {
        Some(session) => println!("{}", render::profile(session, &snapshot.stats)),
        None => println!("Sign in to view your profile"),
    }
    Ok(())
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<()> {
    let session = state.auth.sign_in_with_password(email, password).await?;
    println!("Signed in as {}", session.email);
    Ok(())
}

pub async fn signup(state: &AppState, email: &str, password: &str) -> Result<()> {
    match state.auth.sign_up(email, password).await? {
        Some(session) => println!("Account created, signed in as {}", session.email),
        None => println!("Account created; check {} to confirm it", email),
    }
    Ok(())
}

pub async fn logout(state: &AppState) -> Result<()> {
    if !state.sync.snapshot().is_signed_in() {
        println!("Not signed in");
        return Ok(());
    }
    state.sync.sign_out().await;
    println!("Signed out");
    Ok(())
}

pub fn show_config(store: &SettingsStore) -> Result<()> {
    let mut settings = store.get();
    if !settings.anon_key.is_empty() {
        settings.anon_key = "********".to_string();
    }

    println!("# {}", store.path().display());
    println!("{}", settings_table(&settings));
    Ok(())
}

fn settings_table(settings: &AppSettings) -> String {
    format!(
        "backendUrl:         {}\nanonKey:            {}\nrequestTimeoutSecs: {}\npersistSession:     {}\ndefaultFilter:      {}",
        settings.backend_url,
        settings.anon_key,
        settings.request_timeout_secs,
        settings.persist_session,
        settings.default_filter
    )
}
