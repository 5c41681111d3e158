// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Shared logic for all frontends
//
// This crate provides:
// - Synchronizer keeping session, saved properties and stats in step
// - IdentityProvider and PropertyStore seams plus hosted-backend adapters
// - SettingsStore for persistent settings
// - Listing filters and search
//
// Frontend-specific code lives in separate crates.

pub mod backend;
pub mod identity;
pub mod listings;
pub mod settings;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use backend::{AuthClient, RestPropertyStore};
pub use identity::{AuthChange, AuthEvent, IdentityProvider};
pub use listings::{ListingFilter, ListingQuery};
pub use settings::SettingsStore;
pub use store::PropertyStore;
pub use sync::{PendingWrite, RefreshOutcome, SyncEvent, SyncSnapshot, Synchronizer};
pub use types::{AppError, AppSettings, Property, Session, Stats};
