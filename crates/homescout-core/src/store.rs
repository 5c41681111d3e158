// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Property store seam
//
// The remote store exposes four collections: properties, saved_properties,
// viewed_properties and inquiries. Only the query shapes the client needs
// are modelled here.

use crate::types::{AppError, Property, Session};
use async_trait::async_trait;

/// Collection holding (user, property) favorite links
pub const SAVED_PROPERTIES: &str = "saved_properties";
/// Collection holding (user, property) view records
pub const VIEWED_PROPERTIES: &str = "viewed_properties";
/// Collection holding user inquiries about properties
pub const INQUIRIES: &str = "inquiries";
/// Collection holding the listings themselves
pub const PROPERTIES: &str = "properties";

/// Remote relational store queried by the synchronizer and the views
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Property ids of every saved link belonging to the session's user
    async fn saved_property_ids(&self, session: &Session) -> Result<Vec<String>, AppError>;

    /// Create a saved link for (user, property)
    async fn insert_saved(&self, session: &Session, property_id: &str) -> Result<(), AppError>;

    /// Delete the saved link matching (user, property)
    async fn delete_saved(&self, session: &Session, property_id: &str) -> Result<(), AppError>;

    /// Record ids of the user's viewed-property links
    async fn viewed_ids(&self, session: &Session) -> Result<Vec<String>, AppError>;

    /// Record ids of the user's inquiries
    async fn inquiry_ids(&self, session: &Session) -> Result<Vec<String>, AppError>;

    /// Full records for a set of property ids (order unspecified)
    async fn properties_by_ids(&self, ids: &[String]) -> Result<Vec<Property>, AppError>;

    /// Every listing, featured first, then newest first
    async fn list_properties(&self) -> Result<Vec<Property>, AppError>;
}
