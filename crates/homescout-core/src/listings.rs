// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Listing search and filtering
//
// Filtering happens client-side over the full ordered listing.

use crate::store::PropertyStore;
use crate::types::{AppError, Property, Session};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quick filters offered above the search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingFilter {
    #[default]
    All,
    Rent,
    Sale,
    Apartment,
}

impl ListingFilter {
    pub const ALL: [ListingFilter; 4] = [Self::All, Self::Rent, Self::Sale, Self::Apartment];

    /// Get display label for this filter
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Rent => "Rent",
            Self::Sale => "Sale",
            Self::Apartment => "Apartment",
        }
    }

    /// Check whether a property passes this filter
    pub fn matches(&self, property: &Property) -> bool {
        match self {
            Self::All => true,
            // Apartment filters on the kind of building, the others on the deal
            Self::Apartment => property.property_type == "apartment",
            Self::Rent => property.listing_type == "rent",
            Self::Sale => property.listing_type == "sale",
        }
    }
}

impl fmt::Display for ListingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Rent => "rent",
            Self::Sale => "sale",
            Self::Apartment => "apartment",
        })
    }
}

impl FromStr for ListingFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "rent" => Ok(Self::Rent),
            "sale" => Ok(Self::Sale),
            "apartment" => Ok(Self::Apartment),
            other => Err(AppError::InvalidConfig(format!(
                "Unknown listing filter: {}",
                other
            ))),
        }
    }
}

/// Active filter plus free-text search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub filter: ListingFilter,
    pub search: String,
}

impl ListingQuery {
    pub fn new(filter: ListingFilter, search: impl Into<String>) -> Self {
        Self {
            filter,
            search: search.into(),
        }
    }

    /// Check whether a property matches both the filter and the search text
    pub fn matches(&self, property: &Property) -> bool {
        if !self.filter.matches(property) {
            return false;
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        property.title.to_lowercase().contains(&needle)
            || property.address.to_lowercase().contains(&needle)
            || property.city.to_lowercase().contains(&needle)
    }

    /// Keep the matching properties, preserving listing order
    pub fn apply<'a>(&self, properties: &'a [Property]) -> Vec<&'a Property> {
        properties.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Summary line shown above the results
pub fn results_summary(count: usize) -> String {
    format!("{} properties found", count)
}

/// Fetch the full records of everything the user has saved
pub async fn saved_properties(
    store: &dyn PropertyStore,
    session: &Session,
) -> Result<Vec<Property>, AppError> {
    let ids = store.saved_property_ids(session).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    tracing::debug!("Fetching {} saved properties", ids.len());
    store.properties_by_ids(&ids).await
}
