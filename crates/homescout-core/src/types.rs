// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Type definitions

use crate::listings::ListingFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown when a property has no images of its own
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://images.pexels.com/photos/1571460/pexels-photo-1571460.jpeg";

/// Authenticated identity issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token for user-scoped backend calls
    pub access_token: String,
    /// Token used to obtain a new access token (empty when unknown)
    #[serde(default)]
    pub refresh_token: String,
    /// Stable identifier of the signed-in user
    pub user_id: String,
    /// Email of the signed-in user (empty when the provider did not return one)
    #[serde(default)]
    pub email: String,
    /// Unix timestamp at which the access token expires (0 when unknown)
    #[serde(default)]
    pub expires_at: i64,
}

impl Session {
    /// Single uppercase letter used for the profile avatar
    pub fn avatar_initial(&self) -> char {
        self.email
            .chars()
            .next()
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('U')
    }
}

/// Aggregate per-user counters shown on the profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub saved: u64,
    pub viewed: u64,
    pub inquiries: u64,
}

/// A property listing as stored in the `properties` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    /// "month" for rentals, absent for one-off prices
    #[serde(default)]
    pub price_period: Option<String>,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub listing_type: String,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub square_feet: u32,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Property {
    /// Price in whole US dollars with thousands separators, e.g. "$2,500/mo"
    pub fn formatted_price(&self) -> String {
        let dollars = self.price.round() as i64;
        let digits = dollars.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if dollars < 0 { "-" } else { "" };
        let formatted = format!("{}${}", sign, grouped);

        match self.price_period.as_deref() {
            Some("month") => format!("{}/mo", formatted),
            _ => formatted,
        }
    }

    /// First listing image, or a generic placeholder
    pub fn cover_image(&self) -> &str {
        self.images
            .first()
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_IMAGE_URL)
    }

    /// "address, city, state" as shown on listing cards
    pub fn location_line(&self) -> String {
        match self.state.as_deref() {
            Some(state) if !state.is_empty() => {
                format!("{}, {}, {}", self.address, self.city, state)
            }
            _ => format!("{}, {}", self.address, self.city),
        }
    }
}

/// Application settings (frontend-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Base URL of the hosted backend, e.g. "https://xyz.supabase.co"
    pub backend_url: String,
    /// Public (anon) API key of the hosted backend
    pub anon_key: String,
    /// Per-request timeout for backend calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Keep the signed-in session on disk between runs
    #[serde(default = "default_persist_session")]
    pub persist_session: bool,
    /// Filter preselected in the search view
    #[serde(default)]
    pub default_filter: ListingFilter,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_persist_session() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            anon_key: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            persist_session: default_persist_session(),
            default_filter: ListingFilter::default(),
        }
    }
}

impl AppSettings {
    /// Check that the backend can be reached with these settings
    pub fn validate(&self) -> Result<(), AppError> {
        if self.backend_url.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "Backend URL is not set".to_string(),
            ));
        }
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(AppError::InvalidConfig(format!(
                "Backend URL must start with http:// or https://: {}",
                self.backend_url
            )));
        }
        if self.anon_key.trim().is_empty() {
            return Err(AppError::InvalidConfig("Anon key is not set".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::InvalidConfig(
                "Request timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }
}

/// Error types for the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Please sign in to save properties")]
    SignInRequired,

    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Serialization(err.to_string())
        } else if err.is_timeout() {
            AppError::Network(format!("Request timed out: {}", err))
        } else {
            AppError::Network(err.to_string())
        }
    }
}
