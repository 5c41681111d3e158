// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Hosted backend adapters
//
// The backend speaks PostgREST under /rest/v1 and a GoTrue-style auth API
// under /auth/v1. Both are authorized with the project's anon key; user
// calls additionally carry the session's bearer token.

pub mod auth;
pub mod rest;

pub use auth::AuthClient;
pub use rest::RestPropertyStore;

use crate::types::{AppError, AppSettings};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

fn http_client(settings: &AppSettings) -> Result<Client, AppError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Send a request and turn non-2xx responses into `AppError::Backend`
async fn send(request: RequestBuilder) -> Result<Response, AppError> {
    let response = request.send().await.map_err(|e| {
        if e.is_connect() {
            AppError::Network(format!("Cannot connect to backend: {}", e))
        } else {
            AppError::from(e)
        }
    })?;

    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Backend {
        status,
        message: error_message(&body),
    })
}

/// Pull a readable message out of a PostgREST or auth error body
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
