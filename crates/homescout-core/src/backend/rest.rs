// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - PostgREST property store

use super::{http_client, send};
use crate::store::{PropertyStore, INQUIRIES, PROPERTIES, SAVED_PROPERTIES, VIEWED_PROPERTIES};
use crate::types::{AppError, AppSettings, Property, Session};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct SavedLinkRow {
    property_id: String,
}

#[derive(Serialize)]
struct NewSavedLink<'a> {
    user_id: &'a str,
    property_id: &'a str,
}

#[derive(Deserialize)]
struct IdRow {
    id: serde_json::Value,
}

impl IdRow {
    fn into_string(self) -> String {
        match self.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

/// PostgREST `eq` filter value
fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// PostgREST `in` filter value with every id quoted
fn in_list(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Property store backed by the hosted PostgREST API
pub struct RestPropertyStore {
    http: Client,
    rest_url: String,
    anon_key: String,
}

impl RestPropertyStore {
    pub fn new(settings: &AppSettings) -> Result<Self, AppError> {
        settings.validate()?;

        Ok(Self {
            http: http_client(settings)?,
            rest_url: format!("{}/rest/v1", settings.base_url()),
            anon_key: settings.anon_key.clone(),
        })
    }

    fn request(&self, method: Method, table: &str, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        bearer: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        tracing::debug!("GET {} {:?}", table, query);

        let response = send(self.request(Method::GET, table, bearer).query(query)).await?;
        response.json().await.map_err(|e| {
            AppError::Serialization(format!("Failed to parse {} rows: {}", table, e))
        })
    }

    async fn select_ids(&self, table: &str, session: &Session) -> Result<Vec<String>, AppError> {
        let rows: Vec<IdRow> = self
            .select(
                table,
                &session.access_token,
                &[
                    ("select", "id".to_string()),
                    ("user_id", eq(&session.user_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(IdRow::into_string).collect())
    }
}

#[async_trait]
impl PropertyStore for RestPropertyStore {
    async fn saved_property_ids(&self, session: &Session) -> Result<Vec<String>, AppError> {
        let rows: Vec<SavedLinkRow> = self
            .select(
                SAVED_PROPERTIES,
                &session.access_token,
                &[
                    ("select", "property_id".to_string()),
                    ("user_id", eq(&session.user_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.property_id).collect())
    }

    async fn insert_saved(&self, session: &Session, property_id: &str) -> Result<(), AppError> {
        tracing::debug!("Saving property {} for {}", property_id, session.user_id);

        let link = NewSavedLink {
            user_id: &session.user_id,
            property_id,
        };
        send(
            self.request(Method::POST, SAVED_PROPERTIES, &session.access_token)
                .header("Prefer", "return=minimal")
                .json(&link),
        )
        .await?;
        Ok(())
    }

    async fn delete_saved(&self, session: &Session, property_id: &str) -> Result<(), AppError> {
        tracing::debug!("Unsaving property {} for {}", property_id, session.user_id);

        send(
            self.request(Method::DELETE, SAVED_PROPERTIES, &session.access_token)
                .query(&[
                    ("user_id", eq(&session.user_id)),
                    ("property_id", eq(property_id)),
                ]),
        )
        .await?;
        Ok(())
    }

    async fn viewed_ids(&self, session: &Session) -> Result<Vec<String>, AppError> {
        self.select_ids(VIEWED_PROPERTIES, session).await
    }

    async fn inquiry_ids(&self, session: &Session) -> Result<Vec<String>, AppError> {
        self.select_ids(INQUIRIES, session).await
    }

    async fn properties_by_ids(&self, ids: &[String]) -> Result<Vec<Property>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.select(
            PROPERTIES,
            &self.anon_key,
            &[("select", "*".to_string()), ("id", in_list(ids))],
        )
        .await
    }

    async fn list_properties(&self) -> Result<Vec<Property>, AppError> {
        self.select(
            PROPERTIES,
            &self.anon_key,
            &[
                ("select", "*".to_string()),
                ("order", "featured.desc,created_at.desc".to_string()),
            ],
        )
        .await
    }
}
