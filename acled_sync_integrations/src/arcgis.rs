//! ArcGIS feature-layer client.
//!
//! Speaks the feature-service REST protocol directly: `generateToken` for
//! session tokens (fetched once per run, cached), `query?returnIdsOnly` for
//! the match-all id scan, `deleteFeatures` and `addFeatures` for bulk edits.
//! ArcGIS reports failures inside HTTP-200 bodies, so every response is
//! checked for an `error` member before use.

use acled_sync_core::models::{EditSummary, Feature, Session};
use acled_sync_core::store::{FeatureStore, ObjectId};
use acled_sync_core::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::instrument;

const TOKEN_EXPIRATION_MINUTES: &str = "60";

/// Error payload ArcGIS embeds in otherwise-successful responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ArcGisApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ArcGisApiError {
    fn protocol(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            details: Vec::new(),
        }
    }
}

impl std::fmt::Display for ArcGisApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "arcgis error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ArcGisApiError {}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    error: Option<ArcGisApiError>,
}

#[derive(Debug, Deserialize)]
struct QueryIdsResponse {
    #[serde(default, rename = "objectIds")]
    object_ids: Option<Vec<ObjectId>>,
    #[serde(default)]
    error: Option<ArcGisApiError>,
}

#[derive(Debug, Deserialize)]
struct EditResultBody {
    #[serde(default, rename = "objectId")]
    object_id: i64,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default, rename = "deleteResults")]
    delete_results: Vec<EditResultBody>,
    #[serde(default)]
    error: Option<ArcGisApiError>,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(default, rename = "addResults")]
    add_results: Vec<EditResultBody>,
    #[serde(default)]
    error: Option<ArcGisApiError>,
}

pub struct ArcGisFeatureLayer {
    client: Client,
    layer_url: String,
    portal_url: String,
    token: RwLock<Option<String>>,
}

impl ArcGisFeatureLayer {
    pub fn new(layer_url: impl Into<String>, portal_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client");
        Self {
            client,
            layer_url: layer_url.into(),
            portal_url: portal_url.into(),
            token: RwLock::new(None),
        }
    }

    /// Fetch-or-reuse the session token. First caller pays the
    /// `generateToken` round-trip; the token then lives for the rest of the
    /// run, matching its server-side expiration to the run's bounded
    /// lifetime.
    async fn ensure_token(&self, session: &Session) -> Result<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        let mut guard = self.token.write().await;
        if let Some(token) = guard.clone() {
            return Ok(token);
        }

        let resp = self
            .client
            .post(format!("{}/generateToken", self.portal_url))
            .form(&[
                ("username", session.username()),
                ("password", session.password()),
                ("referer", self.portal_url.as_str()),
                ("expiration", TOKEN_EXPIRATION_MINUTES),
                ("f", "json"),
            ])
            .send()
            .await
            .map_err(|e| Error::store_query("generateToken", e))?;
        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::store_query("generateToken response", e))?;

        if let Some(err) = body.error {
            return Err(Error::store_query("generateToken", err));
        }
        let token = body.token.ok_or_else(|| {
            Error::store_query(
                "generateToken",
                ArcGisApiError::protocol("response carried neither token nor error"),
            )
        })?;

        *guard = Some(token.clone());
        Ok(token)
    }
}

fn summarize(results: &[EditResultBody]) -> EditSummary {
    let succeeded = results.iter().filter(|r| r.success).count();
    EditSummary {
        succeeded,
        failed: results.len() - succeeded,
    }
}

#[async_trait]
impl FeatureStore for ArcGisFeatureLayer {
    #[instrument(level = "debug", skip(self, session))]
    async fn query_object_ids(&self, session: &Session) -> Result<Vec<ObjectId>> {
        let token = self.ensure_token(session).await?;
        let resp = self
            .client
            .get(format!("{}/query", self.layer_url))
            .query(&[
                ("where", "1=1"),
                ("returnIdsOnly", "true"),
                ("f", "json"),
                ("token", token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::store_query("query object ids", e))?;
        let body: QueryIdsResponse = resp
            .json()
            .await
            .map_err(|e| Error::store_query("query response", e))?;

        if let Some(err) = body.error {
            return Err(Error::store_query("query object ids", err));
        }
        Ok(body.object_ids.unwrap_or_default())
    }

    #[instrument(level = "debug", skip(self, session, ids), fields(count = ids.len()))]
    async fn delete_features(&self, session: &Session, ids: &[ObjectId]) -> Result<EditSummary> {
        let token = self.ensure_token(session).await?;
        let id_list = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let resp = self
            .client
            .post(format!("{}/deleteFeatures", self.layer_url))
            .form(&[
                ("objectIds", id_list.as_str()),
                ("f", "json"),
                ("token", token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::store_write("delete features", e))?;
        let body: DeleteResponse = resp
            .json()
            .await
            .map_err(|e| Error::store_write("delete response", e))?;

        if let Some(err) = body.error {
            return Err(Error::store_write("delete features", err));
        }
        Ok(summarize(&body.delete_results))
    }

    #[instrument(level = "debug", skip(self, session))]
    async fn delete_all(&self, session: &Session) -> Result<EditSummary> {
        let token = self.ensure_token(session).await?;
        let resp = self
            .client
            .post(format!("{}/deleteFeatures", self.layer_url))
            .form(&[
                ("where", "1=1"),
                ("f", "json"),
                ("token", token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::store_write("delete all features", e))?;
        let body: DeleteResponse = resp
            .json()
            .await
            .map_err(|e| Error::store_write("delete response", e))?;

        if let Some(err) = body.error {
            return Err(Error::store_write("delete all features", err));
        }
        Ok(summarize(&body.delete_results))
    }

    #[instrument(level = "debug", skip(self, session, features), fields(count = features.len()))]
    async fn add_features(&self, session: &Session, features: &[Feature]) -> Result<EditSummary> {
        let token = self.ensure_token(session).await?;
        let payload = serde_json::to_string(features)
            .map_err(|e| Error::store_write("serialize features", e))?;
        let resp = self
            .client
            .post(format!("{}/addFeatures", self.layer_url))
            .form(&[
                ("features", payload.as_str()),
                ("f", "json"),
                ("token", token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::store_write("add features", e))?;
        let body: AddResponse = resp
            .json()
            .await
            .map_err(|e| Error::store_write("add response", e))?;

        if let Some(err) = body.error {
            return Err(Error::store_write("add features", err));
        }
        Ok(summarize(&body.add_results))
    }
}
