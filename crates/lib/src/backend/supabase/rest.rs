//! Table API client.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use super::{ApiFailure, authorize, http_client};
use crate::{
    ClientConfig, Result,
    auth::IdentityProvider,
    store::{DataStore, Select, StoreError},
};

/// [`DataStore`] over the hosted table API.
pub struct SupabaseRest {
    config: ClientConfig,
    http: reqwest::Client,
    identity: Arc<dyn IdentityProvider>,
}

impl SupabaseRest {
    /// `identity` supplies the bearer token for every request.
    pub fn new(config: ClientConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        Ok(Self {
            http: http_client(&config)?,
            config,
            identity,
        })
    }

    /// The URL a select is sent to.
    pub fn select_url(&self, query: &Select) -> Url {
        let mut url = self.table_url(query.table());
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for filter in query.filters() {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
            }
            if let Some(order) = query.ordering() {
                pairs.append_pair(
                    "order",
                    &format!("{}.{}", order.column, order.direction.as_str()),
                );
            }
            if let Some(limit) = query.row_limit() {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        url
    }

    fn table_url(&self, table: &str) -> Url {
        self.config.endpoint(&format!("rest/v1/{table}"))
    }

    async fn send(&self, table: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let token = self.identity.access_token().await;
        let response = authorize(request, &self.config, token.as_deref())
            .send()
            .await
            .map_err(|e| StoreError::Transport {
                table: table.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let failure = ApiFailure::from_body(status, &body);
        debug!(table, status = failure.status, code = ?failure.code, "table request failed");
        Err(StoreError::Api {
            table: table.to_string(),
            status: failure.status,
            code: failure.code,
            message: failure.message,
        }
        .into())
    }
}

impl std::fmt::Debug for SupabaseRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseRest")
            .field("url", &self.config.url.as_str())
            .finish()
    }
}

#[async_trait]
impl DataStore for SupabaseRest {
    async fn select(&self, query: &Select) -> Result<Vec<Value>> {
        let url = self.select_url(query);
        trace!(%url, "select");
        let response = self.send(query.table(), self.http.get(url)).await?;
        response.json::<Vec<Value>>().await.map_err(|e| {
            StoreError::Decode {
                table: query.table().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<()> {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&row);
        self.send(table, request).await?;
        trace!(table, "inserted row");
        Ok(())
    }
}
