//! Backend target published by a remote service over HTTP.
//!
//! The remote side exposes two endpoints:
//! - `POST {url}/query` taking a structured query, answering `{records, total}`
//! - `POST {url}/records/{id}` taking `{filter}`, answering the record or 404

use async_trait::async_trait;
use features_protocol::FeaturesError;
use features_query::{BackendPage, FilterExpression, StructuredQuery};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::backend::{BackendDescriptor, BackendTarget};

pub struct HttpBackend {
    descriptor: BackendDescriptor,
    url: String,
    client: Client,
}

#[derive(Serialize)]
struct GetRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a FilterExpression>,
}

impl HttpBackend {
    pub fn new(descriptor: BackendDescriptor, url: impl Into<String>, client: Client) -> Self {
        Self {
            descriptor,
            url: url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn unavailable(&self, error: impl std::fmt::Display) -> FeaturesError {
        warn!(backend = %self.descriptor.name, error = %error, "Remote backend request failed");
        FeaturesError::general(format!("Backend {} is unavailable", self.descriptor.derived_name()))
    }
}

#[async_trait]
impl BackendTarget for HttpBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    #[instrument(skip(self, query), fields(backend = %self.descriptor.name))]
    async fn find(&self, query: &StructuredQuery) -> Result<BackendPage, FeaturesError> {
        let response = self
            .client
            .post(format!("{}/query", self.url))
            .json(query)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        if response.status() == StatusCode::BAD_REQUEST {
            let message = response.text().await.unwrap_or_default();
            return Err(FeaturesError::bad_request(message));
        }
        let response = response.error_for_status().map_err(|e| self.unavailable(e))?;
        let page: BackendPage = response.json().await.map_err(|e| self.unavailable(e))?;

        debug!(total = page.total, returned = page.records.len(), "Remote query answered");
        Ok(page)
    }

    #[instrument(skip(self, bound), fields(backend = %self.descriptor.name))]
    async fn get(&self, id: &str, bound: Option<&FilterExpression>) -> Result<Value, FeaturesError> {
        let response = self
            .client
            .post(format!("{}/records/{}", self.url, urlencoding::encode(id)))
            .json(&GetRequest { filter: bound })
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FeaturesError::not_found(format!("No record found for id '{}'", id)));
        }
        let response = response.error_for_status().map_err(|e| self.unavailable(e))?;
        response.json().await.map_err(|e| self.unavailable(e))
    }
}
