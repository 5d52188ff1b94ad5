//! Backend targets: the data services behind collections.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use features_protocol::FeaturesError;
use features_query::{BackendPage, BackendPagination, FilterExpression, StructuredQuery};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{BackendConfig, BackendSource};
use crate::memory::MemoryBackend;
use crate::remote::HttpBackend;

/// Record layout of a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// GeoJSON features with members under `properties`.
    #[default]
    Features,
    /// Flat records queried by their own field names.
    Generic,
}

/// Static facts about a backend target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    /// Service path, e.g. `api/hubeau-stations`.
    pub name: String,
    pub kind: BackendKind,
    pub remote: bool,
    pub pagination: BackendPagination,
}

impl BackendDescriptor {
    pub fn new(name: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            name: name.into(),
            kind,
            remote: true,
            pagination: BackendPagination::default(),
        }
    }

    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_pagination(mut self, pagination: BackendPagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Last path segment of the service name.
    pub fn derived_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn is_features(&self) -> bool {
        self.kind == BackendKind::Features
    }
}

impl From<&BackendConfig> for BackendDescriptor {
    fn from(config: &BackendConfig) -> Self {
        BackendDescriptor::new(&config.name, config.kind)
            .with_remote(config.remote)
            .with_pagination(config.pagination)
    }
}

/// A data service able to run structured queries.
#[async_trait]
pub trait BackendTarget: Send + Sync {
    fn descriptor(&self) -> &BackendDescriptor;

    /// Run a query; `total` counts all matches regardless of paging.
    async fn find(&self, query: &StructuredQuery) -> Result<BackendPage, FeaturesError>;

    /// Fetch one record, which must also satisfy the bound filter if any.
    async fn get(&self, id: &str, bound: Option<&FilterExpression>) -> Result<Value, FeaturesError>;
}

/// Live backend targets, in declaration order.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    targets: Vec<Arc<dyn BackendTarget>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: Arc<dyn BackendTarget>) {
        tracing::info!(
            backend = %target.descriptor().name,
            kind = ?target.descriptor().kind,
            "Registered backend target"
        );
        self.targets.push(target);
    }

    pub fn with_target(mut self, target: Arc<dyn BackendTarget>) -> Self {
        self.register(target);
        self
    }

    /// Target whose full or derived name matches.
    pub fn get(&self, name: &str) -> Option<Arc<dyn BackendTarget>> {
        self.targets
            .iter()
            .find(|t| t.descriptor().name == name || t.descriptor().derived_name() == name)
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn BackendTarget>> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Build every configured target; memory sources are read now.
    pub async fn from_config(configs: &[BackendConfig], client: reqwest::Client) -> Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            let descriptor = BackendDescriptor::from(config);
            let target: Arc<dyn BackendTarget> = match &config.source {
                BackendSource::Memory { path } => Arc::new(
                    MemoryBackend::from_file(descriptor, path)
                        .await
                        .with_context(|| format!("Failed to load backend {}", config.name))?,
                ),
                BackendSource::Http { url } => {
                    Arc::new(HttpBackend::new(descriptor, url.clone(), client.clone()))
                }
            };
            registry.register(target);
        }
        Ok(registry)
    }
}
