//! Application state for the Features API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use features_query::BuiltinCrs;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::backend::BackendRegistry;
use crate::catalog::StaticCatalog;
use crate::config::FeaturesConfig;
use crate::resolver::CollectionResolver;

/// Shared application state.
pub struct AppState {
    pub config: FeaturesConfig,

    pub resolver: CollectionResolver,

    pub crs: BuiltinCrs,

    /// API root used in every link (base URL plus API path).
    pub base_url: String,

    /// Set when a Prometheus recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Build backends from the configuration; memory sources are loaded here.
    pub async fn new(config: FeaturesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        let backends = BackendRegistry::from_config(&config.backends, client).await?;
        Ok(Self::with_backends(config, backends))
    }

    pub fn with_backends(config: FeaturesConfig, backends: BackendRegistry) -> Self {
        let mut resolver = CollectionResolver::new(backends, config.exposed_services.clone());
        if let Some(catalog) = &config.catalog {
            resolver = resolver.with_catalog(Arc::new(StaticCatalog::new(catalog.layers.clone())));
        }

        Self {
            base_url: config.api_url(),
            crs: BuiltinCrs::new(),
            resolver,
            config,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Root of the collection routes, scoped to a catalog context if any.
    pub fn context_url(&self, context: Option<&str>) -> String {
        match context {
            Some(context) => format!("{}/contexts/{}", self.base_url, urlencoding::encode(context)),
            None => self.base_url.clone(),
        }
    }
}
