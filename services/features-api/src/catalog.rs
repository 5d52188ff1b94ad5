//! Layer catalog collaborator.
//!
//! A layer describes one backend service (and optionally a companion
//! "probe" service listing stations) plus filters that derive virtual
//! collections.

use async_trait::async_trait;
use features_protocol::FeaturesError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalog metadata for one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Backend service holding the layer features (measures).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Backend service holding the layer stations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_service: Option<String>,

    /// Catalog scope the layer belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// [west, south, east, north] in CRS84.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    /// Start of the temporal extent, an instant or a duration before now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<LayerFilter>,
}

impl Layer {
    /// Minimal layer standing for a bare backend service.
    pub fn for_service(service: impl Into<String>) -> Self {
        let service = service.into();
        Self {
            name: service.clone(),
            service: Some(service),
            ..Default::default()
        }
    }

    /// True when `service` or `probeService` is the given name.
    pub fn serves(&self, name: &str) -> bool {
        self.service.as_deref() == Some(name) || self.probe_service.as_deref() == Some(name)
    }
}

/// A named CQL-JSON predicate deriving a virtual collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// CQL-JSON expression bound to the derived collection.
    pub active: Value,
}

impl LayerFilter {
    /// Name used to build the derived collection id.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.label.as_deref())
    }
}

/// Catalog lookups used by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerQuery {
    /// Layers whose service or probe service is the given name.
    ByService(String),
    /// Every layer bound to a service.
    WithService,
}

impl LayerQuery {
    fn matches(&self, layer: &Layer) -> bool {
        match self {
            LayerQuery::ByService(name) => layer.serves(name),
            LayerQuery::WithService => layer.service.is_some(),
        }
    }
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Layers matching the query within the given context.
    async fn find(&self, query: &LayerQuery, context: Option<&str>) -> Result<Vec<Layer>, FeaturesError>;
}

/// Catalog backed by configured layers.
///
/// Without a context only layers that declare none are visible; with a
/// context only the layers of that context are.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    layers: Vec<Layer>,
}

impl StaticCatalog {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn find(&self, query: &LayerQuery, context: Option<&str>) -> Result<Vec<Layer>, FeaturesError> {
        Ok(self
            .layers
            .iter()
            .filter(|layer| layer.context.as_deref() == context && query.matches(layer))
            .cloned()
            .collect())
    }
}
