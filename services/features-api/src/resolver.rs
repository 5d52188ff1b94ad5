//! Mapping of collection identifiers onto backend targets.
//!
//! A collection id is a service name, optionally followed by `~` and the
//! slug of one of the layer's declared filters. Filtered collections are
//! virtual: they query the base service with the filter's predicate
//! ANDed in.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use features_protocol::{Collection, Extent, FeaturesError, TemporalExtent};
use features_query::coerce::format_instant;
use features_query::datetime;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::backend::{BackendDescriptor, BackendRegistry, BackendTarget};
use crate::catalog::{Catalog, Layer, LayerQuery};

/// Separator between a service name and a filter slug.
pub const FILTER_SEPARATOR: char = '~';

/// A parsed collection identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub service: String,
    pub filter: Option<String>,
}

impl CollectionRef {
    pub fn new(service: impl Into<String>, filter: Option<String>) -> Self {
        Self {
            service: service.into(),
            filter,
        }
    }

    /// Split on the first separator.
    pub fn parse(id: &str) -> Self {
        match id.split_once(FILTER_SEPARATOR) {
            Some((service, filter)) => Self::new(service, Some(filter.to_string())),
            None => Self::new(id, None),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}{}{}", self.service, FILTER_SEPARATOR, filter),
            None => write!(f, "{}", self.service),
        }
    }
}

/// Outcome of a resolution.
#[derive(Clone)]
pub struct ResolvedCollection {
    pub collection_ref: CollectionRef,
    pub target: Arc<dyn BackendTarget>,
    pub layer: Layer,
    /// CQL-JSON predicate of the selected layer filter.
    pub bound_filter: Option<Value>,
}

impl ResolvedCollection {
    pub fn id(&self) -> String {
        self.collection_ref.to_string()
    }

    pub fn descriptor(&self) -> &BackendDescriptor {
        self.target.descriptor()
    }
}

impl fmt::Debug for ResolvedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCollection")
            .field("collection_ref", &self.collection_ref)
            .field("backend", &self.target.descriptor().name)
            .field("layer", &self.layer.name)
            .field("bound_filter", &self.bound_filter)
            .finish()
    }
}

pub struct CollectionResolver {
    catalog: Option<Arc<dyn Catalog>>,
    backends: BackendRegistry,
    /// Generic services allowed to be exposed.
    exposed: Vec<String>,
}

impl CollectionResolver {
    pub fn new(backends: BackendRegistry, exposed: Vec<String>) -> Self {
        Self {
            catalog: None,
            backends,
            exposed,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    fn is_exposed(&self, descriptor: &BackendDescriptor) -> bool {
        descriptor.remote
            && (descriptor.is_features() || self.exposed.iter().any(|s| s == descriptor.derived_name()))
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, id: &str, context: Option<&str>) -> Result<ResolvedCollection, FeaturesError> {
        let collection_ref = CollectionRef::parse(id);
        let service = collection_ref.service.as_str();

        let (layer, target) = match &self.catalog {
            Some(catalog) => {
                let layer = catalog
                    .find(&LayerQuery::ByService(service.to_string()), context)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| FeaturesError::not_found(format!("Cannot find collection {}", service)))?;
                let target = self.backends.get(service).ok_or_else(|| {
                    FeaturesError::general(format!("Cannot find collection {} as its service is unavailable", service))
                })?;
                (layer, target)
            }
            None => {
                let target = self
                    .backends
                    .iter()
                    .find(|t| self.is_exposed(t.descriptor()) && t.descriptor().derived_name() == service)
                    .cloned()
                    .ok_or_else(|| FeaturesError::not_found(format!("Cannot find collection {}", service)))?;
                (Layer::for_service(service), target)
            }
        };

        let bound_filter = match &collection_ref.filter {
            Some(slug) => Some(
                layer
                    .filters
                    .iter()
                    .find(|f| f.display_name().is_some_and(|name| slug::slugify(name) == *slug))
                    .map(|f| f.active.clone())
                    .ok_or_else(|| {
                        FeaturesError::not_found(format!("Cannot find filter {} for collection {}", slug, service))
                    })?,
            ),
            None => None,
        };

        debug!(backend = %target.descriptor().name, filtered = bound_filter.is_some(), "Resolved collection");
        Ok(ResolvedCollection {
            collection_ref,
            target,
            layer,
            bound_filter,
        })
    }

    /// Every exposed collection, filtered ones included, deduplicated by id.
    #[instrument(skip(self))]
    pub async fn list_collections(&self, base_url: &str, context: Option<&str>) -> Result<Vec<Collection>, FeaturesError> {
        let now = Utc::now();
        let layers = match &self.catalog {
            Some(catalog) => catalog.find(&LayerQuery::WithService, context).await?,
            None => self
                .backends
                .iter()
                .map(|t| t.descriptor())
                .filter(|d| self.is_exposed(d))
                .map(|d| Layer::for_service(d.derived_name()))
                .collect(),
        };

        let mut seen = HashSet::new();
        let mut collections: Vec<Collection> = layers
            .iter()
            .flat_map(|layer| layer_collections(layer, base_url, now))
            .collect();
        collections.retain(|c| seen.insert(c.id.clone()));
        Ok(collections)
    }

    /// Metadata of a single collection.
    pub async fn describe(&self, id: &str, base_url: &str, context: Option<&str>) -> Result<Collection, FeaturesError> {
        let resolved = self.resolve(id, context).await?;
        let id = resolved.id();
        layer_collections(&resolved.layer, base_url, Utc::now())
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| FeaturesError::not_found(format!("Cannot find collection {}", id)))
    }
}

/// Collections derived from one layer: one per service (measures and
/// stations when a probe service exists), then one per declared filter
/// and base collection.
pub fn layer_collections(layer: &Layer, base_url: &str, now: DateTime<Utc>) -> Vec<Collection> {
    let bases: Vec<(&str, String)> = match (layer.service.as_deref(), layer.probe_service.as_deref()) {
        (Some(service), Some(probe)) => vec![
            (service, format!("{} (measures)", layer.name)),
            (probe, format!("{} (stations)", layer.name)),
        ],
        (Some(service), None) => vec![(service, layer.name.clone())],
        (None, Some(probe)) => vec![(probe, format!("{} (stations)", layer.name))],
        (None, None) => Vec::new(),
    };
    let extent = layer_extent(layer, now);

    let mut collections = Vec::new();
    for (service, title) in bases {
        collections.push(collection(CollectionRef::new(service, None), &title, layer, &extent, base_url));
        for filter in &layer.filters {
            if let Some(name) = filter.display_name() {
                let id = CollectionRef::new(service, Some(slug::slugify(name)));
                let title = format!("{} - {}", title, name);
                collections.push(collection(id, &title, layer, &extent, base_url));
            }
        }
    }
    collections
}

fn collection(id: CollectionRef, title: &str, layer: &Layer, extent: &Extent, base_url: &str) -> Collection {
    let mut collection = Collection::new(id.to_string())
        .with_title(title)
        .with_extent(extent.clone());
    if let Some(description) = &layer.description {
        collection = collection.with_description(description);
    }
    collection.build_links(base_url)
}

/// Spatial extent from the layer bbox; temporal extent from `from`/`to`
/// with durations taken back from now.
fn layer_extent(layer: &Layer, now: DateTime<Utc>) -> Extent {
    let mut extent = layer.bbox.map(Extent::with_spatial).unwrap_or_default();

    if layer.from.is_some() || layer.to.is_some() {
        let bound = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|raw| datetime::parse_bound(raw).ok().flatten())
                .map(|value| format_instant(&value.resolve(now)))
        };
        let mut temporal = TemporalExtent::new(bound(&layer.from), bound(&layer.to));
        if let Some(every) = &layer.every {
            temporal = temporal.with_every(every);
        }
        extent = extent.with_temporal(temporal);
    }
    extent
}
