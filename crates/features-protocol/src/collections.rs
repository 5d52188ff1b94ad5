//! Features Collection types.
//!
//! A collection is one backend service (optionally narrowed by a bound
//! filter) addressable under `/collections/{id}`.

use serde::{Deserialize, Serialize};

use crate::crs::{CRS84, CRS84H};
use crate::media_types;
use crate::types::{Extent, Link};

/// A list of collections available from the Features API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionList {
    pub collections: Vec<Collection>,

    pub links: Vec<Link>,
}

impl CollectionList {
    /// Create a new collection list.
    pub fn new(collections: Vec<Collection>, base_url: &str) -> Self {
        Self {
            collections,
            links: vec![Link::new(format!("{}/collections", base_url), "self")
                .with_type(media_types::JSON)
                .with_title("Collections")],
        }
    }
}

/// A feature collection description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    /// Unique identifier for the collection.
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Always `feature` for this API.
    #[serde(rename = "itemType")]
    pub item_type: String,

    pub links: Vec<Link>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,

    /// Coordinate reference systems supported.
    pub crs: Vec<String>,

    #[serde(rename = "storageCrs")]
    pub storage_crs: String,
}

impl Collection {
    /// Create a new collection with required fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            item_type: "feature".to_string(),
            links: Vec::new(),
            extent: None,
            crs: vec![CRS84.to_string(), CRS84H.to_string()],
            storage_crs: CRS84.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the extent; an empty extent is dropped.
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = if extent.is_empty() { None } else { Some(extent) };
        self
    }

    /// Build the self and items links for this collection.
    ///
    /// The id is used as-is in the path, so callers pass an already
    /// URL-safe identifier.
    pub fn build_links(mut self, base_url: &str) -> Self {
        let href = format!("{}/collections/{}", base_url, self.id);
        self.links = vec![
            Link::new(&href, "self")
                .with_type(media_types::JSON)
                .with_title("This collection"),
            Link::new(format!("{}/items", href), "items")
                .with_type(media_types::GEO_JSON)
                .with_title(self.title.clone().unwrap_or_else(|| self.id.clone())),
        ];
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_defaults() {
        let collection = Collection::new("stations");
        assert_eq!(collection.item_type, "feature");
        assert_eq!(collection.storage_crs, CRS84);
        assert_eq!(collection.crs.len(), 2);
        assert!(collection.extent.is_none());
    }

    #[test]
    fn test_collection_links() {
        let collection = Collection::new("hubeau-observations")
            .with_title("Observations")
            .build_links("http://localhost:8081/api");

        assert_eq!(collection.links.len(), 2);
        assert_eq!(collection.links[0].rel, "self");
        assert_eq!(
            collection.links[1].href,
            "http://localhost:8081/api/collections/hubeau-observations/items"
        );
        assert_eq!(collection.links[1].type_.as_deref(), Some(media_types::GEO_JSON));
    }

    #[test]
    fn test_empty_extent_is_dropped() {
        let collection = Collection::new("x").with_extent(Extent::default());
        assert!(collection.extent.is_none());
    }

    #[test]
    fn test_collection_serialization_names() {
        let json = serde_json::to_value(Collection::new("x")).unwrap();
        assert_eq!(json["itemType"], "feature");
        assert_eq!(json["storageCrs"], CRS84);
    }

    #[test]
    fn test_collection_list_self_link() {
        let list = CollectionList::new(vec![Collection::new("a")], "http://localhost/api");
        assert_eq!(list.links[0].href, "http://localhost/api/collections");
        assert_eq!(list.collections.len(), 1);
    }
}
