//! Core Features types used across the API.

use serde::{Deserialize, Serialize};

use crate::crs::CRS84;

/// A hyperlink to a related resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// The URI of the linked resource.
    pub href: String,

    /// The relationship type (e.g., "self", "next", "items").
    pub rel: String,

    /// The media type of the linked resource.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// A human-readable title for the link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    /// Create a new link with required fields.
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            type_: None,
            title: None,
        }
    }

    /// Set the media type.
    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// The spatial and temporal extent of a collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Extent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial: Option<SpatialExtent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalExtent>,
}

impl Extent {
    /// Create an extent with spatial bounds in CRS84.
    pub fn with_spatial(bbox: [f64; 4]) -> Self {
        Self {
            spatial: Some(SpatialExtent {
                bbox: vec![bbox.to_vec()],
                crs: CRS84.to_string(),
            }),
            temporal: None,
        }
    }

    /// Add temporal extent (builder pattern).
    pub fn with_temporal(mut self, temporal: TemporalExtent) -> Self {
        self.temporal = Some(temporal);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.spatial.is_none() && self.temporal.is_none()
    }
}

/// Spatial extent with bounding box.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpatialExtent {
    /// Bounding boxes as [west, south, east, north] arrays.
    pub bbox: Vec<Vec<f64>>,

    #[serde(default = "default_crs")]
    pub crs: String,
}

fn default_crs() -> String {
    CRS84.to_string()
}

/// Temporal extent with time intervals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporalExtent {
    /// Time intervals as [start, end] pairs (ISO 8601), null when open.
    pub interval: Vec<Vec<Option<String>>>,

    /// Sampling step of the collection (ISO 8601 duration).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub every: Option<String>,

    #[serde(default = "default_trs")]
    pub trs: String,
}

fn default_trs() -> String {
    "http://www.opengis.net/def/uom/ISO-8601/0/Gregorian".to_string()
}

impl TemporalExtent {
    /// Create a temporal extent from start and end times.
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self {
            interval: vec![vec![start, end]],
            every: None,
            trs: default_trs(),
        }
    }

    pub fn with_every(mut self, every: impl Into<String>) -> Self {
        self.every = Some(every.into());
        self
    }
}
