//! OGC API - Features Protocol
//!
//! Wire types shared by the query engine and the HTTP service: links,
//! extents, collections, landing page, conformance declaration, GeoJSON
//! geometries and the error taxonomy.
//!
//! # Conformance Classes
//!
//! - Core
//! - GeoJSON
//! - OpenAPI 3.0
//! - Filter / Features Filter (CQL-JSON and a CQL-text subset)
//!
//! # Example
//!
//! ```rust
//! use features_protocol::{LandingPage, Link};
//!
//! let landing = LandingPage::new(
//!     "Features API",
//!     "Backend services exposed as OGC API Features",
//!     "http://localhost:8081/api",
//! );
//! assert_eq!(landing.links[0].rel, "self");
//! ```

pub mod types;
pub mod collections;
pub mod geojson;
pub mod responses;
pub mod errors;

// Re-export commonly used types
pub use types::{Link, Extent, SpatialExtent, TemporalExtent};
pub use collections::{Collection, CollectionList};
pub use geojson::{Geometry, Position};
pub use responses::{LandingPage, ConformanceClasses, ExceptionResponse, HealthStatus};
pub use errors::FeaturesError;

/// OGC API Features conformance class URIs
pub mod conformance {
    /// Core conformance class
    pub const CORE: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/core";
    /// OpenAPI 3.0 conformance class
    pub const OAS30: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/oas30";
    /// GeoJSON conformance class
    pub const GEOJSON: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/geojson";
    /// Filter conformance class
    pub const FILTER: &str = "http://www.opengis.net/spec/ogcapi-features-3/1.0/conf/filter";
    /// Features filter conformance class
    pub const FEATURES_FILTER: &str =
        "http://www.opengis.net/spec/ogcapi-features-3/1.0/conf/features-filter";
    /// Simple CQL conformance class
    pub const SIMPLE_CQL: &str = "http://www.opengis.net/spec/ogcapi-features-3/1.0/conf/simple-cql";
    /// CQL JSON encoding
    pub const CQL_JSON: &str = "http://www.opengis.net/spec/ogcapi-features-3/1.0/conf/cql-json";
    /// CQL text encoding
    pub const CQL_TEXT: &str = "http://www.opengis.net/spec/ogcapi-features-3/1.0/conf/cql-text";
}

/// Coordinate reference system URIs advertised by collections
pub mod crs {
    /// WGS84 longitude/latitude
    pub const CRS84: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";
    /// WGS84 longitude/latitude/ellipsoidal height
    pub const CRS84H: &str = "http://www.opengis.net/def/crs/OGC/0/CRS84h";
}

/// Media types used in Features responses
pub mod media_types {
    /// GeoJSON media type
    pub const GEO_JSON: &str = "application/geo+json";
    /// JSON media type
    pub const JSON: &str = "application/json";
    /// OpenAPI JSON media type
    pub const OPENAPI_JSON: &str = "application/vnd.oai.openapi+json;version=3.0";
}
