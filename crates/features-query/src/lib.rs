//! Query and filter translation for OGC API Features.
//!
//! Converts OGC query parameters (`limit`, `offset`, `bbox`, `bbox-crs`,
//! `sortby`, `datetime`, `filter`, `filter-lang` and free property
//! filters) plus CQL expressions into a backend-agnostic
//! [`StructuredQuery`], computes pagination and projects backend results
//! into Features documents.
//!
//! Everything here is synchronous and free of I/O.
//!
//! # Example
//!
//! ```rust
//! use features_query::{translate, QueryParameters};
//!
//! let params: QueryParameters = vec![
//!     ("limit".to_string(), "10".to_string()),
//!     ("H".to_string(), "0.63".to_string()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let query = translate(&params, true).unwrap();
//! assert_eq!(query.limit, Some(10));
//! assert!(query.properties.contains_key("properties.H"));
//! ```

pub mod coerce;
pub mod cql;
pub mod crs;
pub mod datetime;
pub mod filter;
pub mod pagination;
pub mod params;
pub mod projector;
pub mod wkt;

pub use coerce::{coerce, coerce_all, CoercedValue};
pub use cql::{CqlTranslator, FilterLang};
pub use crs::{BuiltinCrs, CrsCode, CrsTransform};
pub use datetime::{DateTimeSpec, DateTimeValue};
pub use filter::{
    ComparisonOp, FilterExpression, PropertyNamespace, PropertyValue, SortDirection, SortKey,
    SpatialBounds, StructuredQuery,
};
pub use pagination::{
    build_links, compute_effective, BackendPagination, EffectivePage, PaginationPolicy,
    PaginationSettings,
};
pub use params::{translate, QueryParameters, QueryTranslator, TranslationOptions};
pub use projector::{BackendPage, FeatureCollectionEnvelope, ResultProjector};
