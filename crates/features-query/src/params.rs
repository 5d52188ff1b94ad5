//! Translation of OGC query parameters into a [`StructuredQuery`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use features_protocol::FeaturesError;
use serde_json::Value;
use tracing::debug;

use crate::coerce::{coerce, CoercedValue};
use crate::cql::{CqlTranslator, FilterLang};
use crate::crs::{BuiltinCrs, CrsCode, CrsTransform};
use crate::datetime::{self, DateTimeSpec};
use crate::filter::{
    ComparisonOp, FilterExpression, PropertyNamespace, PropertyValue, SortDirection, SortKey,
    SpatialBounds, StructuredQuery,
};

/// Token used by OGC conformance suites to probe unknown parameters.
pub const UNKNOWN_PARAMETER_PROBE: &str = "unknownQueryParameter";

/// Parameters consumed by the translator itself.
pub const RECOGNIZED_PARAMETERS: &[&str] = &[
    "limit",
    "offset",
    "bbox",
    "bbox-crs",
    "sortby",
    "datetime",
    "filter",
    "filter-lang",
    "f",
];

/// Internal time member of features.
pub const TIME_FIELD: &str = "time";

/// Raw query parameters in wire order. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters(Vec<(String, String)>);

impl QueryParameters {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First non-empty value of a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy without the given keys.
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .cloned()
                .collect(),
        )
    }
}

impl FromIterator<(String, String)> for QueryParameters {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-request translation settings.
#[derive(Debug, Clone)]
pub struct TranslationOptions {
    pub namespace: PropertyNamespace,
    /// Canonical features backends get a default descending time sort.
    pub features_backend: bool,
    /// Parameters never turned into property filters (auth tokens).
    pub reserved: Vec<String>,
    pub now: DateTime<Utc>,
}

impl TranslationOptions {
    /// Defaults for a canonical features backend or a generic one.
    pub fn new(features_backend: bool) -> Self {
        Self {
            namespace: if features_backend {
                PropertyNamespace::Properties
            } else {
                PropertyNamespace::Root
            },
            features_backend,
            reserved: vec!["jwt".to_string(), "token".to_string()],
            now: Utc::now(),
        }
    }

    pub fn with_reserved(mut self, reserved: Vec<String>) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_namespace(mut self, namespace: PropertyNamespace) -> Self {
        self.namespace = namespace;
        self
    }
}

/// Builds one [`StructuredQuery`] from parameters, an optional POST body
/// and an optional filter bound to the collection.
pub struct QueryTranslator<'a> {
    options: TranslationOptions,
    crs: &'a dyn CrsTransform,
    bound_filter: Option<&'a Value>,
    body: Option<&'a Value>,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(options: TranslationOptions, crs: &'a dyn CrsTransform) -> Self {
        Self {
            options,
            crs,
            bound_filter: None,
            body: None,
        }
    }

    /// CQL-JSON predicate ANDed into every query.
    pub fn with_bound_filter(mut self, filter: Option<&'a Value>) -> Self {
        self.bound_filter = filter;
        self
    }

    /// CQL-JSON request body (POST items).
    pub fn with_body(mut self, body: Option<&'a Value>) -> Self {
        self.body = body;
        self
    }

    pub fn options(&self) -> &TranslationOptions {
        &self.options
    }

    pub fn translate(&self, params: &QueryParameters) -> Result<StructuredQuery, FeaturesError> {
        if params.iter().any(|(key, _)| key.contains(UNKNOWN_PARAMETER_PROBE)) {
            return Err(FeaturesError::bad_request("Invalid query parameter"));
        }

        let mut query = StructuredQuery {
            limit: parse_count(params.get("limit"), "Invalid limit parameter")?,
            skip: parse_count(params.get("offset"), "Invalid offset parameter")?,
            ..Default::default()
        };

        if let Some(bbox) = params.get("bbox") {
            query.spatial = Some(self.bbox(bbox, params.get("bbox-crs"))?);
        }

        if let Some(sortby) = params.get("sortby") {
            query.sort = self.sortby(sortby);
        }

        if let Some(raw) = params.get("datetime") {
            self.datetime(raw, &mut query)?;
        }

        let cql = CqlTranslator::new(self.options.namespace, self.options.now);
        if let Some(filter) = params.get("filter") {
            let lang = match params.get("filter-lang") {
                Some(lang) => lang.parse::<FilterLang>()?,
                None => FilterLang::default(),
            };
            let body = match lang {
                FilterLang::CqlJson => serde_json::from_str(filter).map_err(|_| {
                    FeaturesError::bad_request("Invalid filter parameter, a CQL JSON expression is expected")
                })?,
                FilterLang::CqlText => Value::String(filter.to_string()),
            };
            query.and_predicate(cql.translate(&body, lang)?);
        }
        if let Some(body) = self.body {
            query.and_predicate(cql.translate_json(body)?);
        }
        if let Some(bound) = self.bound_filter {
            query.and_predicate(cql.translate_json(bound)?);
        }

        query.properties = self.property_filters(params);

        debug!(query = ?query, "Translated query parameters");
        Ok(query)
    }

    fn bbox(&self, raw: &str, crs: Option<&str>) -> Result<SpatialBounds, FeaturesError> {
        let tokens: Vec<&str> = raw.split(',').collect();
        if tokens.len() < 4 {
            return Err(FeaturesError::bad_request(
                "The bounding box parameter shall have at least four numbers",
            ));
        }
        let numbers = tokens[..4]
            .iter()
            .map(|t| t.trim().parse::<f64>().ok().filter(|n| n.is_finite()))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| FeaturesError::bad_request("Invalid bounding box parameter"))?;

        let (mut west, mut south, mut east, mut north) = (numbers[0], numbers[1], numbers[2], numbers[3]);

        if let Some(crs) = crs {
            let code = self.crs.lookup(crs)?;
            if code != CrsCode::Crs84 {
                (west, south) = self.crs.reproject(west, south, code)?;
                (east, north) = self.crs.reproject(east, north, code)?;
            }
        }

        Ok(SpatialBounds {
            south,
            north,
            east,
            west,
        })
    }

    fn sortby(&self, raw: &str) -> Vec<SortKey> {
        raw.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                let direction = if token.starts_with('-') {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                let field = token.trim_start_matches(['-', '+']);
                let field = if field == TIME_FIELD {
                    TIME_FIELD.to_string()
                } else {
                    self.options.namespace.qualify(field)
                };
                SortKey::new(field, direction)
            })
            .collect()
    }

    fn datetime(&self, raw: &str, query: &mut StructuredQuery) -> Result<(), FeaturesError> {
        let now = self.options.now;

        match datetime::parse(raw)? {
            DateTimeSpec::Single(Some(value)) => query.and_predicate(FilterExpression::comparison(
                ComparisonOp::Eq,
                TIME_FIELD,
                CoercedValue::DateTime(value.resolve(now)),
            )),
            DateTimeSpec::Single(None) => {}
            DateTimeSpec::Interval(start, end) => {
                if let Some(start) = start {
                    query.and_predicate(FilterExpression::comparison(
                        ComparisonOp::Gte,
                        TIME_FIELD,
                        CoercedValue::DateTime(start.resolve(now)),
                    ));
                }
                if let Some(end) = end {
                    query.and_predicate(FilterExpression::comparison(
                        ComparisonOp::Lte,
                        TIME_FIELD,
                        CoercedValue::DateTime(end.resolve(now)),
                    ));
                }
            }
        }

        if self.options.features_backend && !query.sorts_on(TIME_FIELD) {
            query.sort.push(SortKey::new(TIME_FIELD, SortDirection::Desc));
        }
        Ok(())
    }

    fn property_filters(&self, params: &QueryParameters) -> BTreeMap<String, PropertyValue> {
        let mut grouped: BTreeMap<String, Vec<CoercedValue>> = BTreeMap::new();
        for (key, value) in params.iter() {
            if value.is_empty()
                || RECOGNIZED_PARAMETERS.contains(&key)
                || self.options.reserved.iter().any(|r| r == key)
            {
                continue;
            }
            grouped
                .entry(self.options.namespace.qualify(key))
                .or_default()
                .push(coerce(value));
        }

        grouped
            .into_iter()
            .map(|(key, mut values)| {
                let value = if values.len() == 1 {
                    PropertyValue::Single(values.remove(0))
                } else {
                    PropertyValue::Multiple(values)
                };
                (key, value)
            })
            .collect()
    }
}

/// Validate a `limit`/`offset` value: finite, non-negative, truncated.
fn parse_count(raw: Option<&str>, message: &str) -> Result<Option<u64>, FeaturesError> {
    match raw {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && n >= 0.0 => Ok(Some(n.trunc() as u64)),
            _ => Err(FeaturesError::bad_request(message)),
        },
    }
}

/// Translate with the built-in CRS support and the current time.
pub fn translate(params: &QueryParameters, features_backend: bool) -> Result<StructuredQuery, FeaturesError> {
    let crs = BuiltinCrs::new();
    QueryTranslator::new(TranslationOptions::new(features_backend), &crs).translate(params)
}
