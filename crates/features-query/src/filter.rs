//! The structured query model sent to backend targets.
//!
//! Every field name inside a [`StructuredQuery`] is already qualified
//! for the backend's property namespace.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use features_protocol::Geometry;
use serde::{Serialize, Serializer};

use crate::coerce::{format_instant, CoercedValue};

/// Members that live at the feature root and are never namespaced.
pub const ROOT_FIELDS: &[&str] = &["time", "geometry"];

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl ComparisonOp {
    pub const ALL: [(&'static str, ComparisonOp); 5] = [
        ("eq", ComparisonOp::Eq),
        ("lt", ComparisonOp::Lt),
        ("gt", ComparisonOp::Gt),
        ("lte", ComparisonOp::Lte),
        ("gte", ComparisonOp::Gte),
    ];
}

/// A predicate tree built from CQL or from query parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "args", rename_all = "camelCase")]
pub enum FilterExpression {
    Comparison {
        op: ComparisonOp,
        field: String,
        value: CoercedValue,
    },
    Between {
        field: String,
        lower: CoercedValue,
        upper: CoercedValue,
    },
    In {
        field: String,
        values: Vec<CoercedValue>,
    },
    IsNull {
        field: String,
    },
    /// Negation scoped to the single field its inner expression targets.
    Not {
        field: String,
        inner: Box<FilterExpression>,
    },
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
    Before {
        field: String,
        #[serde(serialize_with = "serialize_instant")]
        value: DateTime<Utc>,
    },
    After {
        field: String,
        #[serde(serialize_with = "serialize_instant")]
        value: DateTime<Utc>,
    },
    During {
        field: String,
        #[serde(serialize_with = "serialize_instant")]
        lower: DateTime<Utc>,
        #[serde(serialize_with = "serialize_instant")]
        upper: DateTime<Utc>,
    },
    Intersects {
        field: String,
        geometry: Geometry,
    },
    Within {
        field: String,
        geometry: Geometry,
    },
}

fn serialize_instant<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_instant(dt))
}

impl FilterExpression {
    pub fn comparison(op: ComparisonOp, field: impl Into<String>, value: CoercedValue) -> Self {
        FilterExpression::Comparison {
            op,
            field: field.into(),
            value,
        }
    }

    /// Distinct field names this expression constrains.
    pub fn target_fields(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut BTreeSet<&'a str>) {
        match self {
            FilterExpression::And(items) | FilterExpression::Or(items) => {
                for item in items {
                    item.collect_fields(fields);
                }
            }
            FilterExpression::Comparison { field, .. }
            | FilterExpression::Between { field, .. }
            | FilterExpression::In { field, .. }
            | FilterExpression::IsNull { field }
            | FilterExpression::Not { field, .. }
            | FilterExpression::Before { field, .. }
            | FilterExpression::After { field, .. }
            | FilterExpression::During { field, .. }
            | FilterExpression::Intersects { field, .. }
            | FilterExpression::Within { field, .. } => {
                fields.insert(field.as_str());
            }
        }
    }
}

/// How field names map onto backend record paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyNamespace {
    /// Feature properties live under `properties.`.
    Properties,
    /// Fields are used as given.
    Root,
}

impl PropertyNamespace {
    pub const PREFIX: &'static str = "properties.";

    /// Qualify a field name; root members and already-prefixed names are kept.
    pub fn qualify(&self, field: &str) -> String {
        match self {
            PropertyNamespace::Properties
                if !ROOT_FIELDS.contains(&field) && !field.starts_with(Self::PREFIX) =>
            {
                format!("{}{}", Self::PREFIX, field)
            }
            _ => field.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Bounding box constraint in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialBounds {
    pub south: f64,
    pub north: f64,
    pub east: f64,
    pub west: f64,
}

impl SpatialBounds {
    pub fn to_geometry(&self) -> Geometry {
        Geometry::from_bbox(self.west, self.south, self.east, self.north)
    }
}

/// An equality property filter value; repeated parameters give several.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Single(CoercedValue),
    Multiple(Vec<CoercedValue>),
}

impl PropertyValue {
    pub fn values(&self) -> Vec<&CoercedValue> {
        match self {
            PropertyValue::Single(v) => vec![v],
            PropertyValue::Multiple(vs) => vs.iter().collect(),
        }
    }
}

/// Backend-agnostic query built from one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial: Option<SpatialBounds>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<FilterExpression>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl StructuredQuery {
    /// AND an expression into the predicate, flattening nested conjunctions.
    ///
    /// Empty conjunctions are no-ops.
    pub fn and_predicate(&mut self, expr: FilterExpression) {
        let incoming = match expr {
            FilterExpression::And(items) => items,
            other => vec![other],
        };
        if incoming.is_empty() {
            return;
        }

        let mut items = match self.predicate.take() {
            None => Vec::new(),
            Some(FilterExpression::And(items)) => items,
            Some(existing) => vec![existing],
        };
        items.extend(incoming);
        self.predicate = Some(if items.len() == 1 {
            items.remove(0)
        } else {
            FilterExpression::And(items)
        });
    }

    pub fn sorts_on(&self, field: &str) -> bool {
        self.sort.iter().any(|key| key.field == field)
    }
}
