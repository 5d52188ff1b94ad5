//! In-memory backend target.
//!
//! Records are plain JSON values loaded once; every structured query is
//! evaluated by a linear scan. Suitable for reference data sets and tests.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use features_protocol::{FeaturesError, Geometry, Position};
use features_query::datetime::parse_instant;
use features_query::projector::INTERNAL_ID;
use features_query::{
    BackendPage, CoercedValue, ComparisonOp, FilterExpression, SortDirection, SortKey, SpatialBounds,
    StructuredQuery,
};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::backend::{BackendDescriptor, BackendTarget};

pub struct MemoryBackend {
    descriptor: BackendDescriptor,
    records: Vec<Value>,
}

impl MemoryBackend {
    /// Records without `_id` or `id` get their position as `_id`.
    pub fn new(descriptor: BackendDescriptor, records: Vec<Value>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(index, mut record)| {
                if let Some(object) = record.as_object_mut() {
                    if !object.contains_key(INTERNAL_ID) && !object.contains_key("id") {
                        object.insert(INTERNAL_ID.to_string(), Value::String(index.to_string()));
                    }
                }
                record
            })
            .collect();
        Self { descriptor, records }
    }

    /// Load a JSON array of records or a GeoJSON FeatureCollection.
    pub async fn from_file(descriptor: BackendDescriptor, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse: {}", path.display()))?;

        let records = match value {
            Value::Array(records) => records,
            Value::Object(mut object) => match object.remove("features") {
                Some(Value::Array(records)) => records,
                _ => bail!("{} is not a FeatureCollection", path.display()),
            },
            _ => bail!("{} holds neither an array nor a FeatureCollection", path.display()),
        };

        debug!(backend = %descriptor.name, records = records.len(), "Loaded memory backend");
        Ok(Self::new(descriptor, records))
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }
}

#[async_trait]
impl BackendTarget for MemoryBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    #[instrument(skip(self, query), fields(backend = %self.descriptor.name))]
    async fn find(&self, query: &StructuredQuery) -> Result<BackendPage, FeaturesError> {
        let mut matched: Vec<&Value> = self.records.iter().filter(|r| matches(r, query)).collect();
        if !query.sort.is_empty() {
            sort_records(&mut matched, &query.sort);
        }

        let total = matched.len() as u64;
        let skip = query.skip.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let records: Vec<Value> = matched.into_iter().skip(skip).take(limit).cloned().collect();

        debug!(total, returned = records.len(), "Evaluated query");
        Ok(BackendPage { records, total })
    }

    #[instrument(skip(self, bound), fields(backend = %self.descriptor.name))]
    async fn get(&self, id: &str, bound: Option<&FilterExpression>) -> Result<Value, FeaturesError> {
        self.records
            .iter()
            .find(|record| record_id(record).as_deref() == Some(id))
            .filter(|record| bound.map_or(true, |filter| evaluate(record, filter)))
            .cloned()
            .ok_or_else(|| FeaturesError::not_found(format!("No record found for id '{}'", id)))
    }
}

fn record_id(record: &Value) -> Option<String> {
    match record.get(INTERNAL_ID).or_else(|| record.get("id"))? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(object) => object.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Resolve a dotted path such as `properties.H`.
fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |value, key| value.get(key))
}

fn instant_at(record: &Value, field: &str) -> Option<DateTime<Utc>> {
    lookup(record, field).and_then(Value::as_str).and_then(parse_instant)
}

fn geometry_at(record: &Value, field: &str) -> Option<Geometry> {
    serde_json::from_value(lookup(record, field)?.clone()).ok()
}

fn matches(record: &Value, query: &StructuredQuery) -> bool {
    if let Some(bounds) = &query.spatial {
        if !overlaps(record, bounds) {
            return false;
        }
    }

    let properties_match = query.properties.iter().all(|(field, expected)| {
        let actual = lookup(record, field);
        expected
            .values()
            .into_iter()
            .any(|value| compare(actual, value) == Some(Ordering::Equal))
    });

    properties_match && query.predicate.as_ref().map_or(true, |p| evaluate(record, p))
}

fn overlaps(record: &Value, bounds: &SpatialBounds) -> bool {
    match geometry_at(record, "geometry").and_then(|g| g.bbox()) {
        Some([west, south, east, north]) => {
            west <= bounds.east && east >= bounds.west && south <= bounds.north && north >= bounds.south
        }
        None => false,
    }
}

/// Order a record value against a query operand; None when incomparable.
fn compare(actual: Option<&Value>, expected: &CoercedValue) -> Option<Ordering> {
    match (actual, expected) {
        (None, CoercedValue::Null) | (Some(Value::Null), CoercedValue::Null) => Some(Ordering::Equal),
        (Some(Value::Number(n)), CoercedValue::Number(e)) => n.as_f64()?.partial_cmp(e),
        (Some(Value::Bool(b)), CoercedValue::Boolean(e)) => Some(b.cmp(e)),
        (Some(Value::String(s)), CoercedValue::DateTime(e)) => parse_instant(s).map(|dt| dt.cmp(e)),
        (Some(Value::String(s)), CoercedValue::String(e)) => Some(s.as_str().cmp(e.as_str())),
        _ => None,
    }
}

fn holds(op: ComparisonOp, ordering: Ordering) -> bool {
    match op {
        ComparisonOp::Eq => ordering == Ordering::Equal,
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::Lte => ordering != Ordering::Greater,
        ComparisonOp::Gte => ordering != Ordering::Less,
    }
}

fn evaluate(record: &Value, expr: &FilterExpression) -> bool {
    match expr {
        FilterExpression::Comparison { op, field, value } => {
            compare(lookup(record, field), value).is_some_and(|o| holds(*op, o))
        }
        FilterExpression::Between { field, lower, upper } => {
            let actual = lookup(record, field);
            compare(actual, lower).is_some_and(|o| o != Ordering::Less)
                && compare(actual, upper).is_some_and(|o| o != Ordering::Greater)
        }
        FilterExpression::In { field, values } => {
            let actual = lookup(record, field);
            values.iter().any(|v| compare(actual, v) == Some(Ordering::Equal))
        }
        FilterExpression::IsNull { field } => matches!(lookup(record, field), None | Some(Value::Null)),
        FilterExpression::Not { inner, .. } => !evaluate(record, inner),
        FilterExpression::And(items) => items.iter().all(|item| evaluate(record, item)),
        FilterExpression::Or(items) => items.iter().any(|item| evaluate(record, item)),
        FilterExpression::Before { field, value } => instant_at(record, field).is_some_and(|t| t < *value),
        FilterExpression::After { field, value } => instant_at(record, field).is_some_and(|t| t > *value),
        FilterExpression::During { field, lower, upper } => {
            instant_at(record, field).is_some_and(|t| t >= *lower && t <= *upper)
        }
        FilterExpression::Intersects { field, geometry } => {
            geometry_at(record, field).is_some_and(|g| intersects(&g, geometry))
        }
        FilterExpression::Within { field, geometry } => {
            geometry_at(record, field).is_some_and(|g| within(&g, geometry))
        }
    }
}

fn sort_records(records: &mut [&Value], keys: &[SortKey]) {
    records.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ordering = compare_values(lookup(a, &key.field), lookup(b, &key.field));
                match key.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => match (parse_instant(x), parse_instant(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

type Point = (f64, f64);
type Segment = (Point, Point);

fn xy(position: &Position) -> Option<Point> {
    match position.as_slice() {
        [x, y, ..] => Some((*x, *y)),
        _ => None,
    }
}

fn points(geometry: &Geometry) -> Vec<Point> {
    geometry.positions().into_iter().filter_map(xy).collect()
}

fn segments(geometry: &Geometry) -> Vec<Segment> {
    let lines: Vec<&Vec<Position>> = match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => Vec::new(),
        Geometry::LineString(line) => vec![line],
        Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => lines.iter().collect(),
        Geometry::MultiPolygon(polygons) => polygons.iter().flatten().collect(),
    };
    lines
        .into_iter()
        .flat_map(|line| line.windows(2).filter_map(|pair| Some((xy(&pair[0])?, xy(&pair[1])?))))
        .collect()
}

fn intersects(a: &Geometry, b: &Geometry) -> bool {
    let (a_points, b_points) = (points(a), points(b));
    let (a_segments, b_segments) = (segments(a), segments(b));

    a_points.iter().any(|p| b.contains_point(p.0, p.1))
        || b_points.iter().any(|p| a.contains_point(p.0, p.1))
        || a_points.iter().any(|p| b_points.contains(p))
        || a_points.iter().any(|p| b_segments.iter().any(|s| touches(s, *p)))
        || b_points.iter().any(|p| a_segments.iter().any(|s| touches(s, *p)))
        || a_segments.iter().any(|s| b_segments.iter().any(|t| crosses(s, t)))
}

fn within(inner: &Geometry, outer: &Geometry) -> bool {
    let inner_points = points(inner);
    outer.is_areal()
        && !inner_points.is_empty()
        && inner_points.iter().all(|p| outer.contains_point(p.0, p.1))
}

fn orientation(p: Point, q: Point, r: Point) -> f64 {
    (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
}

fn in_box(s: &Segment, r: Point) -> bool {
    let ((px, py), (qx, qy)) = *s;
    r.0 >= px.min(qx) && r.0 <= px.max(qx) && r.1 >= py.min(qy) && r.1 <= py.max(qy)
}

fn touches(s: &Segment, p: Point) -> bool {
    orientation(s.0, s.1, p) == 0.0 && in_box(s, p)
}

fn crosses(s: &Segment, t: &Segment) -> bool {
    let d1 = orientation(t.0, t.1, s.0);
    let d2 = orientation(t.0, t.1, s.1);
    let d3 = orientation(s.0, s.1, t.0);
    let d4 = orientation(s.0, s.1, t.1);

    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        return true;
    }
    touches(t, s.0) || touches(t, s.1) || touches(s, t.0) || touches(s, t.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use chrono::TimeZone;
    use features_query::{PropertyValue, SortKey};
    use serde_json::json;

    fn feature(id: &str, h: f64, lon: f64, lat: f64, hour: u32) -> Value {
        json!({
            "type": "Feature",
            "_id": id,
            "time": format!("2018-10-23T{:02}:00:00.000Z", hour),
            "geometry": { "type": "Point", "coordinates": [lon, lat] },
            "properties": { "H": h, "name": format!("station {}", id) }
        })
    }

    fn backend() -> MemoryBackend {
        MemoryBackend::new(
            BackendDescriptor::new("api/observations", BackendKind::Features),
            vec![
                feature("a", 0.1, 1.44, 43.6, 1),
                feature("b", 0.2, 2.35, 48.85, 2),
                feature("c", 0.5, 5.37, 43.3, 3),
                feature("d", 0.63, -1.55, 47.2, 4),
            ],
        )
    }

    fn with_predicate(predicate: FilterExpression) -> StructuredQuery {
        StructuredQuery {
            predicate: Some(predicate),
            ..Default::default()
        }
    }

    fn h(op: ComparisonOp, value: f64) -> FilterExpression {
        FilterExpression::comparison(op, "properties.H", CoercedValue::Number(value))
    }

    #[tokio::test]
    async fn test_eq_and_not() {
        let backend = backend();

        let page = backend.find(&with_predicate(h(ComparisonOp::Eq, 0.63))).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0]["_id"], "d");

        let not_lt = FilterExpression::Not {
            field: "properties.H".to_string(),
            inner: Box::new(h(ComparisonOp::Lt, 0.63)),
        };
        assert_eq!(backend.find(&with_predicate(not_lt)).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_between_in_and_null() {
        let backend = backend();

        let between = FilterExpression::Between {
            field: "properties.H".to_string(),
            lower: CoercedValue::Number(0.2),
            upper: CoercedValue::Number(0.5),
        };
        assert_eq!(backend.find(&with_predicate(between)).await.unwrap().total, 2);

        let within_set = FilterExpression::In {
            field: "properties.name".to_string(),
            values: vec![
                CoercedValue::String("station a".to_string()),
                CoercedValue::String("station z".to_string()),
            ],
        };
        assert_eq!(backend.find(&with_predicate(within_set)).await.unwrap().total, 1);

        let null = FilterExpression::IsNull {
            field: "properties.missing".to_string(),
        };
        assert_eq!(backend.find(&with_predicate(null)).await.unwrap().total, 4);
    }

    #[tokio::test]
    async fn test_temporal_predicates() {
        let backend = backend();
        let at = |hour| Utc.with_ymd_and_hms(2018, 10, 23, hour, 0, 0).unwrap();

        let before = FilterExpression::Before {
            field: "time".to_string(),
            value: at(3),
        };
        assert_eq!(backend.find(&with_predicate(before)).await.unwrap().total, 2);

        let during = FilterExpression::During {
            field: "time".to_string(),
            lower: at(2),
            upper: at(4),
        };
        assert_eq!(backend.find(&with_predicate(during)).await.unwrap().total, 3);

        let since = FilterExpression::comparison(ComparisonOp::Gte, "time", CoercedValue::DateTime(at(4)));
        assert_eq!(backend.find(&with_predicate(since)).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_bbox_and_spatial_predicates() {
        let backend = backend();

        let south_of_france = StructuredQuery {
            spatial: Some(SpatialBounds {
                south: 42.0,
                north: 44.0,
                east: 6.0,
                west: 0.0,
            }),
            ..Default::default()
        };
        assert_eq!(backend.find(&south_of_france).await.unwrap().total, 2);

        let area = Geometry::from_bbox(-2.0, 47.0, 3.0, 49.0);
        let intersecting = FilterExpression::Intersects {
            field: "geometry".to_string(),
            geometry: area.clone(),
        };
        assert_eq!(backend.find(&with_predicate(intersecting)).await.unwrap().total, 2);

        let inside = FilterExpression::Within {
            field: "geometry".to_string(),
            geometry: area,
        };
        assert_eq!(backend.find(&with_predicate(inside)).await.unwrap().total, 2);
    }

    #[test]
    fn test_line_crossing_polygon_intersects() {
        let line = Geometry::LineString(vec![vec![-1.0, 0.5], vec![2.0, 0.5]]);
        let square = Geometry::from_bbox(0.0, 0.0, 1.0, 1.0);
        assert!(intersects(&line, &square));
        assert!(!within(&line, &square));

        let far = Geometry::LineString(vec![vec![5.0, 5.0], vec![6.0, 6.0]]);
        assert!(!intersects(&far, &square));
    }

    #[tokio::test]
    async fn test_property_filters() {
        let backend = backend();
        let mut query = StructuredQuery::default();
        query.properties.insert(
            "properties.H".to_string(),
            PropertyValue::Multiple(vec![CoercedValue::Number(0.1), CoercedValue::Number(0.5)]),
        );
        assert_eq!(backend.find(&query).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_sort_and_paging() {
        let backend = backend();
        let query = StructuredQuery {
            limit: Some(2),
            skip: Some(1),
            sort: vec![SortKey::new("time", SortDirection::Desc)],
            ..Default::default()
        };

        let page = backend.find(&query).await.unwrap();
        assert_eq!(page.total, 4);
        let ids: Vec<&str> = page.records.iter().filter_map(|r| r["_id"].as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_get_with_bound_filter() {
        let backend = backend();

        assert_eq!(backend.get("a", None).await.unwrap()["_id"], "a");

        let bound = h(ComparisonOp::Gt, 0.5);
        assert!(matches!(
            backend.get("a", Some(&bound)).await,
            Err(FeaturesError::NotFound(_))
        ));
        assert!(backend.get("d", Some(&bound)).await.is_ok());
        assert!(backend.get("zz", None).await.is_err());
    }

    #[test]
    fn test_missing_ids_are_assigned() {
        let backend = MemoryBackend::new(
            BackendDescriptor::new("records", BackendKind::Generic),
            vec![json!({"name": "x"}), json!({"id": 7})],
        );
        assert_eq!(backend.records()[0]["_id"], "0");
        assert!(backend.records()[1].get("_id").is_none());
        assert_eq!(record_id(&backend.records()[1]).as_deref(), Some("7"));
    }
}
