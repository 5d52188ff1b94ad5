//! Reshaping of backend results into the Features output documents.

use chrono::{DateTime, Utc};
use features_protocol::{media_types, Link};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::format_instant;

/// Backend-internal record identifier.
pub const INTERNAL_ID: &str = "_id";

/// Raw result of a backend `find`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendPage {
    #[serde(alias = "features", alias = "data")]
    pub records: Vec<Value>,

    pub total: u64,
}

/// Items response document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollectionEnvelope {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Value>,

    #[serde(rename = "numberMatched")]
    pub number_matched: u64,

    #[serde(rename = "numberReturned")]
    pub number_returned: u64,

    #[serde(rename = "timeStamp")]
    pub time_stamp: String,

    pub links: Vec<Link>,
}

/// Projects records of one collection.
#[derive(Debug, Clone)]
pub struct ResultProjector {
    base_url: String,
    collection_id: String,
}

impl ResultProjector {
    pub fn new(base_url: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            collection_id: collection_id.into(),
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/collections/{}",
            self.base_url,
            urlencoding::encode(&self.collection_id)
        )
    }

    /// Build the feature collection envelope.
    pub fn project(&self, page: BackendPage, links: Vec<Link>, now: DateTime<Utc>) -> FeatureCollectionEnvelope {
        let features: Vec<Value> = page
            .records
            .into_iter()
            .map(|record| self.project_feature(record))
            .collect();

        FeatureCollectionEnvelope {
            type_: "FeatureCollection".to_string(),
            number_matched: page.total,
            number_returned: features.len() as u64,
            features,
            time_stamp: format_instant(&now),
            links,
        }
    }

    /// Rename `_id` to `id`, default the GeoJSON type and attach links.
    pub fn project_feature(&self, mut record: Value) -> Value {
        let collection_url = self.collection_url();
        if let Some(object) = record.as_object_mut() {
            if let Some(id) = object.remove(INTERNAL_ID) {
                object.insert("id".to_string(), id);
            }
            object
                .entry("type")
                .or_insert_with(|| Value::String("Feature".to_string()));

            let mut links = Vec::new();
            if let Some(id) = object.get("id").and_then(id_segment) {
                links.push(
                    Link::new(
                        format!("{}/items/{}", collection_url, urlencoding::encode(&id)),
                        "self",
                    )
                    .with_type(media_types::GEO_JSON),
                );
            }
            links.push(
                Link::new(&collection_url, "collection")
                    .with_type(media_types::JSON)
                    .with_title("The collection document"),
            );
            if let Ok(links) = serde_json::to_value(links) {
                object.insert("links".to_string(), links);
            }
        }
        record
    }
}

fn id_segment(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn projector() -> ResultProjector {
        ResultProjector::new("http://localhost/api", "stations")
    }

    #[test]
    fn test_project_feature_renames_id() {
        let feature = projector().project_feature(json!({"_id": "abc", "properties": {"H": 1}}));

        assert_eq!(feature["id"], "abc");
        assert!(feature.get("_id").is_none());
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["links"][0]["href"], "http://localhost/api/collections/stations/items/abc");
        assert_eq!(feature["links"][0]["rel"], "self");
        assert_eq!(feature["links"][1]["rel"], "collection");
    }

    #[test]
    fn test_project_feature_keeps_type() {
        let feature = projector().project_feature(json!({"type": "Feature", "id": 7}));
        assert_eq!(feature["links"][0]["href"], "http://localhost/api/collections/stations/items/7");
    }

    #[test]
    fn test_project_feature_without_id() {
        let feature = projector().project_feature(json!({"properties": {}}));
        assert_eq!(feature["links"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_project_counts() {
        let page = BackendPage {
            records: vec![json!({"_id": "1"}), json!({"_id": "2"})],
            total: 42,
        };
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
        let envelope = projector().project(page, Vec::new(), now);

        assert_eq!(envelope.number_matched, 42);
        assert_eq!(envelope.number_returned, 2);
        assert_eq!(envelope.time_stamp, "2020-01-01T12:00:00.000Z");

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["numberMatched"], 42);
        assert!(json.get("total").is_none());
    }

    #[test]
    fn test_backend_page_aliases() {
        let page: BackendPage = serde_json::from_value(json!({"data": [{}], "total": 1})).unwrap();
        assert_eq!(page.records.len(), 1);
    }
}
