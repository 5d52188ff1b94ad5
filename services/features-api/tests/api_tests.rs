//! HTTP-level tests driving the router with in-memory backends.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use features_api::backend::{BackendDescriptor, BackendKind, BackendRegistry};
use features_api::catalog::{Layer, LayerFilter};
use features_api::config::{CatalogConfig, FeaturesConfig};
use features_api::memory::MemoryBackend;
use features_api::state::AppState;
use features_query::BackendPagination;
use serde_json::{json, Value};
use tower::ServiceExt;

const API: &str = "http://localhost:8081/api";

fn measures() -> Vec<Value> {
    [0.1, 0.2, 0.5, 0.63]
        .iter()
        .enumerate()
        .map(|(i, h)| {
            json!({
                "type": "Feature",
                "_id": format!("m{}", i),
                "geometry": { "type": "Point", "coordinates": [1.0 + i as f64, 45.0] },
                "properties": { "H": h }
            })
        })
        .collect()
}

/// Hourly records from 2018-10-22T00:00Z to 2018-10-25T00:00Z inclusive.
fn hourly() -> Vec<Value> {
    let start = Utc.with_ymd_and_hms(2018, 10, 22, 0, 0, 0).unwrap();
    (0..=72)
        .map(|h| {
            let time = start + Duration::hours(h);
            json!({
                "_id": format!("h{}", h),
                "time": time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                "geometry": { "type": "Point", "coordinates": [1.44, 43.6] },
                "properties": { "H": h as f64 / 100.0 }
            })
        })
        .collect()
}

fn stations() -> Vec<Value> {
    vec![
        json!({
            "type": "Feature",
            "_id": "O200004001",
            "geometry": { "type": "Point", "coordinates": [1.4437, 43.5998] },
            "properties": { "name": "Toulouse", "river": "Garonne" }
        }),
        json!({
            "type": "Feature",
            "_id": "M800001010",
            "geometry": { "type": "Point", "coordinates": [-1.5536, 47.2122] },
            "properties": { "name": "Nantes", "river": "Loire" }
        }),
    ]
}

fn memory(name: &str, kind: BackendKind, records: Vec<Value>) -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(BackendDescriptor::new(name, kind), records))
}

fn app() -> Router {
    let config = FeaturesConfig {
        catalog: Some(CatalogConfig {
            layers: vec![
                Layer::for_service("measures"),
                Layer::for_service("hourly"),
                Layer {
                    name: "Hubeau".to_string(),
                    service: Some("hubeau-observations".to_string()),
                    probe_service: Some("hubeau-stations".to_string()),
                    filters: vec![LayerFilter {
                        name: Some("Garonne".to_string()),
                        label: None,
                        active: json!({"eq": [{"property": "river"}, "Garonne"]}),
                    }],
                    ..Default::default()
                },
                Layer {
                    context: Some("crisis".to_string()),
                    ..Layer::for_service("vigicrues")
                },
            ],
        }),
        ..Default::default()
    };

    let hourly = Arc::new(MemoryBackend::new(
        BackendDescriptor::new("api/hourly", BackendKind::Features).with_pagination(BackendPagination {
            default: Some(10),
            max: Some(50),
        }),
        hourly(),
    ));
    let backends = BackendRegistry::new()
        .with_target(memory("api/measures", BackendKind::Features, measures()))
        .with_target(hourly)
        .with_target(memory("api/hubeau-observations", BackendKind::Features, vec![]))
        .with_target(memory("api/hubeau-stations", BackendKind::Features, stations()))
        .with_target(memory("api/vigicrues", BackendKind::Features, measures()));

    features_api::router(Arc::new(AppState::with_backends(config, backends)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, content_type, body)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app(), Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, body)
}

async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, body) = send(app(), request).await;
    (status, body)
}

fn link<'a>(body: &'a Value, rel: &str) -> Option<&'a str> {
    body["links"]
        .as_array()?
        .iter()
        .find(|l| l["rel"] == rel)
        .and_then(|l| l["href"].as_str())
}

#[tokio::test]
async fn test_landing_and_conformance() {
    let (status, body) = get("/api").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(link(&body, "data"), Some("http://localhost:8081/api/collections"));
    assert_eq!(link(&body, "service-desc"), Some("http://localhost:8081/api/definition"));

    let (status, body) = get("/api/conformance").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["conformsTo"].as_array().unwrap().len() >= 4);
}

#[tokio::test]
async fn test_healthcheck_and_definition() {
    let (status, body) = get("/api/healthcheck").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "features-api");
    assert!(body["version"].is_string());

    let (status, body) = get("/api/definition").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["servers"][0]["url"], API);
}

#[tokio::test]
async fn test_list_collections() {
    let (status, body) = get("/api/collections").await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<&str> = body["collections"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["id"].as_str())
        .collect();
    // Probe layer: measures and stations, plus one filtered collection each
    assert_eq!(
        ids,
        vec![
            "measures",
            "hourly",
            "hubeau-observations",
            "hubeau-observations~garonne",
            "hubeau-stations",
            "hubeau-stations~garonne",
        ]
    );
    assert_eq!(link(&body, "self"), Some("http://localhost:8081/api/collections"));
}

#[tokio::test]
async fn test_describe_collection() {
    let (status, body) = get("/api/collections/hubeau-stations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hubeau (stations)");
    assert_eq!(body["itemType"], "feature");
    assert_eq!(
        link(&body, "items"),
        Some("http://localhost:8081/api/collections/hubeau-stations/items")
    );
}

#[tokio::test]
async fn test_unknown_collection() {
    let (status, body) = get("/api/collections/unknown/items").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["name"], "NotFound");
    assert_eq!(body["code"], 404);
    assert_eq!(body["message"], "Cannot find collection unknown");
}

#[tokio::test]
async fn test_items_envelope() {
    let (status, content_type, body) = send(
        app(),
        Request::get("/api/collections/measures/items").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/geo+json"));
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["numberMatched"], 4);
    assert_eq!(body["numberReturned"], 4);
    assert!(body["timeStamp"].as_str().unwrap().ends_with('Z'));

    let feature = &body["features"][0];
    assert_eq!(feature["id"], "m0");
    assert!(feature.get("_id").is_none());
    assert_eq!(
        link(feature, "self"),
        Some("http://localhost:8081/api/collections/measures/items/m0")
    );
}

#[tokio::test]
async fn test_cql_json_equality_filter() {
    let filter = urlencoding::encode(r#"{"eq":[{"property":"H"},0.63]}"#);
    let (status, body) = get(&format!("/api/collections/measures/items?filter={}", filter)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberMatched"], 1);
    assert_eq!(body["features"][0]["properties"]["H"], 0.63);
}

#[tokio::test]
async fn test_cql_json_not_in_body() {
    let (status, body) = post(
        "/api/collections/measures/items",
        json!({"not": [{"lt": [{"property": "H"}, 0.63]}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberMatched"], 1);
}

#[tokio::test]
async fn test_invalid_body() {
    let request = Request::post("/api/collections/measures/items")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["name"], "BadRequest");
}

#[tokio::test]
async fn test_property_filters_are_coerced() {
    let (_, body) = get("/api/collections/measures/items?H=0.63").await;
    assert_eq!(body["numberMatched"], 1);

    // Quoted values stay strings and never match numbers
    let (_, body) = get("/api/collections/measures/items?H=%270.63%27").await;
    assert_eq!(body["numberMatched"], 0);

    // Reserved parameters are not filters
    let (_, body) = get("/api/collections/measures/items?token=secret").await;
    assert_eq!(body["numberMatched"], 4);
}

#[tokio::test]
async fn test_datetime_interval() {
    let (status, body) = get(
        "/api/collections/hourly/items?datetime=2018-10-22T22:00:00.000Z/2018-10-24T08:00:00.000Z&limit=50",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberMatched"], 35);
    assert_eq!(body["numberReturned"], 35);
    // Features backends sort by descending time when filtering on time
    assert_eq!(body["features"][0]["time"], "2018-10-24T08:00:00.000Z");
}

#[tokio::test]
async fn test_invalid_datetime() {
    let (status, body) = get("/api/collections/hourly/items?datetime=a/b/c").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_pagination_links() {
    // Backend default limit is 10
    let (_, body) = get("/api/collections/hourly/items?sortby=-properties.H").await;
    assert_eq!(body["numberMatched"], 73);
    assert_eq!(body["numberReturned"], 10);
    assert_eq!(
        link(&body, "next"),
        Some("http://localhost:8081/api/collections/hourly/items?sortby=-properties.H&limit=10&offset=10")
    );

    // Last page has no next link
    let (_, body) = get("/api/collections/hourly/items?offset=70").await;
    assert_eq!(body["numberReturned"], 3);
    assert!(link(&body, "next").is_none());

    // Requested limits are clamped by the backend maximum
    let (_, body) = get("/api/collections/hourly/items?limit=1000").await;
    assert_eq!(body["numberReturned"], 50);
    assert!(link(&body, "next").unwrap().contains("limit=50&offset=50"));
}

#[tokio::test]
async fn test_invalid_parameters() {
    let (status, body) = get("/api/collections/measures/items?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid limit parameter");

    let (status, _) = get("/api/collections/measures/items?unknownQueryParameter=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get("/api/collections/measures/items?bbox=1,2,3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bbox_and_cql_text() {
    let (_, body) = get("/api/collections/measures/items?bbox=0.5,44,2.5,46").await;
    assert_eq!(body["numberMatched"], 2);

    let filter = urlencoding::encode("INTERSECTS(geometry,POLYGON((2.5 44,4.5 44,4.5 46,2.5 46,2.5 44)))");
    let (status, body) = get(&format!(
        "/api/collections/measures/items?filter-lang=cql-text&filter={}",
        filter
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberMatched"], 2);
}

#[tokio::test]
async fn test_filtered_collection() {
    let (status, body) = get("/api/collections/hubeau-stations~garonne/items").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberMatched"], 1);
    assert_eq!(body["features"][0]["id"], "O200004001");
    assert!(link(&body, "self")
        .unwrap()
        .starts_with("http://localhost:8081/api/collections/hubeau-stations~garonne/items?"));

    let (status, _) = get("/api/collections/hubeau-stations~loire/items").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_single_item() {
    let (status, body) = get("/api/collections/hubeau-stations/items/M800001010").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "M800001010");
    assert_eq!(
        link(&body, "collection"),
        Some("http://localhost:8081/api/collections/hubeau-stations")
    );

    // Outside of the bound filter
    let (status, _) = get("/api/collections/hubeau-stations~garonne/items/M800001010").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_context_routes() {
    let (status, _) = get("/api/collections/vigicrues/items").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get("/api/contexts/crisis/collections/vigicrues/items").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberMatched"], 4);
    assert!(link(&body, "self")
        .unwrap()
        .starts_with("http://localhost:8081/api/contexts/crisis/collections/vigicrues/items"));

    let (_, body) = get("/api/contexts/crisis/collections").await;
    assert_eq!(body["collections"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let (status, _) = get("/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
