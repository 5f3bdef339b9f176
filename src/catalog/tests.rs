//! Tests for catalog module

use super::*;
use crate::config::{load_config_from_str, TapConfig};
use crate::error::Error;
use crate::transport::fixture::FixtureTransport;
use crate::types::ReplicationMethod;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn config(yaml: &str) -> TapConfig {
    load_config_from_str(yaml).unwrap()
}

fn users_config() -> TapConfig {
    config(
        r#"
api_url: https://api.example.com
streams:
  - name: users
    path: /users
    primary_keys: [id]
"#,
    )
}

fn users_page() -> Value {
    json!({"data": [{
        "id": 1,
        "addr": {"city": "NY"},
        "tags": ["a", "b"],
        "orders": [{"o": 1}, {"o": 2}]
    }]})
}

fn property_names(schema: &Value) -> Vec<&str> {
    schema["properties"]
        .as_object()
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn field_metadata<'a>(entry: &'a CatalogEntry, field: &str) -> &'a crate::types::JsonObject {
    &entry
        .metadata
        .iter()
        .find(|m| m.breadcrumb == ["properties", field])
        .unwrap()
        .metadata
}

// ============================================================================
// Discovery Tests
// ============================================================================

#[tokio::test]
async fn test_discover_denests_parent_and_child() {
    let transport = FixtureTransport::new().route("/users", vec![users_page()]);
    let catalog = discover(&users_config(), &transport).await.unwrap();

    let ids: Vec<&str> = catalog.streams.iter().map(|e| e.tap_stream_id.as_str()).collect();
    assert_eq!(ids, vec!["users", "users__orders"]);

    let parent = catalog.get("users").unwrap();
    assert_eq!(property_names(&parent.schema), vec!["addr__city", "id", "tags"]);
    assert_eq!(parent.key_properties, vec!["id"]);
    assert_eq!(parent.parent_stream, None);

    let child = catalog.get("users__orders").unwrap();
    assert_eq!(child.parent_stream.as_deref(), Some("users"));
    assert_eq!(child.replication_method, ReplicationMethod::FullTable);
    assert_eq!(child.replication_key, None);
    assert_eq!(
        child.key_properties,
        vec!["_sdc_source_key_id", "_sdc_sequence"]
    );
    assert_eq!(
        property_names(&child.schema),
        vec!["_sdc_sequence", "_sdc_source_key_id", "o"]
    );
}

#[tokio::test]
async fn test_discover_writes_metadata() {
    let transport = FixtureTransport::new().route("/users", vec![users_page()]);
    let catalog = discover(&users_config(), &transport).await.unwrap();

    let parent = catalog.get("users").unwrap();
    let stream = parent.stream_metadata().unwrap();
    assert_eq!(stream["table-key-properties"], json!(["id"]));
    assert_eq!(stream["forced-replication-method"], json!("FULL_TABLE"));
    assert_eq!(stream["selected"], json!(true));
    assert!(parent.is_selected());

    assert_eq!(field_metadata(parent, "id")["inclusion"], json!("automatic"));
    let city = field_metadata(parent, "addr__city");
    assert_eq!(city["inclusion"], json!("available"));
    assert_eq!(city["selected-by-default"], json!(true));

    let child = catalog.get("users__orders").unwrap();
    assert_eq!(
        field_metadata(child, "_sdc_sequence")["inclusion"],
        json!("automatic")
    );
    assert_eq!(field_metadata(child, "o")["inclusion"], json!("available"));
}

#[tokio::test]
async fn test_discover_incremental_metadata() {
    let config = config(
        r#"
api_url: https://api.example.com
streams:
  - name: events
    path: /events
    primary_keys: [id]
    replication_method: INCREMENTAL
    replication_key: updated_at
"#,
    );
    let transport = FixtureTransport::new().route(
        "/events",
        vec![json!([{"id": 1, "updated_at": "2024-01-01T00:00:00Z"}])],
    );

    let catalog = discover(&config, &transport).await.unwrap();
    let entry = catalog.get("events").unwrap();

    assert_eq!(entry.replication_key.as_deref(), Some("updated_at"));
    assert_eq!(entry.replication_method, ReplicationMethod::Incremental);
    let stream = entry.stream_metadata().unwrap();
    assert_eq!(stream["valid-replication-keys"], json!(["updated_at"]));
    assert_eq!(
        field_metadata(entry, "updated_at")["inclusion"],
        json!("automatic")
    );
    assert_eq!(
        entry.schema["properties"]["updated_at"]["format"],
        json!("date-time")
    );

    // Sampling never sends a bookmark
    assert!(!transport.requests()[0].params.contains_key("updated_at"));
}

#[tokio::test]
async fn test_full_table_replication_key_is_not_upgraded() {
    let config = config(
        r#"
api_url: https://api.example.com
streams:
  - {name: items, path: /items, replication_key: modified}
"#,
    );
    let transport = FixtureTransport::new().route("/items", vec![json!([{"modified": 5}])]);

    let catalog = discover(&config, &transport).await.unwrap();
    let entry = catalog.get("items").unwrap();
    assert_eq!(entry.replication_method, ReplicationMethod::FullTable);
    assert_eq!(entry.replication_key.as_deref(), Some("modified"));
}

#[tokio::test]
async fn test_static_schema_skips_sampling() {
    let config = config(
        r#"
api_url: https://api.example.com
streams:
  - name: accounts
    path: /accounts
    primary_keys: [id]
    schema:
      type: object
      properties:
        id: {type: integer}
        owner:
          type: ["null", object]
          properties:
            name: {type: string}
"#,
    );
    let transport = FixtureTransport::new();

    let catalog = discover(&config, &transport).await.unwrap();
    assert_eq!(transport.request_count(), 0);
    assert_eq!(
        property_names(&catalog.get("accounts").unwrap().schema),
        vec!["id", "owner__name"]
    );
}

#[tokio::test]
async fn test_sampling_failure_degrades_to_empty_schema() {
    let transport = FixtureTransport::new().fail("/users", 403);
    let catalog = discover(&users_config(), &transport).await.unwrap();

    assert_eq!(catalog.streams.len(), 1);
    let entry = catalog.get("users").unwrap();
    assert!(property_names(&entry.schema).is_empty());
    assert!(entry.is_selected());
}

#[tokio::test]
async fn test_empty_sample_gives_empty_schema() {
    let transport = FixtureTransport::new().route("/users", vec![json!([])]);
    let catalog = discover(&users_config(), &transport).await.unwrap();

    assert!(property_names(&catalog.get("users").unwrap().schema).is_empty());
}

#[tokio::test]
async fn test_denest_disabled_keeps_raw_schema() {
    let config = config(
        r#"
api_url: https://api.example.com
streams:
  - {name: users, path: /users, primary_keys: [id], denest: false}
"#,
    );
    let transport = FixtureTransport::new().route("/users", vec![users_page()]);

    let catalog = discover(&config, &transport).await.unwrap();
    assert_eq!(catalog.streams.len(), 1);

    let schema = &catalog.get("users").unwrap().schema;
    assert_eq!(property_names(schema), vec!["addr", "id", "orders", "tags"]);
    assert_eq!(property_names(&schema["properties"]["addr"]), vec!["city"]);
}

#[tokio::test]
async fn test_sample_clamps_page_size() {
    let config = config(
        r#"
api_url: https://api.example.com
sample_size: 3
streams:
  - name: users
    path: /users
    pagination_style: page
    pagination_page_size: 100
"#,
    );
    let transport = FixtureTransport::new().route(
        "/users",
        vec![json!([{"id": 1}, {"id": 2}, {"id": 3}]), json!([{"id": 4}])],
    );

    let records = sample_records(&config, &transport, &config.streams[0])
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(transport.request_count(), 1);
    assert_eq!(transport.requests()[0].params["per_page"], "3");
}

// ============================================================================
// Catalog Document Tests
// ============================================================================

#[tokio::test]
async fn test_catalog_document_round_trip() {
    let transport = FixtureTransport::new().route("/users", vec![users_page()]);
    let catalog = discover(&users_config(), &transport).await.unwrap();

    let json = catalog.to_json_pretty().unwrap();
    let parsed = Catalog::from_json(&json).unwrap();
    assert_eq!(parsed, catalog);

    let doc: Value = serde_json::from_str(&json).unwrap();
    assert!(doc["streams"][0].get("parent_stream").is_none());
    assert_eq!(doc["streams"][1]["parent_stream"], json!("users"));
}

#[test]
fn test_selection_requires_stream_level_flag() {
    let catalog = Catalog::from_json(
        r#"{"streams": [
            {"tap_stream_id": "a", "stream": "a", "schema": {},
             "metadata": [{"breadcrumb": [], "metadata": {"selected": true}}]},
            {"tap_stream_id": "b", "stream": "b", "schema": {},
             "metadata": [{"breadcrumb": ["properties", "x"], "metadata": {"selected": true}}]},
            {"tap_stream_id": "c", "stream": "c", "schema": {}}
        ]}"#,
    )
    .unwrap();

    let selected: Vec<&str> = catalog.selected().map(|e| e.stream.as_str()).collect();
    assert_eq!(selected, vec!["a"]);

    let mut entry = catalog.get("c").unwrap().clone();
    entry.set_selected(true);
    assert!(entry.is_selected());
    entry.set_selected(false);
    assert!(!entry.is_selected());
}

#[test]
fn test_invalid_catalog_rejected() {
    let err = Catalog::from_json("{\"streams\": 3}").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));

    let dir = tempfile::tempdir().unwrap();
    assert!(Catalog::load(dir.path().join("missing.json")).is_err());
}

// ============================================================================
// Stream Plan Tests
// ============================================================================

#[tokio::test]
async fn test_plan_from_catalog_matches_discovery() {
    let config = users_config();
    let definition = &config.streams[0];
    let transport = FixtureTransport::new().route("/users", vec![users_page()]);

    let discovered = discover_stream(&config, &transport, definition)
        .await
        .unwrap();
    let catalog = Catalog::new(discovered.catalog_entries(definition));
    let planned = StreamPlan::from_catalog(definition, &catalog).unwrap();

    let record = users_page()["data"][0].as_object().unwrap().clone();
    assert_eq!(planned.flatten(&record), discovered.flatten(&record));
    assert_eq!(
        planned.flatten(&record),
        json!({"id": 1, "addr__city": "NY", "tags": "[\"a\", \"b\"]"})
            .as_object()
            .unwrap()
            .clone()
    );

    let children = planned.child_records(&record);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].0, "users__orders");
    assert_eq!(
        Value::from(children[0].1.clone()),
        json!([
            {"_sdc_source_key_id": 1, "_sdc_sequence": 0, "o": 1},
            {"_sdc_source_key_id": 1, "_sdc_sequence": 1, "o": 2}
        ])
    );
}

#[tokio::test]
async fn test_plan_from_catalog_expands_nullable_objects() {
    let config = users_config();
    let definition = &config.streams[0];
    let page = json!({"data": [
        {"id": 1, "addr": null, "orders": [{"o": 1, "ship": null}]},
        {"id": 2, "addr": {"city": "NY", "geo": {"lat": 1.5}}, "orders": [{"o": 2, "ship": {"via": "air"}}]}
    ]});
    let transport = FixtureTransport::new().route("/users", vec![page.clone()]);

    let discovered = discover_stream(&config, &transport, definition)
        .await
        .unwrap();
    assert_eq!(
        discovered.schema().properties.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["addr", "addr__city", "addr__geo__lat", "id"]
    );

    let catalog = Catalog::new(discovered.catalog_entries(definition));
    let planned = StreamPlan::from_catalog(definition, &catalog).unwrap();

    for record in page["data"].as_array().unwrap() {
        let record = record.as_object().unwrap();
        assert_eq!(planned.flatten(record), discovered.flatten(record));
        assert_eq!(planned.child_records(record), discovered.child_records(record));
    }

    let second = page["data"][1].as_object().unwrap();
    assert_eq!(
        Value::Object(planned.flatten(second)),
        json!({"id": 2, "addr__city": "NY", "addr__geo__lat": 1.5})
    );
    assert_eq!(
        Value::Object(planned.child_records(second)[0].1[0].clone()),
        json!({"_sdc_source_key_id": 2, "_sdc_sequence": 0, "o": 2, "ship__via": "air"})
    );
}

#[tokio::test]
async fn test_plan_skips_deselected_child() {
    let config = users_config();
    let definition = &config.streams[0];
    let transport = FixtureTransport::new().route("/users", vec![users_page()]);

    let mut catalog = discover(&config, &transport).await.unwrap();
    catalog.streams[1].set_selected(false);

    let plan = StreamPlan::from_catalog(definition, &catalog).unwrap();
    let record = users_page()["data"][0].as_object().unwrap().clone();

    assert!(plan.children().is_empty());
    assert!(plan.child_records(&record).is_empty());
    assert!(!plan.flatten(&record).contains_key("orders"));
}

#[test]
fn test_plan_requires_catalog_entry() {
    let config = users_config();
    let err = StreamPlan::from_catalog(&config.streams[0], &Catalog::default()).unwrap_err();
    assert!(matches!(err, Error::StreamNotFound { ref stream } if stream == "users"));
}
