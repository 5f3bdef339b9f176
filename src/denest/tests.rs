//! Tests for denesting

use super::*;
use crate::extract::extract_records;
use crate::schema::{infer_schema, FieldType, JsonType};
use crate::types::JsonObject;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeSet;

fn obj(value: Value) -> JsonObject {
    value.as_object().cloned().unwrap()
}

fn keys() -> Vec<String> {
    vec!["id".to_string()]
}

fn column_names(schema: &FieldType) -> BTreeSet<String> {
    schema.properties.keys().cloned().collect()
}

// ============================================================================
// End-to-end Example
// ============================================================================

#[test]
fn test_denest_example_page() {
    let page = json!({"data": [{
        "id": 1,
        "addr": {"city": "NY"},
        "tags": ["a", "b"],
        "orders": [{"o": 1}, {"o": 2}]
    }]});

    let records = extract_records(&page, None);
    let schema = infer_schema(&records, 500);
    let denester = Denester::new("stream", &schema, &keys());

    assert_eq!(
        Value::Object(denester.flatten_record(&records[0])),
        json!({"id": 1, "addr__city": "NY", "tags": "[\"a\", \"b\"]"})
    );

    let names: Vec<&String> = denester.children().keys().collect();
    assert_eq!(names, vec!["stream__orders"]);

    let child = &denester.children()["stream__orders"];
    let rows: Vec<Value> = denester
        .child_records(&records[0], child)
        .into_iter()
        .map(Value::Object)
        .collect();
    assert_eq!(
        rows,
        vec![
            json!({"_sdc_source_key_id": 1, "_sdc_sequence": 0, "o": 1}),
            json!({"_sdc_source_key_id": 1, "_sdc_sequence": 1, "o": 2}),
        ]
    );
}

// ============================================================================
// Child Stream Tests
// ============================================================================

#[test]
fn test_child_stream_definition() {
    let records = vec![obj(json!({
        "id": "c-1",
        "lines": [{"sku": "x", "dims": {"w": 2}}],
    }))];
    let schema = infer_schema(&records, 500);
    let children = identify_child_streams(&schema, "invoices", &keys());

    let child = &children["invoices__lines"];
    assert_eq!(child.parent, "invoices");
    assert_eq!(child.array_key, "lines");
    assert_eq!(child.key_properties, vec!["_sdc_source_key_id", "_sdc_sequence"]);
    assert_eq!(
        column_names(&child.schema),
        ["_sdc_sequence", "_sdc_source_key_id", "dims__w", "sku"]
            .into_iter()
            .map(String::from)
            .collect()
    );
    let fk = child.schema.property("_sdc_source_key_id").unwrap();
    assert!(fk.has(JsonType::String));
}

#[test]
fn test_missing_parent_key_gets_string_fk() {
    let records = vec![obj(json!({"lines": [{"sku": "x"}]}))];
    let schema = infer_schema(&records, 500);
    let children = identify_child_streams(&schema, "s", &keys());
    let fk = children["s__lines"].schema.property("_sdc_source_key_id").unwrap();
    assert_eq!(fk, &FieldType::nullable(JsonType::String));
}

#[test]
fn test_scalar_and_empty_object_arrays_not_promoted() {
    let records = vec![obj(json!({
        "id": 1,
        "tags": ["a"],
        "blanks": [{}],
        "mixed": [1, {"k": 1}],
    }))];
    let schema = infer_schema(&records, 500);
    let children = identify_child_streams(&schema, "s", &keys());

    assert!(!children.contains_key("s__tags"));
    assert!(!children.contains_key("s__blanks"));
    assert!(children.contains_key("s__mixed"));
}

#[test]
fn test_child_records_completeness() {
    let records = vec![obj(json!({
        "id": 9,
        "items": [{"n": 0}, "skip-me", {"n": 2}, {"n": 3, "sub": [{"deep": true}]}],
    }))];
    let schema = infer_schema(&records, 500);
    let denester = Denester::new("p", &schema, &keys());
    let child = &denester.children()["p__items"];

    let rows = denester.child_records(&records[0], child);
    let sequences: Vec<Value> = rows.iter().map(|r| r["_sdc_sequence"].clone()).collect();
    assert_eq!(sequences, vec![json!(0), json!(2), json!(3)]);
    assert!(rows.iter().all(|r| r["_sdc_source_key_id"] == json!(9)));
    assert_eq!(rows[2]["sub"], json!("[{\"deep\": true}]"));
}

#[test]
fn test_absent_or_empty_array_yields_no_children() {
    let schema = infer_schema(&[obj(json!({"id": 1, "items": [{"n": 1}]}))], 500);
    let denester = Denester::new("p", &schema, &keys());
    let child = &denester.children()["p__items"];

    assert!(denester
        .child_records(&obj(json!({"id": 2, "items": []})), child)
        .is_empty());
    assert!(denester.child_records(&obj(json!({"id": 3})), child).is_empty());
    assert!(denester
        .child_records(&obj(json!({"id": 4, "items": null})), child)
        .is_empty());
}

// ============================================================================
// Flattening Tests
// ============================================================================

#[test]
fn test_flatten_rules() {
    let records = vec![
        obj(json!({"id": 1, "addr": {"geo": {"lat": 1.0}}, "tags": [], "empty": {}})),
        obj(json!({"id": 2, "addr": null, "tags": ["x"], "empty": {}})),
    ];
    let schema = infer_schema(&records, 500);
    let denester = Denester::new("s", &schema, &keys());

    assert_eq!(
        Value::Object(denester.flatten_record(&records[0])),
        json!({"id": 1, "addr__geo__lat": 1.0, "tags": null})
    );
    // an observed null widens `addr` with a string kind, so it keeps a column
    assert_eq!(
        Value::Object(denester.flatten_record(&records[1])),
        json!({"id": 2, "addr": null, "tags": "[\"x\"]"})
    );
    assert_eq!(
        column_names(denester.flat_schema()),
        ["addr", "addr__geo__lat", "id", "tags"]
            .into_iter()
            .map(String::from)
            .collect()
    );
    assert_eq!(
        denester.flat_schema().property("tags").unwrap(),
        &FieldType::nullable(JsonType::String)
    );
}

#[test]
fn test_null_object_with_static_schema_contributes_nothing() {
    let schema = FieldType::from_json_schema(&json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "addr": {"type": ["null", "object"], "properties": {"city": {"type": "string"}}},
            "meta": {"type": "object"},
        }
    }))
    .unwrap();
    let denester = Denester::new("s", &schema, &keys());

    assert_eq!(
        column_names(denester.flat_schema()),
        ["addr__city", "id", "meta"].into_iter().map(String::from).collect()
    );
    assert_eq!(
        Value::Object(denester.flatten_record(&obj(json!({
            "id": 1,
            "addr": null,
            "meta": {"free": "form"},
        })))),
        json!({"id": 1, "meta": "{\"free\": \"form\"}"})
    );
}

#[test]
fn test_flatten_mixed_object_and_scalar_position() {
    let records = vec![
        obj(json!({"owner": {"name": "a"}})),
        obj(json!({"owner": "unassigned"})),
    ];
    let schema = infer_schema(&records, 500);
    let flat = flatten_schema(&schema);

    assert!(flat.property("owner__name").is_some());
    assert_eq!(
        flat.property("owner").unwrap(),
        &FieldType::nullable(JsonType::String)
    );
}

#[test]
fn test_flatten_without_schema_expands_everything() {
    let record = obj(json!({"a": {"b": {"c": 1}}, "list": [{"x": 1}]}));
    assert_eq!(
        Value::Object(flatten_record(&record, None)),
        json!({"a__b__c": 1, "list": "[{\"x\": 1}]"})
    );
}

#[test]
fn test_flattened_keys_are_schema_columns() {
    let records: Vec<JsonObject> = vec![
        json!({"id": 1, "a": {"b": 1, "c": {"d": "2024-01-01T00:00:00Z"}}, "xs": [1, 2], "kids": [{"k": 1}]}),
        json!({"id": 2, "a": null, "xs": [], "kids": [], "note": "n"}),
        json!({"id": 3, "a": {"b": null, "c": {}}, "xs": null, "kids": null, "note": null}),
        json!({"id": 4, "a": {"c": {"d": null, "e": [{"z": 1}]}}, "note": {"nested": 1}}),
        json!({"id": 5, "blob": {"l1": {"l2": {"l3": {"l4": 1}}}}}),
    ]
    .into_iter()
    .map(obj)
    .collect();

    let schema = crate::schema::SchemaInferrer::new()
        .with_max_depth(2)
        .infer(&records);
    let denester = Denester::new("s", &schema, &keys());
    let columns = column_names(denester.flat_schema());

    for record in &records {
        for key in denester.flatten_record(record).keys() {
            assert!(columns.contains(key), "{key} missing from flattened schema");
        }
    }

    for child in denester.children().values() {
        let child_columns = column_names(&child.schema);
        for record in &records {
            for row in denester.child_records(record, child) {
                for key in row.keys() {
                    assert!(child_columns.contains(key), "{key} missing from child schema");
                }
            }
        }
    }
}

// ============================================================================
// JSON Text Tests
// ============================================================================

#[test]
fn test_json_text_spacing() {
    assert_eq!(to_json_text(&json!(["a", "b"])), "[\"a\", \"b\"]");
    assert_eq!(to_json_text(&json!([1, [2, 3]])), "[1, [2, 3]]");
    assert_eq!(to_json_text(&json!([{"k": 1, "v": null}])), "[{\"k\": 1, \"v\": null}]");
}
