//! Schema inference tests

use super::*;
use crate::types::JsonObject;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

fn records(values: Vec<Value>) -> Vec<JsonObject> {
    values
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
}

fn kinds(ft: &FieldType) -> Vec<&'static str> {
    ft.kinds.iter().map(|k| k.as_str()).collect()
}

// ============================================================================
// Leaf Inference Tests
// ============================================================================

#[test_case(json!(null), &["null", "string"]; "null")]
#[test_case(json!(true), &["null", "boolean"]; "boolean")]
#[test_case(json!(42), &["null", "integer"]; "integer")]
#[test_case(json!(1.5), &["null", "number"]; "float")]
#[test_case(json!("hello"), &["null", "string"]; "string")]
fn test_leaf_kinds(value: Value, expected: &[&str]) {
    let ft = SchemaInferrer::new().infer_value(&value, 0);
    assert_eq!(kinds(&ft), expected);
}

#[test_case("2024-01-15T10:30:00Z", true)]
#[test_case("2024-01-15 10:30:00", true)]
#[test_case("2024-01-15T10:30:00.123+05:30", true)]
#[test_case("2024-01-15T10:30:00-0800", true)]
#[test_case("2024-01-15", false)]
#[test_case("yesterday", false)]
#[test_case("2024-01-15T10:30", false)]
fn test_datetime_detection(value: &str, expected: bool) {
    assert_eq!(looks_like_datetime(value), expected);
}

#[test]
fn test_datetime_format_tag() {
    let ft = SchemaInferrer::new().infer_value(&json!("2024-01-15T10:30:00Z"), 0);
    assert_eq!(ft.format.as_deref(), Some(DATE_TIME_FORMAT));

    let ft = SchemaInferrer::new()
        .with_datetime_detection(false)
        .infer_value(&json!("2024-01-15T10:30:00Z"), 0);
    assert!(ft.format.is_none());
}

// ============================================================================
// Record Inference Tests
// ============================================================================

#[test]
fn test_infer_merges_across_records() {
    let sample = records(vec![
        json!({"id": 1, "price": 10}),
        json!({"id": 2, "price": 10.5, "note": null}),
        json!({"id": "3"}),
    ]);

    let schema = infer_schema(&sample, 500);

    assert_eq!(
        kinds(schema.property("id").unwrap()),
        vec!["null", "integer", "string"]
    );
    assert_eq!(
        kinds(schema.property("price").unwrap()),
        vec!["null", "integer", "number"]
    );
    assert_eq!(kinds(schema.property("note").unwrap()), vec!["null", "string"]);
}

#[test]
fn test_infer_nested_object_and_arrays() {
    let sample = records(vec![json!({
        "addr": {"city": "NY", "geo": {"lat": 1.5}},
        "tags": ["a", "b"],
        "orders": [{"o": 1}, {"o": 2, "sku": "x"}],
    })]);

    let schema = infer_schema(&sample, 500);

    let addr = schema.property("addr").unwrap();
    assert!(addr.is_structured_object());
    assert_eq!(
        kinds(addr.property("geo").unwrap().property("lat").unwrap()),
        vec!["null", "number"]
    );

    let tags = schema.property("tags").unwrap();
    assert_eq!(kinds(tags), vec!["null", "array"]);
    assert_eq!(kinds(tags.items.as_deref().unwrap()), vec!["null", "string"]);
    assert!(!tags.is_array_of_objects());

    let orders = schema.property("orders").unwrap();
    assert!(orders.is_array_of_objects());
    let item = orders.items.as_deref().unwrap();
    assert!(item.property("o").is_some());
    assert!(item.property("sku").is_some());
}

#[test]
fn test_array_sample_limited_to_first_elements() {
    let mut items: Vec<Value> = (0..10).map(|i| json!(i)).collect();
    items.push(json!("late string"));
    let sample = records(vec![json!({ "values": items })]);

    let schema = infer_schema(&sample, 500);
    let element = schema.property("values").unwrap().items.as_deref().unwrap();
    assert_eq!(kinds(element), vec!["null", "integer"]);
}

#[test]
fn test_max_sample_limits_records() {
    let sample = records(vec![json!({"a": 1}), json!({"b": 2})]);
    let schema = infer_schema(&sample, 1);
    assert!(schema.property("a").is_some());
    assert!(schema.property("b").is_none());
}

#[test]
fn test_depth_cap_drops_shape() {
    let sample = records(vec![json!({"l1": {"l2": {"l3": {"deep": 1}}}})]);
    let schema = SchemaInferrer::new().with_max_depth(1).infer(&sample);

    let l2 = schema.property("l1").unwrap().property("l2").unwrap();
    assert!(l2.opaque);
    assert!(l2.properties.is_empty());
    assert!(!l2.is_structured_object());
}

#[test]
fn test_record_order_does_not_matter() {
    let a = json!({"id": 1, "when": "2024-01-01T00:00:00Z", "tags": [{"k": 1}]});
    let b = json!({"id": "x", "when": null, "tags": [], "extra": {"n": true}});
    let c = json!({"id": 2.5, "when": "2024-01-02T00:00:00Z"});

    let forward = infer_schema(&records(vec![a.clone(), b.clone(), c.clone()]), 500);
    let backward = infer_schema(&records(vec![c, b, a]), 500);
    assert_eq!(forward, backward);
}

// ============================================================================
// Merge Law Tests
// ============================================================================

fn sample_types() -> Vec<FieldType> {
    let inferrer = SchemaInferrer::new();
    vec![
        inferrer.infer_value(&json!({"a": 1, "b": {"c": "2024-01-01T00:00:00Z"}}), 0),
        inferrer.infer_value(&json!({"a": "x", "d": [1, 2]}), 0),
        inferrer.infer_value(&json!({"b": null, "d": [{"e": 1.5}]}), 0),
        inferrer.infer_value(&json!("2024-01-01T00:00:00Z"), 0),
        inferrer.infer_value(&json!(null), 0),
        inferrer.infer_value(&json!([true]), 0),
    ]
}

#[test]
fn test_merge_is_commutative() {
    let types = sample_types();
    for a in &types {
        for b in &types {
            assert_eq!(a.merge(b), b.merge(a));
        }
    }
}

#[test]
fn test_merge_is_associative() {
    let types = sample_types();
    for a in &types {
        for b in &types {
            for c in &types {
                assert_eq!(a.merge(b).merge(c), a.merge(&b.merge(c)));
            }
        }
    }
}

#[test]
fn test_merge_is_idempotent() {
    for a in sample_types() {
        assert_eq!(a.merge(&a), a);
    }
    let types = sample_types();
    let ab = types[0].merge(&types[1]);
    assert_eq!(ab.merge(&types[0]), ab);
}

#[test]
fn test_format_kept_only_when_shared() {
    let dt = FieldType::nullable(JsonType::String).with_format(DATE_TIME_FORMAT);
    let plain = FieldType::nullable(JsonType::String);

    assert_eq!(dt.merge(&dt).format.as_deref(), Some(DATE_TIME_FORMAT));
    assert!(dt.merge(&plain).format.is_none());
}

// ============================================================================
// JSON Schema Conversion Tests
// ============================================================================

#[test]
fn test_to_json_schema() {
    let sample = records(vec![json!({"id": 1, "tags": ["a"], "when": "2024-01-01 00:00:00"})]);
    let schema = infer_schema(&sample, 500);

    assert_eq!(
        schema.to_json_schema(),
        json!({
            "type": ["null", "object"],
            "properties": {
                "id": {"type": ["null", "integer"]},
                "tags": {"type": ["null", "array"], "items": {"type": ["null", "string"]}},
                "when": {"type": ["null", "string"], "format": "date-time"},
            }
        })
    );
}

#[test]
fn test_from_json_schema_roundtrip() {
    let doc = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "meta": {"type": ["null", "object"]},
            "lines": {"type": "array", "items": {"type": "object", "properties": {"sku": {"type": "string"}}}},
        }
    });

    let ft = FieldType::from_json_schema(&doc).unwrap();
    assert!(ft.is_structured_object());
    assert!(ft.property("meta").unwrap().opaque);
    assert!(ft.property("lines").unwrap().is_array_of_objects());
    assert_eq!(FieldType::from_json_schema(&ft.to_json_schema()).unwrap(), ft);
}

#[test]
fn test_from_json_schema_rejects_unknown_type() {
    let err = FieldType::from_json_schema(&json!({"type": "decimal"})).unwrap_err();
    assert!(err.to_string().contains("decimal"));
}
