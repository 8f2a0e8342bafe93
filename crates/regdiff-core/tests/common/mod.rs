use proptest::prelude::*;
use regdiff_core::normalize::{normalize, NormalizeOptions, NormalizedValue};
use serde_json::Value;

/// Normalize with default options
#[allow(dead_code)]
pub fn norm(value: &Value) -> NormalizedValue {
    normalize(value, &NormalizeOptions::default()).unwrap()
}

/// Normalize with `hide_empty`
#[allow(dead_code)]
pub fn norm_hidden(value: &Value) -> NormalizedValue {
    normalize(value, &NormalizeOptions::hiding_empty()).unwrap()
}

/// Arbitrary JSON payloads, a few levels deep, with plenty of empties
#[allow(dead_code)]
pub fn arb_payload() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        Just(Value::String(String::new())),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-z]{1,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-f]{1,3}", inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// True if no member anywhere below `value` is empty
#[allow(dead_code)]
pub fn has_no_empty_members(value: &NormalizedValue) -> bool {
    match value {
        NormalizedValue::Scalar(_) => true,
        NormalizedValue::Sequence(items) => items
            .iter()
            .all(|v| !v.is_empty() && has_no_empty_members(v)),
        NormalizedValue::Mapping(entries) => entries
            .values()
            .all(|v| !v.is_empty() && has_no_empty_members(v)),
    }
}
