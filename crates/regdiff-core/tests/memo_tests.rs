#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::arb_payload;
use proptest::prelude::*;
use regdiff_core::diff::{should_recompute, DiffMemo};
use serde_json::{json, Value};
use std::sync::Arc;

/// Change one leaf somewhere in `value`, if it has one
fn bump_first_leaf(value: &mut Value) -> bool {
    match value {
        Value::Object(entries) => entries.values_mut().any(bump_first_leaf),
        Value::Array(items) => items.iter_mut().any(bump_first_leaf),
        leaf => {
            *leaf = json!("__bumped__");
            true
        }
    }
}

proptest! {
    #[test]
    fn prop_deep_equal_clones_skip(a in arb_payload(), b in arb_payload()) {
        let (a2, b2) = (a.clone(), b.clone());
        prop_assert!(!should_recompute(Some(&a), Some(&b), Some(&a2), Some(&b2)));
    }

    #[test]
    fn prop_any_leaf_change_recomputes(a in arb_payload()) {
        let mut next = a.clone();
        if bump_first_leaf(&mut next) && next != a {
            prop_assert!(should_recompute(Some(&a), None, Some(&next), None));
        }
    }
}

#[test]
fn test_render_loop_reuses_tree() {
    let mut memo = DiffMemo::default();
    let left = json!({"name": "metre", "aliases": ["m"]});
    let right = json!({"name": "meter", "aliases": ["m"]});

    let first = memo.diff(Some(&left), Some(&right)).unwrap();
    for _ in 0..5 {
        // fresh allocations each frame, same content
        let l = left.clone();
        let r = right.clone();
        let again = memo.diff(Some(&l), Some(&r)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
    assert_eq!(memo.hits(), 5);
    assert_eq!(memo.misses(), 1);
}

#[test]
fn test_memoized_result_equals_fresh_result() {
    let mut memo = DiffMemo::default();
    let a = json!({"x": [1, 2, 3]});
    let b = json!({"x": [1, 2]});
    memo.diff(Some(&a), Some(&b)).unwrap();
    let cached = memo.diff(Some(&a), Some(&b)).unwrap();
    let fresh = regdiff_core::compute_diff(Some(&a), Some(&b), memo.options()).unwrap();
    assert_eq!(*cached, fresh);
}
