//! # Layer Precedence
//!
//! Deep merge of settings layers.
//!
//! # Rule
//! For a key present in both base and overlay:
//! - both values are mappings: merge recursively, key by key
//! - anything else: the overlay value replaces the base value wholesale
//!   (sequences are never concatenated)
//!
//! Keys present on only one side are kept as they are.

use serde_json::Value;

use crate::Mapping;

/// Merge `overlay` into `base` in place.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            merge_into(base_map, overlay_map);
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Merge `overlay` into the `base` mapping in place.
pub fn merge_into(base: &mut Mapping, overlay: &Mapping) {
    for (key, overlay_value) in overlay {
        match base.get_mut(key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => {
                base.insert(key.clone(), overlay_value.clone());
            }
        }
    }
}

/// Merge a named layer over `base`, logging the keys the layer touched.
pub fn merge_with_logging(mut base: Mapping, overlay: &Mapping, source_name: &str) -> Mapping {
    if overlay.is_empty() {
        return base;
    }

    let touched: Vec<&str> = overlay.keys().map(String::as_str).collect();
    tracing::debug!(source = source_name, keys = ?touched, "Applying settings layer");

    merge_into(&mut base, overlay);
    base
}
