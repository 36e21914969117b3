// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Field-by-field metadata merging
//!
//! `merge_maps(a, b)` folds `b` into `a`: nested objects merge recursively,
//! everything else (scalars, lists) from `b` replaces what `a` had. Keys
//! only present in `a` are kept.

use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

pub fn merge_maps(target: &mut Metadata, overlay: &Metadata) {
    for (key, value) in overlay {
        match target.get_mut(key) {
            Some(existing) => merge_values(existing, value),
            None => {
                let _ = target.insert(key.clone(), value.clone());
            }
        }
    }
}

pub fn merge_values(target: &mut Value, overlay: &Value) {
    match (target, overlay) {
        (Value::Object(target), Value::Object(overlay)) => merge_maps(target, overlay),
        (target, overlay) => *target = overlay.clone(),
    }
}
