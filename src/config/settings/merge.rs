// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use serde_json::Value;

/// Deep-merge two JSON values.
/// `base` is existing file content, `overlay` is serialized current struct.
/// Overlay values take priority.
pub(super) fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = if let Some(base_val) = base_map.remove(&key) {
                    deep_merge(base_val, overlay_val)
                } else {
                    overlay_val
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_base, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_replaces_scalars_and_arrays() {
        let base = json!({ "list": [1, 2, 3], "value": { "nested": true } });
        let overlay = json!({ "list": [4], "value": 5 });
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["list"], json!([4]));
        assert_eq!(merged["value"], 5);
    }

    #[test]
    fn test_deep_merge_overlay_wins() {
        let base = json!({ "a": 1, "nested": { "keep": true, "x": 1 } });
        let overlay = json!({ "nested": { "x": 2 } });
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["nested"]["keep"], true);
        assert_eq!(merged["nested"]["x"], 2);
    }
}
