//! Built-in sample hierarchy used by `treeindex demo` and when no data file is given.

use serde_json::{json, Value};

/// Eight records, three levels below the top-level record 1.
///
/// ```text
/// 1
/// ├── 2
/// │   ├── 4
/// │   │   ├── 7
/// │   │   └── 8
/// │   ├── 5
/// │   └── 6
/// └── 3
/// ```
pub fn demo_records() -> Vec<Value> {
    vec![
        json!({"id": 1, "parent": "root"}),
        json!({"id": 2, "parent": 1, "type": "test"}),
        json!({"id": 3, "parent": 1, "type": "test"}),
        json!({"id": 4, "parent": 2, "type": "test"}),
        json!({"id": 5, "parent": 2, "type": "test"}),
        json!({"id": 6, "parent": 2, "type": "test"}),
        json!({"id": 7, "parent": 4, "type": null}),
        json!({"id": 8, "parent": 4, "type": null}),
    ]
}
