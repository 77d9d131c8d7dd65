//! Strips internal-only fields before a record crosses the RemoteClient
//! boundary (spec.md §4.7 step 2).

use serde_json::Value;

/// Bookkeeping keys a queued envelope may carry alongside a record. These
/// are the only keys ever removed; `raw_json` and the rest of the record's
/// own fields are left exactly as parsed.
const INTERNAL_KEYS: &[&str] = &["_queue_id", "_file_path", "_retry_count", "_gfx_pc_id"];

/// Removes the known bookkeeping keys from the top level of `value`.
/// Never descends into nested objects or arrays — in particular it must
/// not touch `raw_json`, which is required to cross the boundary as the
/// verbatim decoded document.
pub fn strip_internal_fields(value: &mut Value) {
    if let Value::Object(map) = value {
        for key in INTERNAL_KEYS {
            map.remove(*key);
        }
    }
}
