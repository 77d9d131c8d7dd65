//! Static, ordered field lookup over a decoded JSON document.
//!
//! PokerGFX files mix PascalCase, snake_case, and camelCase key spellings
//! (and sometimes nest fields under a `session` object). Rather than rely
//! on reflection, each field has a fixed, ordered list of key paths to try;
//! the first that resolves to a non-null value wins. A key path with a `.`
//! addresses a nested object (only one level of nesting is used: `session.*`).

use serde_json::Value;

/// Look up the first matching key path in `candidates`, case-insensitively
/// per path segment. Returns the raw `Value` of the first hit.
pub fn lookup<'a>(doc: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    for path in candidates {
        if let Some(value) = resolve_path(doc, path) {
            if !value.is_null() {
                return Some(value);
            }
        }
    }
    None
}

fn resolve_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = get_ci(doc, first)?;
    for segment in segments {
        current = get_ci(current, segment)?;
    }
    Some(current)
}

fn get_ci<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    let obj = doc.as_object()?;
    if let Some(v) = obj.get(key) {
        return Some(v);
    }
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

pub fn lookup_str(doc: &Value, candidates: &[&str]) -> Option<String> {
    lookup(doc, candidates).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub fn lookup_i64(doc: &Value, candidates: &[&str]) -> Option<i64> {
    lookup(doc, candidates).and_then(|v| v.as_i64())
}

pub fn lookup_f64(doc: &Value, candidates: &[&str]) -> Option<f64> {
    lookup(doc, candidates).and_then(|v| v.as_f64())
}

pub fn lookup_bool(doc: &Value, candidates: &[&str]) -> Option<bool> {
    lookup(doc, candidates).and_then(|v| v.as_bool())
}

pub fn lookup_array<'a>(doc: &'a Value, candidates: &[&str]) -> Option<&'a Vec<Value>> {
    lookup(doc, candidates).and_then(|v| v.as_array())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[yare::parameterized(
        top_level_pascal = { json!({"ID": 7}), &["ID", "session_id", "session.id", "id"], Some("7") },
        top_level_snake  = { json!({"session_id": 7}), &["ID", "session_id", "session.id", "id"], Some("7") },
        nested_session   = { json!({"session": {"id": 7}}), &["ID", "session_id", "session.id", "id"], Some("7") },
        lowercase_id     = { json!({"id": 7}), &["ID", "session_id", "session.id", "id"], Some("7") },
        missing          = { json!({}), &["ID", "session_id", "session.id", "id"], None },
    )]
    fn priority_lookup(doc: Value, candidates: &[&str], expected: Option<&str>) {
        assert_eq!(lookup_str(&doc, candidates).as_deref(), expected);
    }

    #[test]
    fn lookup_is_case_insensitive_per_segment() {
        let doc = json!({"Session": {"ID": 42}});
        assert_eq!(lookup_i64(&doc, &["session.id"]), Some(42));
    }

    #[test]
    fn first_non_null_candidate_wins() {
        let doc = json!({"ID": null, "session_id": 5});
        assert_eq!(lookup_i64(&doc, &["ID", "session_id"]), Some(5));
    }

    #[test]
    fn lookup_array_returns_slice() {
        let doc = json!({"Hands": [1, 2, 3]});
        assert_eq!(lookup_array(&doc, &["Hands", "hands"]).map(|a| a.len()), Some(3));
    }
}
