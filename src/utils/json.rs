use serde_json::Value;

/// Walks `segments` into `value`; numeric segments index arrays.
pub(crate) fn resolve_path<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Scalar leaves of `value` joined by newlines, or `None` when there are none.
///
/// Object keys are never included, so a term can only match field values.
pub(crate) fn leaf_text(value: &Value) -> Option<String> {
    let mut parts = Vec::new();
    push_leaves(value, &mut parts);
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

fn push_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Bool(v) => out.push(v.to_string()),
        Value::Number(v) => out.push(v.to_string()),
        Value::String(v) => out.push(v.clone()),
        Value::Array(items) => items.iter().for_each(|item| push_leaves(item, out)),
        Value::Object(map) => map.values().for_each(|item| push_leaves(item, out)),
    }
}

pub(crate) fn top_level_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}
