//! Broadcast payload sanitizing.
//!
//! Strips `<` and `>` from every string leaf of a JSON value. This blunts the
//! most common markup injection into clients that render commentary as HTML;
//! it is not a full escaper and offers no guarantee for other encodings.

use serde_json::Value;

/// Recursively strip angle brackets from every string in `value`.
///
/// Arrays keep their length and objects keep their keys; numbers, booleans
/// and null pass through. Idempotent.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_angle_brackets(s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect()),
        other => other,
    }
}

fn strip_angle_brackets(s: String) -> String {
    if s.contains(['<', '>']) {
        s.chars().filter(|c| !matches!(c, '<' | '>')).collect()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_brackets_from_strings() {
        assert_eq!(
            sanitize(json!("<script>alert(1)</script>")),
            json!("scriptalert(1)/script")
        );
    }

    #[test]
    fn clean_values_are_unchanged() {
        let value = json!({"type": "goal", "matchId": 42, "minute": 10, "ok": true, "x": null});
        assert_eq!(sanitize(value.clone()), value);
    }

    #[test]
    fn recurses_into_nested_structures() {
        let value = json!({
            "commentary": [{"text": "<b>Goal!</b>"}, "a>b", 3],
            "meta": {"note": "<i>"}
        });
        assert_eq!(
            sanitize(value),
            json!({
                "commentary": [{"text": "bGoal!/b"}, "ab", 3],
                "meta": {"note": "i"}
            })
        );
    }

    #[test]
    fn keys_are_not_touched() {
        let value = json!({"<k>": "<v>"});
        assert_eq!(sanitize(value), json!({"<k>": "v"}));
    }

    #[test]
    fn array_length_preserved() {
        let value = json!(["<", ">", "<>", ""]);
        assert_eq!(sanitize(value), json!(["", "", "", ""]));
    }

    #[test]
    fn idempotent() {
        let value = json!({"a": ["<x>", {"b": "y<z"}], "n": 1.5});
        let once = sanitize(value);
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);
    }
}
