use serde_json::Value;

/// Renders a JSON scalar (a flush timestamp) as a single-line string.
pub fn value_to_string(value: Value) -> String {
    let raw = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    sanitize(raw)
}

fn sanitize(s: String) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stringifies_scalars_and_nested_values() {
        assert_eq!(value_to_string(json!("a")), "a");
        assert_eq!(value_to_string(json!(1718000000)), "1718000000");
        assert_eq!(value_to_string(json!(false)), "false");
        assert_eq!(value_to_string(json!({"k": [1]})), r#"{"k":[1]}"#);
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(value_to_string(json!("web\n01\t")), "web01");
    }
}
