use serde_json::Value;

/// PostgREST embeds a related resource either as a single object or as a
/// one-element array, depending on the cardinality it infers for the
/// relationship. Every read of an embedded resource goes through this
/// helper so the two shapes are handled in exactly one place.
pub fn first_or_self(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::Array(items) => items.first(),
        other => Some(other),
    }
}

/// Reach a string field of an embedded resource on a result row.
pub fn embedded_str<'a>(row: &'a Value, relation: &str, field: &str) -> Option<&'a str> {
    first_or_self(row.get(relation)?)?
        .get(field)?
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_shape_passes_through() {
        let row = json!({"patients": {"email": "a@b.ie"}});
        assert_eq!(embedded_str(&row, "patients", "email"), Some("a@b.ie"));
    }

    #[test]
    fn array_shape_takes_first_element() {
        let row = json!({"patients": [{"email": "a@b.ie"}, {"email": "x@y.ie"}]});
        assert_eq!(embedded_str(&row, "patients", "email"), Some("a@b.ie"));
    }

    #[test]
    fn null_and_empty_shapes_are_none() {
        assert!(first_or_self(&Value::Null).is_none());
        assert!(first_or_self(&json!([])).is_none());

        let row = json!({"patients": null});
        assert_eq!(embedded_str(&row, "patients", "email"), None);
    }

    #[test]
    fn missing_relation_or_field_is_none() {
        let row = json!({"doctors": {"first_name": "Nora"}});
        assert_eq!(embedded_str(&row, "patients", "email"), None);
        assert_eq!(embedded_str(&row, "doctors", "email"), None);
    }
}
