use serde_json::Value;

use crate::json_ext::Object;

/// Flatten an object into multipart text fields.
///
/// Nested keys use the bracket notation: `a[b]` for objects and `a[0]` for arrays. `null`
/// becomes an empty value and empty arrays or objects produce no field.
pub fn encode_object_as_form_fields(object: &Object) -> Vec<(String, String)> {
    fn encode(fields: &mut Vec<(String, String)>, value: &Value, prefix: &str) {
        match value {
            Value::Null => fields.push((prefix.to_string(), String::new())),
            Value::String(s) => fields.push((prefix.to_string(), s.clone())),
            Value::Bool(b) => fields.push((prefix.to_string(), b.to_string())),
            Value::Number(n) => fields.push((prefix.to_string(), n.to_string())),
            Value::Array(array) => {
                for (i, value) in array.iter().enumerate() {
                    encode(fields, value, &format!("{prefix}[{i}]"));
                }
            }
            Value::Object(object) => {
                for (key, value) in object {
                    encode(fields, value, &format!("{prefix}[{key}]"));
                }
            }
        }
    }

    let mut fields = Vec::new();
    for (key, value) in object {
        encode(&mut fields, value, key);
    }
    fields
}
