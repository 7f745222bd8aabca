use itertools::Itertools;
use serde_json::Value;

use crate::json_ext::Object;

/// Serialize an object as the argument list of a GraphQL field.
///
/// Keys are written bare. The pairs of the top level object are not braced since they sit
/// directly inside the call parentheses; every nested object is. Array elements are always
/// braced, whatever their depth.
pub(crate) fn to_arguments(arguments: &Object) -> String {
    write_object(arguments, 0)
}

fn write_value(value: &Value, depth: usize) -> String {
    match value {
        Value::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| format!("{{{}}}", write_value(item, 0)))
                .join(",")
        ),
        Value::Object(object) => write_object(object, depth),
        scalar => scalar.to_string(),
    }
}

fn write_object(object: &Object, depth: usize) -> String {
    let depth = depth + 1;
    let pairs = object
        .iter()
        .map(|(key, value)| format!("{key}:{}", write_value(value, depth)))
        .join(",");
    if depth > 1 {
        format!("{{{pairs}}}")
    } else {
        pairs
    }
}
