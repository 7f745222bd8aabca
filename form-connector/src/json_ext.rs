//! JSON helpers shared by the payload builder, the executor and the templates.
//!
//! All helpers here return new values: form values are shared between targets and must
//! never be modified in place.

use serde_json::Map;
use serde_json::Value;

/// A JSON object.
pub type Object = Map<String, Value>;

/// Key under which uploaded files are attached to form values.
///
/// Upload artifacts are never forwarded to remote APIs.
pub(crate) const UPLOAD_KEY: &str = "S3file";

/// Extension trait for [`serde_json::Value`].
pub(crate) trait ValueExt {
    /// Whether the value counts as empty for pruning: `null` or `""`.
    ///
    /// `0` and `false` are kept. Empty arrays and objects are kept too.
    fn is_prunable(&self) -> bool;

    /// Follow `path` through nested objects.
    fn get_path<'a, S: AsRef<str>>(&'a self, path: &[S]) -> Option<&'a Value>;
}

impl ValueExt for Value {
    fn is_prunable(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    fn get_path<'a, S: AsRef<str>>(&'a self, path: &[S]) -> Option<&'a Value> {
        path.iter()
            .try_fold(self, |current, key| current.as_object()?.get(key.as_ref()))
    }
}

/// Remove the keys holding empty values.
///
/// Arrays whose first element is an object have each of their object elements pruned as
/// well; scalar arrays and nested plain objects are left untouched.
pub(crate) fn prune_empty_keys(object: &Object) -> Object {
    object
        .iter()
        .filter(|(_, value)| !value.is_prunable())
        .map(|(key, value)| {
            let value = match value {
                Value::Array(items) if items.first().map(Value::is_object).unwrap_or_default() => {
                    Value::Array(
                        items
                            .iter()
                            .map(|item| match item {
                                Value::Object(inner) => Value::Object(prune_empty_keys(inner)),
                                other => other.clone(),
                            })
                            .collect(),
                    )
                }
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Replace every `null` in the tree by an empty string.
///
/// Some remote servers reject `null` arguments, the empty string is pruned or sent instead.
pub(crate) fn nulls_to_empty_strings(value: &Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        Value::Array(items) => Value::Array(items.iter().map(nulls_to_empty_strings).collect()),
        Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| (key.clone(), nulls_to_empty_strings(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Copy the form values without the upload artifacts.
///
/// The key is removed from top level object values and from the objects of top level
/// arrays.
pub(crate) fn without_uploads(form_values: &Object) -> Object {
    fn strip(value: &Value) -> Value {
        match value {
            Value::Object(object) => {
                let mut object = object.clone();
                object.shift_remove(UPLOAD_KEY);
                Value::Object(object)
            }
            other => other.clone(),
        }
    }

    form_values
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Array(items) => Value::Array(items.iter().map(strip).collect()),
                other => strip(other),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Render a value the way it is interpolated in strings: strings are inserted raw,
/// everything else as JSON.
pub(crate) fn to_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
