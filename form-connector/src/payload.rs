//! Outbound payload construction.
//!
//! A target without `updateFields` receives every form field. Otherwise its payload is
//! built in two ordered phases:
//!
//! 1. form fields are walked in form order, and every spec reading the field is applied in
//!    declaration order,
//! 2. backreferences are resolved in declaration order.
//!
//! When two specs write the same key the last write wins.

use serde_json::Value;

use crate::configuration::RemoteMeta;
use crate::error::ConfigurationError;
use crate::field_spec::Backreference;
use crate::field_spec::FieldSpec;
use crate::field_spec::SubKey;
use crate::json_ext::without_uploads;
use crate::json_ext::Object;
use crate::json_ext::ValueExt;

/// Build the payload sent to a target.
///
/// `responses` holds the responses of the targets already processed in this run, in order.
/// The form values are not modified.
pub fn build_payload(
    form_values: &Object,
    meta: &RemoteMeta,
    responses: &[Value],
) -> Result<Object, ConfigurationError> {
    let form_values = without_uploads(form_values);
    let Some(update_fields) = meta.update_fields.as_deref() else {
        return Ok(form_values);
    };
    let relation = meta.is_relation();

    let mut payload = Object::new();
    for (field, value) in &form_values {
        for spec in update_fields
            .iter()
            .filter(|spec| spec.source_field() == Some(field.as_str()))
        {
            apply_form_field(spec, field, value, relation, &mut payload);
        }
    }

    for spec in update_fields {
        if let FieldSpec::PrevRef {
            dest,
            backreference,
        } = spec
        {
            apply_backreference(dest.as_deref(), backreference, relation, responses, &mut payload)?;
        }
    }

    let skipped = update_fields
        .iter()
        .filter(|spec| {
            spec.source_field()
                .map(|field| !form_values.contains_key(field))
                .unwrap_or_default()
        })
        .count();
    if skipped > 0 {
        tracing::debug!(skipped, "update fields without a matching form field");
    }

    Ok(payload)
}

fn apply_form_field(
    spec: &FieldSpec,
    field: &str,
    value: &Value,
    relation: bool,
    payload: &mut Object,
) {
    match spec {
        FieldSpec::Plain(_) => {
            payload.insert(field.to_string(), value.clone());
        }
        FieldSpec::Rename { dest, .. } => {
            let value = if relation {
                let mut wrapped = Object::new();
                wrapped.insert(field.to_string(), value.clone());
                Value::Object(wrapped)
            } else {
                value.clone()
            };
            payload.insert(dest.clone(), value);
        }
        FieldSpec::SubSelect { dest, keys, .. } => {
            payload.insert(dest.clone(), sub_select(value, keys));
        }
        FieldSpec::FanOut { keys, .. } => {
            let source = match value {
                Value::Array(items) => items.first(),
                other => Some(other),
            };
            let Some(Value::Object(source)) = source else {
                tracing::warn!(field, "fan-out source is not an object, skipping");
                return;
            };
            for key in keys {
                if let Some(value) = source.get(key) {
                    payload.insert(key.clone(), value.clone());
                }
            }
        }
        FieldSpec::PrevRef { .. } => {}
    }
}

/// Keep the selected keys of each object, renaming them on the way.
fn sub_select(value: &Value, keys: &[SubKey]) -> Value {
    let select = |object: &Object| {
        let mut selected = Object::new();
        for key in keys {
            if let Some(value) = object.get(&key.source) {
                selected.insert(key.target.clone(), value.clone());
            }
        }
        Value::Object(selected)
    };
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(object) => select(object),
                    other => other.clone(),
                })
                .collect(),
        ),
        Value::Object(object) => select(object),
        other => other.clone(),
    }
}

fn apply_backreference(
    dest: Option<&str>,
    backreference: &Backreference,
    relation: bool,
    responses: &[Value],
    payload: &mut Object,
) -> Result<(), ConfigurationError> {
    let Some(value) = resolve_backreference(backreference, responses)? else {
        tracing::warn!(%backreference, "backreference did not resolve to a value, skipping");
        return Ok(());
    };
    match (dest, backreference.leaf()) {
        (Some(dest), Some(leaf)) if relation => {
            let mut wrapped = Object::new();
            wrapped.insert(leaf.to_string(), value);
            payload.insert(dest.to_string(), Value::Object(wrapped));
        }
        (Some(dest), _) => {
            payload.insert(dest.to_string(), value);
        }
        (None, Some(leaf)) => {
            payload.insert(leaf.to_string(), value);
        }
        // bare backreferences always have a path
        (None, None) => {}
    }
    Ok(())
}

/// Look up `responses[index].data.response` then follow the path.
///
/// Servers answering with a list have their first element used.
pub(crate) fn resolve_backreference(
    backreference: &Backreference,
    responses: &[Value],
) -> Result<Option<Value>, ConfigurationError> {
    let index = backreference.index;
    let response = responses
        .get(index)
        .ok_or(ConfigurationError::MissingResponse {
            index,
            available: responses.len(),
        })?;
    let data = response
        .get_path(&["data", "response"])
        .ok_or(ConfigurationError::ResponseWithoutData { index })?;
    let data = match data {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Ok(None),
        },
        other => other,
    };
    Ok(data
        .get_path(backreference.path.as_slice())
        .filter(|value| !value.is_null())
        .cloned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::configuration::GraphQLOperation;
    use crate::configuration::GraphQLTarget;
    use crate::configuration::OperationKind;

    fn object(value: Value) -> Object {
        value.as_object().cloned().expect("test value is an object")
    }

    fn meta(update_fields: Value) -> RemoteMeta {
        RemoteMeta {
            update_fields: Some(serde_json::from_value(update_fields).unwrap()),
            ..Default::default()
        }
    }

    fn relation(update_fields: Value) -> RemoteMeta {
        RemoteMeta {
            graphql: Some(GraphQLTarget::Operation(GraphQLOperation {
                method: "link".into(),
                kind: OperationKind::Relation,
                response_fields: None,
                id_field: Default::default(),
            })),
            ..meta(update_fields)
        }
    }

    fn build(form_values: Value, meta: &RemoteMeta, responses: &[Value]) -> Value {
        Value::Object(build_payload(&object(form_values), meta, responses).unwrap())
    }

    #[test]
    fn forwards_everything_without_update_fields() {
        let form_values = json!({
            "name": "Ada",
            "avatar": { "url": "a.png", "S3file": { "key": "k" } },
            "files": [{ "name": "f", "S3file": "x" }]
        });
        assert_eq!(
            build(form_values, &RemoteMeta::default(), &[]),
            json!({
                "name": "Ada",
                "avatar": { "url": "a.png" },
                "files": [{ "name": "f" }]
            })
        );
    }

    #[test]
    fn never_modifies_the_form_values() {
        let form_values = object(json!({ "avatar": { "S3file": "x" }, "name": "Ada" }));
        let copy = form_values.clone();
        let _ = build_payload(&form_values, &meta(json!(["name"])), &[]).unwrap();
        let _ = build_payload(&form_values, &RemoteMeta::default(), &[]).unwrap();
        assert_eq!(form_values, copy);
    }

    #[test]
    fn plain_fields_and_renames() {
        assert_eq!(
            build(
                json!({ "name": "Ada", "contact": "ada@example.com", "age": 36 }),
                &meta(json!(["name", { "email": "contact" }, "unknown"])),
                &[]
            ),
            json!({ "name": "Ada", "email": "ada@example.com" })
        );
    }

    #[test]
    fn payload_follows_form_order() {
        let payload = build_payload(
            &object(json!({ "b": 2, "a": 1, "c": 3 })),
            &meta(json!(["c", "a", "b"])),
            &[],
        )
        .unwrap();
        assert_eq!(payload.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn sub_selection_filters_items() {
        assert_eq!(
            build(
                json!({ "items": [{ "id": 1, "name": "x", "extra": "y" }] }),
                &meta(json!(["items{id,name}"])),
                &[]
            ),
            json!({ "items": [{ "id": 1, "name": "x" }] })
        );
    }

    #[test]
    fn sub_selection_renames_keys() {
        assert_eq!(
            build(
                json!({
                    "items": [
                        { "id": 1, "name": "x", "extra": "y" },
                        { "id": 2, "name": "z" }
                    ],
                    "owner": { "id": 3, "name": "o", "secret": true }
                }),
                &meta(json!(["items{id,label:name}", { "user": "owner{id}" }])),
                &[]
            ),
            json!({
                "items": [{ "id": 1, "label": "x" }, { "id": 2, "label": "z" }],
                "user": { "id": 3 }
            })
        );
    }

    #[test]
    fn fan_out_flattens_the_first_item() {
        assert_eq!(
            build(
                json!({ "meta": [{ "a": 1, "b": 2, "c": 3 }, { "a": 4 }] }),
                &meta(json!(["meta=>a,b"])),
                &[]
            ),
            json!({ "a": 1, "b": 2 })
        );
        assert_eq!(
            build(json!({ "meta": [] }), &meta(json!(["meta=>a"])), &[]),
            json!({})
        );
    }

    #[test]
    fn backreference_by_rename() {
        let responses = [json!({ "data": { "response": { "id": 42 } } })];
        assert_eq!(
            build(json!({}), &meta(json!([{ "dest": "_prev[0].id" }])), &responses),
            json!({ "dest": 42 })
        );
    }

    #[test]
    fn bare_backreference_uses_its_leaf() {
        let responses = [
            json!({ "data": { "response": [{ "user": { "_id": "u1" } }] } }),
            json!({ "data": { "response": { "_id": "p1" } } }),
        ];
        assert_eq!(
            build(
                json!({ "name": "x" }),
                &meta(json!(["name", "_prev[0].user._id"])),
                &responses
            ),
            json!({ "name": "x", "_id": "u1" })
        );
    }

    #[test]
    fn relation_writes_direction_keys() {
        let responses = [
            json!({ "data": { "response": { "_id": "a" } } }),
            json!({ "data": { "response": { "_id": "b" } } }),
        ];
        assert_eq!(
            build(
                json!({ "name": "ignored", "role": "admin" }),
                &relation(json!([
                    { "from": "_prev[0]._id" },
                    { "to": "_prev[1]._id" },
                    { "as": "role" }
                ])),
                &responses
            ),
            json!({
                "as": { "role": "admin" },
                "from": { "_id": "a" },
                "to": { "_id": "b" }
            })
        );
    }

    #[test]
    fn backreferences_win_over_form_fields() {
        let responses = [json!({ "data": { "response": { "id": 7 } } })];
        assert_eq!(
            build(
                json!({ "id": 1 }),
                &meta(json!([{ "id": "_prev[0].id" }, "id"])),
                &responses
            ),
            json!({ "id": 7 })
        );
    }

    #[test]
    fn unresolved_leaf_is_omitted() {
        let responses = [json!({ "data": { "response": { "other": 1, "id": null } } })];
        assert_eq!(
            build(
                json!({}),
                &meta(json!([{ "dest": "_prev[0].missing" }, "_prev[0].id"])),
                &responses
            ),
            json!({})
        );
        let responses = [json!({ "data": { "response": [] } })];
        assert_eq!(
            build(json!({}), &meta(json!(["_prev[0].id"])), &responses),
            json!({})
        );
    }

    #[test]
    fn missing_response_is_a_configuration_error() {
        let responses = [json!({ "data": { "response": { "id": 1 } } })];
        assert_eq!(
            build_payload(&Object::new(), &meta(json!(["_prev[1].id"])), &responses),
            Err(ConfigurationError::MissingResponse {
                index: 1,
                available: 1
            })
        );
        assert_eq!(
            build_payload(
                &Object::new(),
                &meta(json!(["_prev[0].id"])),
                &[json!({ "ok": true })]
            ),
            Err(ConfigurationError::ResponseWithoutData { index: 0 })
        );
    }
}
