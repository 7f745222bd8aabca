//! Field mapping rules of a remote target.
//!
//! Each `updateFields` entry is either a string or a single entry object. Both forms are
//! parsed into a [`FieldSpec`] when the configuration is loaded:
//!
//! | entry                  | spec                                                     |
//! |------------------------|----------------------------------------------------------|
//! | `name`                 | [`FieldSpec::Plain`]                                     |
//! | `{ dest: name }`       | [`FieldSpec::Rename`]                                    |
//! | `items{id,label:name}` | [`FieldSpec::SubSelect`], `{ dest: "items{id}" }` too    |
//! | `meta=>a,b`            | [`FieldSpec::FanOut`]                                    |
//! | `_prev[0].user._id`    | [`FieldSpec::PrevRef`], `{ dest: "_prev[0]._id" }` too   |

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::ConfigurationError;

const PREV_PREFIX: &str = "_prev[";
const FAN_OUT: &str = "=>";

/// A parsed `updateFields` entry.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(try_from = "RawFieldSpec")]
pub enum FieldSpec {
    /// Copy the form field as is.
    Plain(String),

    /// Copy the form field `source` under `dest`.
    Rename { dest: String, source: String },

    /// Keep a subset of the keys of each object of the form field.
    SubSelect {
        dest: String,
        field: String,
        keys: Vec<SubKey>,
    },

    /// Copy keys of the first object of the form field onto the payload itself.
    FanOut { field: String, keys: Vec<String> },

    /// Read a value from the response of an earlier target of the run.
    ///
    /// Without `dest` the value is written under the last segment of the path.
    PrevRef {
        dest: Option<String>,
        backreference: Backreference,
    },
}

/// A key kept by a [`FieldSpec::SubSelect`], possibly renamed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubKey {
    pub target: String,
    pub source: String,
}

/// `_prev[index].path`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Backreference {
    pub index: usize,
    pub path: Vec<String>,
}

impl Backreference {
    /// The last segment of the path, used as the key of the resolved value.
    pub fn leaf(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

impl FieldSpec {
    /// The form field this spec reads, backreferences read none.
    pub fn source_field(&self) -> Option<&str> {
        match self {
            FieldSpec::Plain(field) => Some(field),
            FieldSpec::Rename { source, .. } => Some(source),
            FieldSpec::SubSelect { field, .. } | FieldSpec::FanOut { field, .. } => Some(field),
            FieldSpec::PrevRef { .. } => None,
        }
    }

    fn parse_entry(entry: &str) -> Result<Self, ConfigurationError> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(invalid(entry, "empty field name"));
        }
        if entry.starts_with(PREV_PREFIX) {
            let backreference = parse_backreference(entry)?;
            if backreference.leaf().is_none() {
                return Err(invalid(entry, "a bare backreference needs a path to name its key"));
            }
            return Ok(FieldSpec::PrevRef {
                dest: None,
                backreference,
            });
        }
        if let Some((field, keys)) = entry.split_once(FAN_OUT) {
            let field = field.trim();
            if field.is_empty() {
                return Err(invalid(entry, "missing field before `=>`"));
            }
            let keys = split_list(keys);
            if keys.is_empty() {
                return Err(invalid(entry, "missing keys after `=>`"));
            }
            return Ok(FieldSpec::FanOut {
                field: field.to_string(),
                keys: keys.into_iter().map(str::to_string).collect(),
            });
        }
        if entry.contains('{') || entry.contains('}') {
            let (field, keys) = parse_sub_selection(entry)?;
            return Ok(FieldSpec::SubSelect {
                dest: field.clone(),
                field,
                keys,
            });
        }
        Ok(FieldSpec::Plain(entry.to_string()))
    }

    fn parse_mapping(dest: &str, expression: &str) -> Result<Self, ConfigurationError> {
        let dest = dest.trim();
        let expression = expression.trim();
        let spec = format!("{dest}: {expression}");
        if dest.is_empty() || expression.is_empty() {
            return Err(invalid(&spec, "empty key or value"));
        }
        if expression.starts_with(PREV_PREFIX) {
            return Ok(FieldSpec::PrevRef {
                dest: Some(dest.to_string()),
                backreference: parse_backreference(expression)?,
            });
        }
        if expression.contains(FAN_OUT) {
            return Err(invalid(&spec, "a fan-out writes several keys and cannot be renamed"));
        }
        if expression.contains('{') || expression.contains('}') {
            let (field, keys) = parse_sub_selection(expression)?;
            return Ok(FieldSpec::SubSelect {
                dest: dest.to_string(),
                field,
                keys,
            });
        }
        Ok(FieldSpec::Rename {
            dest: dest.to_string(),
            source: expression.to_string(),
        })
    }
}

fn invalid(spec: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidFieldSpec {
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}

fn split_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_sub_selection(entry: &str) -> Result<(String, Vec<SubKey>), ConfigurationError> {
    let (field, rest) = entry
        .split_once('{')
        .ok_or_else(|| invalid(entry, "missing `{`"))?;
    let inner = rest
        .strip_suffix('}')
        .ok_or_else(|| invalid(entry, "a sub-selection must end with `}`"))?;
    if inner.contains('{') || inner.contains('}') {
        return Err(invalid(entry, "nested sub-selections are not supported"));
    }
    let field = field.trim();
    if field.is_empty() {
        return Err(invalid(entry, "missing field before `{`"));
    }
    let keys = split_list(inner)
        .into_iter()
        .map(|token| match token.split_once(':') {
            Some((target, source)) if !target.trim().is_empty() && !source.trim().is_empty() => {
                Ok(SubKey {
                    target: target.trim().to_string(),
                    source: source.trim().to_string(),
                })
            }
            Some(_) => Err(invalid(entry, "a renamed key needs both `target:source`")),
            None => Ok(SubKey {
                target: token.to_string(),
                source: token.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        return Err(invalid(entry, "empty sub-selection"));
    }
    Ok((field.to_string(), keys))
}

fn parse_backreference(expression: &str) -> Result<Backreference, ConfigurationError> {
    let rest = expression
        .strip_prefix(PREV_PREFIX)
        .ok_or_else(|| invalid(expression, "a backreference starts with `_prev[`"))?;
    let (index, path) = rest
        .split_once(']')
        .ok_or_else(|| invalid(expression, "missing `]`"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|err| invalid(expression, &format!("invalid response index: {err}")))?;
    let path = match path {
        "" => Vec::new(),
        path => {
            let path = path
                .strip_prefix('.')
                .ok_or_else(|| invalid(expression, "expected `.` after `]`"))?;
            let segments = path.split('.').map(str::to_string).collect::<Vec<_>>();
            if segments.iter().any(String::is_empty) {
                return Err(invalid(expression, "empty path segment"));
            }
            segments
        }
    };
    Ok(Backreference { index, path })
}

/// The configuration forms of an `updateFields` entry.
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(untagged)]
enum RawFieldSpec {
    /// A field name, `field{a,b}`, `field=>a,b` or `_prev[n].path`.
    Entry(String),
    /// A single `{ dest: source }` mapping.
    Mapping(BTreeMap<String, String>),
}

impl TryFrom<RawFieldSpec> for FieldSpec {
    type Error = ConfigurationError;

    fn try_from(raw: RawFieldSpec) -> Result<Self, Self::Error> {
        match raw {
            RawFieldSpec::Entry(entry) => FieldSpec::parse_entry(&entry),
            RawFieldSpec::Mapping(mapping) => {
                let mut entries = mapping.iter();
                match (entries.next(), entries.next()) {
                    (Some((dest, expression)), None) => FieldSpec::parse_mapping(dest, expression),
                    _ => Err(invalid(
                        &format!("{mapping:?}"),
                        "a mapping must have exactly one entry",
                    )),
                }
            }
        }
    }
}

impl std::str::FromStr for FieldSpec {
    type Err = ConfigurationError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        FieldSpec::parse_entry(entry)
    }
}

impl JsonSchema for FieldSpec {
    fn schema_name() -> String {
        "FieldSpec".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        RawFieldSpec::json_schema(gen)
    }
}

impl fmt::Display for Backreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREV_PREFIX}{}]", self.index)?;
        for segment in &self.path {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = |keys: &[SubKey]| {
            keys.iter()
                .map(|key| {
                    if key.target == key.source {
                        key.target.clone()
                    } else {
                        format!("{}:{}", key.target, key.source)
                    }
                })
                .join(",")
        };
        match self {
            FieldSpec::Plain(field) => write!(f, "{field}"),
            FieldSpec::Rename { dest, source } => write!(f, "{{{dest}: {source}}}"),
            FieldSpec::SubSelect {
                dest,
                field,
                keys: selected,
            } if dest == field => write!(f, "{field}{{{}}}", keys(selected)),
            FieldSpec::SubSelect {
                dest,
                field,
                keys: selected,
            } => write!(f, "{{{dest}: {field}{{{}}}}}", keys(selected)),
            FieldSpec::FanOut { field, keys } => write!(f, "{field}{FAN_OUT}{}", keys.join(",")),
            FieldSpec::PrevRef {
                dest: None,
                backreference,
            } => write!(f, "{backreference}"),
            FieldSpec::PrevRef {
                dest: Some(dest),
                backreference,
            } => write!(f, "{{{dest}: {backreference}}}"),
        }
    }
}
