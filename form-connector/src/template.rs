//! A [`UriTemplate`] is a string containing zero or more `${path.to.value}` placeholders.
//! These are used in target URIs and in read queries.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::json_ext::to_plain_string;
use crate::json_ext::ValueExt;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([0-9a-zA-Z_.]+)\}").expect("placeholder regex is valid"));

/// A parsed template, containing a series of [`Part`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UriTemplate {
    parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Constant(String),
    Placeholder(Vec<String>),
}

impl UriTemplate {
    /// Split the template around its placeholders.
    ///
    /// Anything that is not a well formed placeholder is kept as a constant.
    pub fn parse(template: &str) -> Self {
        let mut parts = Vec::new();
        let mut offset = 0;
        for captures in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(path)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > offset {
                parts.push(Part::Constant(template[offset..whole.start()].to_string()));
            }
            parts.push(Part::Placeholder(
                path.as_str()
                    .split('.')
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect(),
            ));
            offset = whole.end();
        }
        if offset < template.len() {
            parts.push(Part::Constant(template[offset..].to_string()));
        }
        Self { parts }
    }

    /// Substitute the placeholders with the values found at their path.
    ///
    /// Strings are inserted as is, other values as JSON. Unresolved placeholders expand to
    /// nothing.
    pub fn interpolate(&self, placeholders: &Value) -> String {
        let mut result = String::new();
        for part in &self.parts {
            match part {
                Part::Constant(constant) => result.push_str(constant),
                Part::Placeholder(path) => match placeholders.get_path(path.as_slice()) {
                    Some(value) => result.push_str(&to_plain_string(value)),
                    None => {
                        tracing::warn!(placeholder = %path.join("."), "unresolved placeholder");
                    }
                },
            }
        }
        result
    }
}

/// Parse and interpolate a template in one go.
pub fn expand(template: &str, placeholders: &Value) -> String {
    UriTemplate::parse(template).interpolate(placeholders)
}
