//! Types related to GraphQL requests, responses, etc.

mod arguments;
mod document;

pub(crate) use arguments::to_arguments;
pub(crate) use document::mutation_document;
pub(crate) use document::selection_document;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::json_ext::Object;

/// A graphql request sent to a remote target.
///
/// Arguments are inlined in the document, so the query is the whole request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The GraphQL document.
    pub query: String,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// A GraphQL error as found in the `errors` field of a [`Response`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct Error {
    /// The error message.
    pub message: String,
}

/// A graphql response.
///
/// Converted back to JSON it is the entry recorded for the target in an orchestration run,
/// which is what `_prev[n]` backreferences read from.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct Response {
    /// The response data.
    pub data: Option<Value>,

    /// The errors reported by the server.
    pub errors: Vec<Error>,

    /// The optional GraphQL extensions.
    pub extensions: Object,
}

/// Only successful responses are converted: transports raise the reported errors instead.
impl From<Response> for Value {
    fn from(response: Response) -> Self {
        let mut object = Object::new();
        object.insert("data".to_string(), response.data.unwrap_or_default());
        if !response.extensions.is_empty() {
            object.insert(
                "extensions".to_string(),
                Value::Object(response.extensions),
            );
        }
        Value::Object(object)
    }
}
