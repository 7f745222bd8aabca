//! Transports used to reach remote targets.
//!
//! The request logic only depends on the two traits below; [`ReqwestTransport`] implements
//! both over HTTP.

mod form_encoding;
mod reqwest;

use std::fmt::Debug;

pub use form_encoding::encode_object_as_form_fields;
use serde_json::Value;

pub use self::reqwest::ReqwestTransport;
use crate::configuration::Headers;
use crate::error::FetchError;
use crate::graphql;

/// Body of a REST request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    /// Sent as `application/json`.
    Json(Value),
    /// Sent as `multipart/form-data`, one text part per field.
    Multipart(Vec<(String, String)>),
}

/// Issues plain HTTP requests and extracts their payload.
///
/// Implementations raise a [`FetchError`] on non-2xx statuses and on error shaped bodies.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Value, FetchError>;

    async fn post(&self, url: &str, headers: &Headers, body: Body) -> Result<Value, FetchError>;
}

/// Sends GraphQL documents.
///
/// Implementations raise the first error reported by the server instead of returning it.
#[async_trait::async_trait]
pub trait GraphQLTransport: Send + Sync + Debug {
    async fn execute(
        &self,
        url: &str,
        headers: &Headers,
        request: graphql::Request,
    ) -> Result<graphql::Response, FetchError>;
}
