//! Connector errors.
use displaydoc::Display;
use serde::Serialize;
use thiserror::Error;

/// Error types for remote fetches.
///
/// These are raised by the transports and never retried: the first one aborts the
/// orchestration run it belongs to.
#[derive(Error, Display, Debug, Clone, Serialize, Eq, PartialEq)]
#[serde(untagged)]
#[ignore_extra_doc_attributes]
#[non_exhaustive]
pub enum FetchError {
    /// request was malformed: {reason}
    MalformedRequest {
        /// The reason the request could not be built.
        reason: String,
    },

    /// service '{service}' response was malformed: {reason}
    SubrequestMalformedResponse {
        /// The service that responded with the malformed response.
        service: String,

        /// The reason the deserialization failed.
        reason: String,
    },

    /// HTTP fetch failed from '{service}': {reason}
    ///
    /// note that this relates to a transport error and not a GraphQL error
    SubrequestHttpError {
        status_code: Option<u16>,

        /// The service failed.
        service: String,

        /// The reason the fetch failed.
        reason: String,
    },

    /// service '{service}' returned a GraphQL error: {message}
    SubrequestGraphQLError {
        /// The service that reported the error.
        service: String,

        /// The message of the first reported error.
        message: String,
    },

    /// service '{service}' answered with an error payload: {reason}
    RemoteError {
        /// The service that answered.
        service: String,

        /// The error extracted from the body.
        reason: String,
    },
}

impl FetchError {
    /// Error code, suitable for logging and machine consumption.
    pub fn extension_code(&self) -> &'static str {
        match self {
            FetchError::MalformedRequest { .. } => "MALFORMED_REQUEST",
            FetchError::SubrequestMalformedResponse { .. } => "SUBREQUEST_MALFORMED_RESPONSE",
            FetchError::SubrequestHttpError { .. } => "SUBREQUEST_HTTP_ERROR",
            FetchError::SubrequestGraphQLError { .. } => "SUBREQUEST_GRAPHQL_ERROR",
            FetchError::RemoteError { .. } => "REMOTE_ERROR",
        }
    }
}

/// Configuration errors.
///
/// Field specs are validated when the configuration is loaded; backreferences can only be
/// checked against the responses of the run and fail while the payload is built.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// invalid field spec '{spec}': {reason}
    InvalidFieldSpec { spec: String, reason: String },

    /// invalid graphql spec: {reason}
    InvalidGraphQLSpec { reason: String },

    /// backreference to response {index} but only {available} responses are available
    MissingResponse { index: usize, available: usize },

    /// response {index} has no `data.response` member to reference
    ResponseWithoutData { index: usize },

    /// could not read configuration: {0}
    CannotReadConfig(String),

    /// could not parse configuration: {0}
    InvalidConfiguration(String),
}

/// Error raised by the public request operations.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
pub enum RemoteError {
    /// {0}
    Fetch(#[from] FetchError),

    /// {0}
    Configuration(#[from] ConfigurationError),
}

impl RemoteError {
    /// Error code, suitable for logging and machine consumption.
    pub fn extension_code(&self) -> &'static str {
        match self {
            RemoteError::Fetch(error) => error.extension_code(),
            RemoteError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}
