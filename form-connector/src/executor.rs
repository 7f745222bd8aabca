//! Sends one built payload to one remote target.

use std::sync::Arc;

use serde_json::Value;

use crate::configuration::Headers;
use crate::configuration::RemoteMeta;
use crate::error::ConfigurationError;
use crate::error::RemoteError;
use crate::graphql;
use crate::json_ext::nulls_to_empty_strings;
use crate::json_ext::prune_empty_keys;
use crate::json_ext::Object;
use crate::transport::encode_object_as_form_fields;
use crate::transport::Body;
use crate::transport::GraphQLTransport;
use crate::transport::HttpTransport;
use crate::transport::ReqwestTransport;

/// Entry point for every remote operation.
///
/// Cloning is cheap, the transports are shared.
#[derive(Clone, Debug)]
pub struct RemoteClient {
    pub(crate) http: Arc<dyn HttpTransport>,
    pub(crate) graphql: Arc<dyn GraphQLTransport>,
}

impl Default for RemoteClient {
    fn default() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }
}

impl RemoteClient {
    pub fn new(http: Arc<dyn HttpTransport>, graphql: Arc<dyn GraphQLTransport>) -> Self {
        Self { http, graphql }
    }

    /// Use the same transport for REST and GraphQL targets.
    pub fn with_transport<T>(transport: T) -> Self
    where
        T: HttpTransport + GraphQLTransport + 'static,
    {
        let transport = Arc::new(transport);
        Self {
            http: transport.clone(),
            graphql: transport,
        }
    }

    /// Send a payload to a GraphQL target as an inline argument list.
    ///
    /// Returns the GraphQL response as JSON, `{"data": {"response": ...}}` for operation targets.
    pub async fn process_remote_update_graphql(
        &self,
        uri: &str,
        payload: &Object,
        meta: &RemoteMeta,
    ) -> Result<Value, RemoteError> {
        let target = meta
            .graphql
            .as_ref()
            .ok_or_else(|| ConfigurationError::InvalidGraphQLSpec {
                reason: "target has no graphql section".to_string(),
            })?;

        let arguments = match nulls_to_empty_strings(&Value::Object(payload.clone())) {
            Value::Object(payload) => graphql::to_arguments(&prune_empty_keys(&payload)),
            _ => String::new(),
        };
        let document = graphql::mutation_document(target, &arguments);
        tracing::debug!(uri, %document, "sending graphql update");

        let response = self
            .graphql
            .execute(uri, &meta.headers, graphql::Request::new(document))
            .await?;
        Ok(response.into())
    }

    /// POST a payload to a REST target.
    ///
    /// `application/json` sends a JSON body with `null` values replaced by empty strings, any
    /// other content type sends `multipart/form-data`.
    pub async fn process_remote_update_rest(
        &self,
        uri: &str,
        payload: &Object,
        content_type: &str,
        headers: &Headers,
    ) -> Result<Value, RemoteError> {
        let body = if is_json(content_type) {
            Body::Json(nulls_to_empty_strings(&Value::Object(payload.clone())))
        } else {
            Body::Multipart(encode_object_as_form_fields(payload))
        };
        tracing::debug!(uri, content_type, ?body, "sending rest update");

        // the multipart boundary is set by the transport
        let mut headers = headers.clone();
        headers.retain(|name, _| !name.eq_ignore_ascii_case(http::header::CONTENT_TYPE.as_str()));

        Ok(self.http.post(uri, &headers, body).await?)
    }
}

fn is_json(content_type: &str) -> bool {
    match content_type.parse::<mime::Mime>() {
        Ok(mime) => mime.essence_str() == mime::APPLICATION_JSON.essence_str(),
        Err(err) => {
            tracing::warn!(content_type, %err, "unparseable content type, sending multipart");
            false
        }
    }
}
