use ::reqwest::header::HeaderMap;
use ::reqwest::header::HeaderName;
use ::reqwest::header::HeaderValue;
use ::reqwest::multipart::Form;
use ::reqwest::Client;
use ::reqwest::RequestBuilder;
use ::reqwest::Response;
use serde_json::Value;

use super::Body;
use super::GraphQLTransport;
use super::HttpTransport;
use crate::configuration::Headers;
use crate::error::FetchError;
use crate::graphql;

/// HTTP and GraphQL transport backed by a [`reqwest::Client`](::reqwest::Client).
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with a custom reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn with_headers(
        request: RequestBuilder,
        headers: &Headers,
    ) -> Result<RequestBuilder, FetchError> {
        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                FetchError::MalformedRequest {
                    reason: format!("invalid header name '{name}': {err}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| FetchError::MalformedRequest {
                reason: format!("invalid value for header '{name}': {err}"),
            })?;
            header_map.append(name, value);
        }
        Ok(request.headers(header_map))
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, FetchError> {
        let request = request.build().map_err(|err| FetchError::MalformedRequest {
            reason: err.to_string(),
        })?;
        tracing::trace!(method = %request.method(), url, "sending request");
        self.client
            .execute(request)
            .await
            .map_err(|err| FetchError::SubrequestHttpError {
                status_code: err.status().map(|status| status.as_u16()),
                service: url.to_string(),
                reason: err.to_string(),
            })
    }

    async fn fetch(&self, url: &str, request: RequestBuilder) -> Result<Value, FetchError> {
        let response = self.send(url, request).await?;
        let payload = read_payload(url, response).await?;
        check_error_payload(url, &payload)?;
        Ok(payload)
    }
}

/// Read a response body, turning non-2xx statuses into errors.
///
/// JSON bodies are parsed, other bodies are returned as a string and empty bodies as `null`.
async fn read_payload(url: &str, response: Response) -> Result<Value, FetchError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| FetchError::SubrequestHttpError {
            status_code: Some(status.as_u16()),
            service: url.to_string(),
            reason: format!("could not read the response body: {err}"),
        })?;
    tracing::trace!(
        url,
        status = status.as_u16(),
        body = %String::from_utf8_lossy(&bytes),
        "received response"
    );

    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    if !status.is_success() {
        let reason = error_message(&payload).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });
        return Err(FetchError::SubrequestHttpError {
            status_code: Some(status.as_u16()),
            service: url.to_string(),
            reason,
        });
    }
    Ok(payload)
}

/// A successful response can still carry an error: `{"error": ...}` or `{"errors": [...]}`.
fn check_error_payload(url: &str, payload: &Value) -> Result<(), FetchError> {
    let has_error = payload
        .get("error")
        .map(|error| !error.is_null() && error != &Value::Bool(false))
        .unwrap_or_default()
        || payload
            .get("errors")
            .and_then(Value::as_array)
            .map(|errors| !errors.is_empty())
            .unwrap_or_default();
    if has_error {
        return Err(FetchError::RemoteError {
            service: url.to_string(),
            reason: error_message(payload).unwrap_or_else(|| payload.to_string()),
        });
    }
    Ok(())
}

fn error_message(payload: &Value) -> Option<String> {
    let describe = |value: &Value| match value {
        Value::String(message) => Some(message.clone()),
        Value::Object(object) => object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    match payload {
        Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
        Value::Object(object) => object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| object.get("error").and_then(describe))
            .or_else(|| {
                object
                    .get("errors")
                    .and_then(Value::as_array)
                    .and_then(|errors| errors.first())
                    .and_then(describe)
            }),
        _ => None,
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Value, FetchError> {
        let request = Self::with_headers(self.client.get(url), headers)?;
        self.fetch(url, request).await
    }

    async fn post(&self, url: &str, headers: &Headers, body: Body) -> Result<Value, FetchError> {
        let request = Self::with_headers(self.client.post(url), headers)?;
        let request = match body {
            Body::Json(json) => request.json(&json),
            Body::Multipart(fields) => request.multipart(
                fields
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name, value)),
            ),
        };
        self.fetch(url, request).await
    }
}

#[async_trait::async_trait]
impl GraphQLTransport for ReqwestTransport {
    async fn execute(
        &self,
        url: &str,
        headers: &Headers,
        request: graphql::Request,
    ) -> Result<graphql::Response, FetchError> {
        let request = Self::with_headers(self.client.post(url), headers)?.json(&request);
        let response = self.send(url, request).await?;
        let payload = read_payload(url, response).await?;
        let response: graphql::Response = serde_json::from_value(payload).map_err(|err| {
            FetchError::SubrequestMalformedResponse {
                service: url.to_string(),
                reason: err.to_string(),
            }
        })?;
        if let Some(error) = response.errors.first() {
            return Err(FetchError::SubrequestGraphQLError {
                service: url.to_string(),
                message: error.message.clone(),
            });
        }
        Ok(response)
    }
}
