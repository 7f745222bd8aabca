//! Read queries used to fill form selection lists.

use serde_json::Value;

use crate::configuration::Headers;
use crate::error::RemoteError;
use crate::executor::RemoteClient;
use crate::graphql;
use crate::template::UriTemplate;

/// Body of a read query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectBody {
    /// A selection set, sent wrapped as `query { <selection> }`.
    Selection(String),
    /// A complete GraphQL document, sent as is.
    Document(String),
}

impl SelectBody {
    fn into_document(self) -> String {
        match self {
            SelectBody::Selection(selection) => graphql::selection_document(&selection),
            SelectBody::Document(document) => document,
        }
    }
}

impl RemoteClient {
    /// Run a read query against the expanded `uri_template`.
    ///
    /// Without a body this is a plain GET returning the parsed payload. With a body the query
    /// goes through the GraphQL transport and the whole response (`{"data": ...}`) is returned.
    pub async fn process_remote_requests(
        &self,
        uri_template: &str,
        placeholders: &Value,
        headers: &Headers,
        body: Option<SelectBody>,
    ) -> Result<Value, RemoteError> {
        let uri = UriTemplate::parse(uri_template).interpolate(placeholders);
        match body {
            None => {
                tracing::debug!(%uri, "fetching selection");
                Ok(self.http.get(&uri, headers).await?)
            }
            Some(body) => {
                let document = body.into_document();
                tracing::debug!(%uri, %document, "querying selection");
                let response = self
                    .graphql
                    .execute(&uri, headers, graphql::Request::new(document))
                    .await?;
                Ok(response.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FetchError;
    use crate::test_utils::MockTransport;
    use crate::test_utils::Recorded;

    #[tokio::test]
    async fn get_with_expanded_uri() {
        let transport = MockTransport::new().with_http_response(json!([{ "code": "FR" }]));
        let client = RemoteClient::with_transport(transport.clone());
        let headers: Headers = [("accept".to_string(), "application/json".to_string())]
            .into_iter()
            .collect();

        let response = client
            .process_remote_requests(
                "http://api/countries?region=${form.region}&lang=${lang}",
                &json!({ "form": { "region": "europe" } }),
                &headers,
                None,
            )
            .await
            .unwrap();
        assert_eq!(response, json!([{ "code": "FR" }]));
        assert_eq!(
            transport.recorded(),
            vec![Recorded::Get {
                url: "http://api/countries?region=europe&lang=".into(),
                headers,
            }]
        );
    }

    #[tokio::test]
    async fn selection_is_wrapped_in_a_query() {
        let transport = MockTransport::new()
            .with_graphql_response(json!({ "data": { "countries": [{ "code": "FR" }] } }));
        let client = RemoteClient::with_transport(transport.clone());

        let response = client
            .process_remote_requests(
                "http://api/${env}/graphql",
                &json!({ "env": "prod" }),
                &Headers::new(),
                Some(SelectBody::Selection("countries { code }".into())),
            )
            .await
            .unwrap();
        assert_eq!(response, json!({ "data": { "countries": [{ "code": "FR" }] } }));

        let recorded = transport.recorded();
        assert_eq!(recorded[0].url(), "http://api/prod/graphql");
        assert_eq!(
            recorded[0].graphql_query(),
            Some("query { countries { code } }")
        );
    }

    #[tokio::test]
    async fn documents_are_sent_as_is() {
        let transport = MockTransport::new().with_graphql_response(json!({ "data": {} }));
        let client = RemoteClient::with_transport(transport.clone());
        let document = "query Countries { countries { code } }";
        client
            .process_remote_requests(
                "http://api/graphql",
                &Value::Null,
                &Headers::new(),
                Some(SelectBody::Document(document.into())),
            )
            .await
            .unwrap();
        assert_eq!(transport.recorded()[0].graphql_query(), Some(document));
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let error = FetchError::SubrequestHttpError {
            status_code: Some(404),
            service: "http://api/missing".into(),
            reason: "Not Found".into(),
        };
        let client = RemoteClient::with_transport(MockTransport::new().with_error(error.clone()));
        assert_eq!(
            client
                .process_remote_requests("http://api/missing", &Value::Null, &Headers::new(), None)
                .await,
            Err(RemoteError::Fetch(error))
        );
    }
}
