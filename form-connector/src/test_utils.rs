//! In-memory transport recording every call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::configuration::Headers;
use crate::error::FetchError;
use crate::graphql;
use crate::transport::Body;
use crate::transport::GraphQLTransport;
use crate::transport::HttpTransport;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Recorded {
    Get {
        url: String,
        headers: Headers,
    },
    Post {
        url: String,
        headers: Headers,
        body: Body,
    },
    GraphQL {
        url: String,
        headers: Headers,
        query: String,
    },
}

impl Recorded {
    pub(crate) fn url(&self) -> &str {
        match self {
            Recorded::Get { url, .. }
            | Recorded::Post { url, .. }
            | Recorded::GraphQL { url, .. } => url,
        }
    }

    pub(crate) fn graphql_query(&self) -> Option<&str> {
        match self {
            Recorded::GraphQL { query, .. } => Some(query),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Reply {
    delay: Option<Duration>,
    result: Result<Value, FetchError>,
}

#[derive(Debug, Default)]
struct State {
    replies: VecDeque<Reply>,
    recorded: Vec<Recorded>,
    events: Vec<String>,
}

/// Answers calls with queued replies, in order, whatever the transport used.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(self, delay: Option<Duration>, result: Result<Value, FetchError>) -> Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .push_back(Reply { delay, result });
        self
    }

    pub(crate) fn with_http_response(self, body: Value) -> Self {
        self.push(None, Ok(body))
    }

    pub(crate) fn with_graphql_response(self, response: Value) -> Self {
        self.push(None, Ok(response))
    }

    pub(crate) fn with_delayed_response(self, delay: Duration, response: Value) -> Self {
        self.push(Some(delay), Ok(response))
    }

    pub(crate) fn with_error(self, error: FetchError) -> Self {
        self.push(None, Err(error))
    }

    pub(crate) fn recorded(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().recorded.clone()
    }

    /// `start <url>` and `end <url>` for every call, in the order they happened.
    pub(crate) fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    async fn reply(&self, call: Recorded) -> Result<Value, FetchError> {
        let url = call.url().to_string();
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.events.push(format!("start {url}"));
            state.recorded.push(call);
            state.replies.pop_front()
        };
        let Reply { delay, result } = reply.unwrap_or_else(|| Reply {
            delay: None,
            result: Err(FetchError::MalformedRequest {
                reason: format!("no reply queued for {url}"),
            }),
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state
            .lock()
            .unwrap()
            .events
            .push(format!("end {url}"));
        result
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Value, FetchError> {
        self.reply(Recorded::Get {
            url: url.to_string(),
            headers: headers.clone(),
        })
        .await
    }

    async fn post(&self, url: &str, headers: &Headers, body: Body) -> Result<Value, FetchError> {
        self.reply(Recorded::Post {
            url: url.to_string(),
            headers: headers.clone(),
            body,
        })
        .await
    }
}

#[async_trait::async_trait]
impl GraphQLTransport for MockTransport {
    async fn execute(
        &self,
        url: &str,
        headers: &Headers,
        request: graphql::Request,
    ) -> Result<graphql::Response, FetchError> {
        let payload = self
            .reply(Recorded::GraphQL {
                url: url.to_string(),
                headers: headers.clone(),
                query: request.query,
            })
            .await?;
        Ok(serde_json::from_value(payload).unwrap())
    }
}
