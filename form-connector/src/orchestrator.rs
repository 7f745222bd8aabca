//! Sequential processing of a list of remote targets.

use serde_json::Value;

use crate::configuration::RemoteTarget;
use crate::error::RemoteError;
use crate::executor::RemoteClient;
use crate::json_ext::Object;
use crate::payload::build_payload;

impl RemoteClient {
    /// Send the form values to every target, one after the other.
    ///
    /// A target is only started once the previous one answered, so its field specs can
    /// reference the responses received so far. The responses are returned in target order.
    /// The first error aborts the run and the responses already received are dropped.
    pub async fn process_list_remote_update(
        &self,
        remote: &[RemoteTarget],
        form_values: &Object,
        placeholders: &Value,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut responses = Vec::with_capacity(remote.len());
        for (index, target) in remote.iter().enumerate() {
            match self
                .process_target(target, form_values, placeholders, &responses)
                .await
            {
                Ok(response) => {
                    tracing::info!(index, uri = %target.uri, "remote target updated");
                    responses.push(response);
                }
                Err(error) => {
                    tracing::error!(
                        index,
                        uri = %target.uri,
                        completed = responses.len(),
                        code = error.extension_code(),
                        %error,
                        "remote update failed, aborting"
                    );
                    return Err(error);
                }
            }
        }
        Ok(responses)
    }

    async fn process_target(
        &self,
        target: &RemoteTarget,
        form_values: &Object,
        placeholders: &Value,
        responses: &[Value],
    ) -> Result<Value, RemoteError> {
        let uri = target.expand_uri(placeholders);
        let payload = build_payload(form_values, &target.meta, responses)?;
        tracing::debug!(%uri, payload = %serde_json::Value::Object(payload.clone()), "built payload");

        if target.meta.graphql.is_some() {
            self.process_remote_update_graphql(&uri, &payload, &target.meta)
                .await
        } else {
            self.process_remote_update_rest(
                &uri,
                &payload,
                target.meta.content_type(),
                &target.meta.headers,
            )
            .await
        }
    }
}
