//! Logic for loading configuration in to an object model
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigurationError;
use crate::field_spec::FieldSpec;
use crate::template::UriTemplate;

/// Content type used by REST targets that do not configure one.
pub const DEFAULT_CONTENT_TYPE: &str = "multipart/form-data";

/// Headers sent along with a remote request.
///
/// Sorted by name, names differing only by case are all sent, in that order.
pub type Headers = BTreeMap<String, String>;

/// The configuration of an orchestration run.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Remote targets, processed in order.
    #[serde(default)]
    pub remote: Vec<RemoteTarget>,

    /// Values substituted in the `${path}` placeholders of target URIs.
    #[serde(default)]
    pub placeholders: Value,
}

/// One configured REST or GraphQL endpoint plus its field mapping rules.
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RemoteTarget {
    /// The endpoint, may contain `${path}` placeholders.
    pub uri: String,

    #[serde(default)]
    pub meta: RemoteMeta,
}

/// How to talk to a remote target.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RemoteMeta {
    /// Headers sent with each request.
    #[serde(default)]
    pub headers: Headers,

    /// Content type of REST requests, `multipart/form-data` by default.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Which fields are sent and how, every form field is sent when absent.
    #[serde(default)]
    pub update_fields: Option<Vec<FieldSpec>>,

    /// GraphQL operation to call. REST targets have none.
    #[serde(default)]
    pub graphql: Option<GraphQLTarget>,
}

/// The GraphQL operation of a target.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum GraphQLTarget {
    Operation(GraphQLOperation),
    /// Name of a mutation answering `{response message}`.
    Legacy(String),
}

/// A GraphQL field called with the payload as arguments and aliased to `response`.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GraphQLOperation {
    /// Name of the field to call.
    pub method: String,

    #[serde(rename = "type", default)]
    pub kind: OperationKind,

    /// Fields selected on the response, the id field when absent.
    #[serde(default)]
    pub response_fields: Option<Vec<String>>,

    #[serde(default)]
    pub id_field: IdField,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    #[default]
    Mutation,
    /// A mutation linking records created by earlier targets.
    Relation,
}

/// Identifier field of the remote schema.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, JsonSchema)]
pub enum IdField {
    #[default]
    #[serde(rename = "_id")]
    Id,
    /// Newer schemas.
    #[serde(rename = "_uid")]
    Uid,
}

impl IdField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdField::Id => "_id",
            IdField::Uid => "_uid",
        }
    }
}

impl RemoteMeta {
    /// Whether the target is a GraphQL relation mutation.
    pub fn is_relation(&self) -> bool {
        matches!(
            self.graphql,
            Some(GraphQLTarget::Operation(GraphQLOperation {
                kind: OperationKind::Relation,
                ..
            }))
        )
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match &self.graphql {
            Some(GraphQLTarget::Operation(operation)) if operation.method.trim().is_empty() => {
                Err(ConfigurationError::InvalidGraphQLSpec {
                    reason: "`method` cannot be empty".to_string(),
                })
            }
            Some(GraphQLTarget::Legacy(name)) if name.trim().is_empty() => {
                Err(ConfigurationError::InvalidGraphQLSpec {
                    reason: "the mutation name cannot be empty".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl RemoteTarget {
    /// The target URI with its placeholders substituted.
    pub fn expand_uri(&self, placeholders: &Value) -> String {
        UriTemplate::parse(&self.uri).interpolate(placeholders)
    }
}

impl Configuration {
    /// Read a YAML (or JSON) configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            ConfigurationError::CannotReadConfig(format!("{}: {err}", path.display()))
        })?;
        content.parse()
    }

    fn validate(self) -> Result<Self, ConfigurationError> {
        for target in &self.remote {
            target.meta.validate()?;
        }
        if !(self.placeholders.is_null() || self.placeholders.is_object()) {
            return Err(ConfigurationError::InvalidConfiguration(
                "`placeholders` must be an object".to_string(),
            ));
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str::<Configuration>(s)
            .map_err(|err| ConfigurationError::InvalidConfiguration(err.to_string()))?
            .validate()
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    let gen = settings.into_generator();
    gen.into_root_schema_for::<Configuration>()
}
