//! Maps form submissions onto REST and GraphQL remote targets.
//!
//! A [`Configuration`] lists the remote targets of a form. [`RemoteClient`] sends the form
//! values to each of them in order, building every payload from the target's field specs and
//! the responses received so far. It also runs the read queries used to fill selection lists.

#![warn(unreachable_pub)]

mod configuration;
pub mod error;
mod executable;
mod executor;
mod field_spec;
pub mod graphql;
mod json_ext;
mod orchestrator;
mod payload;
mod select;
mod template;
#[cfg(test)]
mod test_utils;
pub mod transport;

pub use configuration::generate_config_schema;
pub use configuration::Configuration;
pub use configuration::GraphQLOperation;
pub use configuration::GraphQLTarget;
pub use configuration::Headers;
pub use configuration::IdField;
pub use configuration::OperationKind;
pub use configuration::RemoteMeta;
pub use configuration::RemoteTarget;
pub use configuration::DEFAULT_CONTENT_TYPE;
pub use executable::main;
pub use executor::RemoteClient;
pub use field_spec::Backreference;
pub use field_spec::FieldSpec;
pub use field_spec::SubKey;
pub use json_ext::Object;
pub use payload::build_payload;
pub use select::SelectBody;
pub use template::expand;
pub use template::UriTemplate;
