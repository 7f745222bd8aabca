//! Main entry point for the CLI.

use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::configuration::generate_config_schema;
use crate::configuration::Configuration;
use crate::configuration::Headers;
use crate::executor::RemoteClient;
use crate::select::SelectBody;

/// Options for the connector
#[derive(Parser, Debug)]
#[command(name = "form-connector", about = "Send form submissions to remote endpoints")]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "FORM_CONNECTOR_LOG",
        global = true
    )]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send form values to every configured remote target, in order.
    Update {
        /// Configuration file listing the remote targets.
        #[arg(short, long = "config", env = "FORM_CONNECTOR_CONFIG_PATH")]
        config_path: PathBuf,

        /// Form values, as a JSON object.
        #[arg(long, value_parser = parse_json)]
        values: Value,

        /// Placeholder values, as a JSON object. Replaces the configured ones.
        #[arg(long, value_parser = parse_json)]
        placeholders: Option<Value>,
    },

    /// Run a read query, as used to fill selection lists.
    Select {
        /// Endpoint, may contain `${path}` placeholders.
        #[arg(long)]
        uri: String,

        /// Placeholder values, as a JSON object.
        #[arg(long, value_parser = parse_json)]
        placeholders: Option<Value>,

        /// Request header, as `name=value`.
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// GraphQL selection set, sent as `query { <selection> }`.
        #[arg(long, conflicts_with = "document")]
        query: Option<String>,

        /// Complete GraphQL document.
        #[arg(long)]
        document: Option<String>,
    },
}

fn parse_json(input: &str) -> Result<Value> {
    serde_json::from_str(input).context("invalid JSON")
}

fn parse_header(input: &str) -> Result<(String, String)> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("expected `name=value`, got '{input}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("header name cannot be empty"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// This is the main connector entrypoint.
pub fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(start(Opt::parse()))
}

async fn start(opt: Opt) -> Result<()> {
    if opt.schema {
        let schema = generate_config_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let builder = tracing_subscriber::fmt::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_new(&opt.log_level).context("could not parse log configuration")?,
        );
    match opt.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| anyhow!(err))
    .context("could not install the tracing subscriber")?;

    let client = RemoteClient::default();
    let output = match opt.command {
        Some(Command::Update {
            config_path,
            values,
            placeholders,
        }) => {
            let configuration = Configuration::from_file(&config_path)
                .with_context(|| format!("could not load {}", config_path.display()))?;
            let form_values = values
                .as_object()
                .ok_or_else(|| anyhow!("form values must be a JSON object"))?;
            let placeholders = placeholders.unwrap_or(configuration.placeholders);
            let responses = client
                .process_list_remote_update(&configuration.remote, form_values, &placeholders)
                .await
                .context("remote update failed")?;
            Value::Array(responses)
        }
        Some(Command::Select {
            uri,
            placeholders,
            headers,
            query,
            document,
        }) => {
            let headers: Headers = headers.into_iter().collect();
            let body = query
                .map(SelectBody::Selection)
                .or(document.map(SelectBody::Document));
            client
                .process_remote_requests(
                    &uri,
                    &placeholders.unwrap_or_default(),
                    &headers,
                    body,
                )
                .await
                .context("read query failed")?
        }
        None => {
            return Err(anyhow!(
                "nothing to do, use `update`, `select` or `--schema`"
            ))
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
