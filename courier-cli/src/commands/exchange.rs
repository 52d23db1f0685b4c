//! Exchange command - send one request through the pipeline.

use anyhow::{Context, Result};
use clap::Args;
use courier_core::{Method, RequestSpec, ResponseBody};
use courier_fetch::host::storage::keys;
use courier_store::{ClientConfig, open_client};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::output::{ErrorOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the exchange command.
#[derive(Args, Debug)]
pub struct ExchangeArgs {
    /// HTTP method (get, post, put, patch, delete, head, options).
    pub method: String,

    /// URL, absolute or relative to the base URL. `{name}` segments are
    /// filled from the payload.
    pub url: String,

    /// JSON payload: query parameters for reads, body for writes.
    #[arg(long, short)]
    pub data: Option<String>,

    /// Keep payload fields used by URL placeholders.
    #[arg(long)]
    pub keep_url_params: bool,

    /// Extra header as `name:value`. Repeatable.
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Currency for this session only.
    #[arg(long)]
    pub currency: Option<String>,
}

impl ExchangeArgs {
    /// Builds the request described by the arguments.
    pub fn to_spec(&self) -> Result<RequestSpec> {
        let method: Method = self.method.parse()?;
        let mut spec = RequestSpec::new(method, &self.url);

        if let Some(data) = &self.data {
            let payload: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
            spec = spec.with_payload(payload);
        }
        if self.keep_url_params {
            spec = spec.keep_url_params();
        }
        for header in &self.headers {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("Header must be name:value, got {header:?}"))?;
            spec = spec.with_header(name.trim(), value.trim());
        }

        Ok(spec)
    }
}

/// Runs the exchange command.
pub async fn run(args: &ExchangeArgs, cli: &Cli, config: &ClientConfig) -> Result<()> {
    let spec = args.to_spec()?;
    let opened = open_client(config).await?;

    if let Some(currency) = &args.currency {
        debug!(currency = %currency, "Session currency override");
        opened.session.set(keys::CURRENCY, currency.as_str());
    }

    info!(method = %spec.method, url = %spec.url, "Sending exchange");
    match opened.client.exchange(spec).await {
        Ok(body) => {
            match cli.format {
                OutputFormat::Text => {
                    println!("{}", TextFormatter::new(!cli.no_color).format_body(&body));
                }
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::new(cli.pretty).format(&body_json(&body))?);
                }
            }
            Ok(())
        }
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", JsonFormatter::new(cli.pretty).format(&ErrorOutput::from(&e))?);
            }
            Err(e.into())
        }
    }
}

/// JSON rendering of a body. Binary content is summarized, not dumped.
fn body_json(body: &ResponseBody) -> Value {
    match body {
        ResponseBody::Json(value) => value.clone(),
        ResponseBody::Binary(bytes) => json!({ "binary": true, "bytes": bytes.len() }),
        ResponseBody::Empty => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(method: &str, url: &str) -> ExchangeArgs {
        ExchangeArgs {
            method: method.to_string(),
            url: url.to_string(),
            data: None,
            keep_url_params: false,
            headers: Vec::new(),
            currency: None,
        }
    }

    #[test]
    fn test_to_spec() {
        let mut a = args("POST", "/users/{id}");
        a.data = Some(r#"{"id": 5}"#.to_string());
        a.headers = vec!["x-app: web".to_string()];
        a.keep_url_params = true;

        let spec = a.to_spec().unwrap();
        assert_eq!(spec.method, Method::Post);
        assert_eq!(spec.payload, Some(json!({ "id": 5 })));
        assert_eq!(spec.headers.get("x-app").map(String::as_str), Some("web"));
        assert!(!spec.remove_url_params);
    }

    #[test]
    fn test_to_spec_rejects_bad_input() {
        assert!(args("FETCH", "/a").to_spec().is_err());

        let mut bad_json = args("get", "/a");
        bad_json.data = Some("{".to_string());
        assert!(bad_json.to_spec().is_err());

        let mut bad_header = args("get", "/a");
        bad_header.headers = vec!["no-colon".to_string()];
        assert!(bad_header.to_spec().is_err());
    }

    #[test]
    fn test_body_json() {
        assert_eq!(
            body_json(&ResponseBody::Binary(vec![1, 2])),
            json!({ "binary": true, "bytes": 2 })
        );
        assert_eq!(body_json(&ResponseBody::Empty), Value::Null);
    }
}
