use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use switchyard::routing::{Method, RouteManifest};
use switchyard_client::{CallInput, Client, ClientOptions};

#[derive(Parser)]
#[command(name = "switchyard-call")]
#[command(about = "Perform one call against a switchyard route tree", long_about = None)]
struct Cli {
    /// Verb: get, post, put, patch, delete, options or head
    method: Method,

    /// Route template, e.g. /api/v1/chat/:chatId
    path: String,

    /// Route manifest JSON, as printed by `switchyard --print-routes`
    #[arg(short, long)]
    manifest: PathBuf,

    /// Client options TOML (base_url, timeout_ms, credentials)
    #[arg(short, long)]
    options: Option<PathBuf>,

    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Path parameter, name=value
    #[arg(long = "path", value_parser = parse_pair)]
    params: Vec<(String, String)>,

    /// Query pair, name=value
    #[arg(long, value_parser = parse_pair)]
    query: Vec<(String, String)>,

    /// Request header, name=value
    #[arg(long, value_parser = parse_pair)]
    header: Vec<(String, String)>,

    /// Request cookie, name=value
    #[arg(long, value_parser = parse_pair)]
    cookie: Vec<(String, String)>,

    /// JSON body
    #[arg(long)]
    body: Option<String>,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let manifest: RouteManifest = serde_json::from_str(&std::fs::read_to_string(&cli.manifest)?)?;
    let options = match &cli.options {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => ClientOptions::new(cli.url.clone()),
    };
    let client = Client::builder(options, manifest).build()?;

    let mut input = CallInput::new();
    for (name, value) in cli.params {
        input = input.path(name, value);
    }
    for (name, value) in cli.query {
        input = input.query(name, value);
    }
    for (name, value) in cli.header {
        input = input.header(name, value);
    }
    for (name, value) in cli.cookie {
        input = input.cookie(name, value);
    }
    if let Some(body) = &cli.body {
        let body: serde_json::Value = serde_json::from_str(body)?;
        input = input.body(switchyard::Value::from_json(body));
    }

    let response = client.at(&cli.path).call(cli.method, input).await?;
    let status = response.status();
    let output = json!({
        "status": status.as_str(),
        "code": status.code(),
        "body": response.envelope().to_body().to_json(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !response.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}
