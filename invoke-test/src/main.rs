use anyhow::{bail, Context};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::Client;
use clap::Parser;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(name = "invoke-test")]
#[command(about = "Invoke the user provisioning Lambda function once")]
struct Args {
    /// Lambda function name
    function: String,

    /// Database user to create; a random smoke_ name is used when omitted
    #[arg(long)]
    username: Option<String>,

    /// AWS region of the function; defaults to the SDK's region chain
    #[arg(long)]
    region: Option<String>,
}

#[derive(Deserialize)]
struct ProxyResponse {
    #[serde(rename = "statusCode")]
    status_code: i64,
    #[serde(default)]
    body: Option<String>,
}

fn random_username() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("smoke_{}", suffix.to_lowercase())
}

/// Wraps the request the way API Gateway's proxy integration delivers it.
fn proxy_event(username: &str) -> Value {
    json!({
        "resource": "/users",
        "path": "/users",
        "httpMethod": "POST",
        "headers": { "content-type": "application/json" },
        "body": json!({ "username": username }).to_string(),
        "isBase64Encoded": false
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let username = args.username.unwrap_or_else(random_username);

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = args.region {
        loader = loader.region(Region::new(region));
    }
    let config = loader.load().await;
    let client = Client::new(&config);

    println!("Provisioning {} via {}", username, args.function);

    let response = client
        .invoke()
        .function_name(&args.function)
        .payload(Blob::new(serde_json::to_vec(&proxy_event(&username))?))
        .send()
        .await
        .with_context(|| format!("invoking {}", args.function))?;

    let payload = response
        .payload()
        .map(|b| String::from_utf8_lossy(b.as_ref()).to_string())
        .unwrap_or_else(|| "No response".to_string());

    if let Some(function_error) = response.function_error() {
        bail!("function error ({}): {}", function_error, payload);
    }

    let proxy: ProxyResponse = serde_json::from_str(&payload)
        .with_context(|| format!("unexpected response payload: {}", payload))?;

    println!("Status: {}", proxy.status_code);
    println!("Body:   {}", proxy.body.as_deref().unwrap_or_default());

    check_created(&username, &proxy)
}

/// Anything other than 201 means the user was not created.
fn check_created(username: &str, proxy: &ProxyResponse) -> anyhow::Result<()> {
    if proxy.status_code != 201 {
        bail!("provisioning {} failed with status {}", username, proxy.status_code);
    }
    Ok(())
}
