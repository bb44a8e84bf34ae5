//! CLI handlers that talk to a running service over its HTTP API.

use anyhow::{bail, Context, Result};
use reqwest::Method;
use serde_json::Value;

use crate::cli::args::{CliCommand, ConfigCommand};
use crate::config::{Config, ConfigPatch};

pub async fn handle_sdk_command(command: CliCommand) -> Result<()> {
    let base_url = Config::load()?.server.base_url();
    let client = SdkClient::new(base_url);

    match command {
        CliCommand::Status => show_status(&client).await,
        CliCommand::Init => print_reply(client.call(Method::POST, "/sdk/init", None).await?),
        CliCommand::Shutdown => {
            print_reply(client.call(Method::POST, "/sdk/shutdown", None).await?)
        }
        CliCommand::Config(args) => match args.command {
            ConfigCommand::Show => show_config(&client).await,
            ConfigCommand::Set {
                enabled,
                endpoint,
                request_permissions,
            } => {
                let patch = ConfigPatch {
                    enabled,
                    endpoint,
                    request_permissions_on_startup: request_permissions,
                };
                if patch.is_empty() {
                    bail!("Nothing to update. Pass --enabled, --endpoint or --request-permissions");
                }
                let body = serde_json::to_value(&patch)?;
                print_reply(client.call(Method::PUT, "/sdk/config", Some(body)).await?)
            }
        },
        CliCommand::Serve | CliCommand::Version => {
            bail!("Command is handled by the service entry point")
        }
    }
}

struct SdkClient {
    http: reqwest::Client,
    base_url: String,
}

impl SdkClient {
    fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .context("Failed to connect to capture-hub service. Is it running?")?;

        response
            .json()
            .await
            .context("Service returned an unreadable response")
    }
}

/// Prints a `{ success, message }` reply, failing the command on
/// `success: false`.
fn print_reply(json: Value) -> Result<()> {
    let message = json
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error");

    if !json.get("success").and_then(|s| s.as_bool()).unwrap_or(false) {
        bail!("{}", message);
    }

    println!("{}", message);
    Ok(())
}

async fn show_status(client: &SdkClient) -> Result<()> {
    let json = client.call(Method::GET, "/sdk/status", None).await?;

    let state = json
        .get("state")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let ready = json
        .get("provider_ready")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let version = json.get("version").and_then(|v| v.as_str()).unwrap_or("?");

    println!("capture-hub {}", version);
    println!("SDK state: {}", state);
    println!("Provider ready: {}", if ready { "yes" } else { "no" });

    if let Some(hub) = json.get("hub") {
        println!(
            "Connected consumers: {}",
            hub.get("consumers").and_then(|v| v.as_u64()).unwrap_or(0)
        );
        if let Some(subscriptions) = hub.get("subscriptions").and_then(|v| v.as_array()) {
            for entry in subscriptions {
                println!(
                    "  {:<28} {} subscriber(s)",
                    entry.get("kind").and_then(|v| v.as_str()).unwrap_or("?"),
                    entry.get("consumers").and_then(|v| v.as_u64()).unwrap_or(0)
                );
            }
        }
    }

    Ok(())
}

async fn show_config(client: &SdkClient) -> Result<()> {
    let json = client.call(Method::GET, "/sdk/config", None).await?;
    let Some(config) = json.get("data") else {
        return print_reply(json);
    };

    println!(
        "enabled: {}",
        config.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false)
    );
    println!(
        "endpoint: {}",
        config.get("endpoint").and_then(|v| v.as_str()).unwrap_or("")
    );
    println!(
        "request_permissions_on_startup: {}",
        config
            .get("request_permissions_on_startup")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    );
    Ok(())
}
