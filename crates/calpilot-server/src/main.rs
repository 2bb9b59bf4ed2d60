//! calpilot-server entry point.
//!
//! One invocation handles one request: the process reads a JSON request
//! from `--request` or stdin, dispatches it, prints the response envelope
//! to stdout and exits. The envelope itself carries operation failures;
//! only startup problems exit non-zero.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use calpilot_core::tracing::{TracingConfig, init_tracing};
use calpilot_providers::{FileCredentialStore, OAuthClient, OAuthCredentials, TokenManager};
use calpilot_server::operations::{EventOperations, GoogleApiFactory};
use calpilot_server::{RequestHandler, ServerConfig, ServerError, ServerResult};

#[derive(Debug, Parser)]
#[command(name = "calpilot-server", about = "Calendar operations for the calpilot assistant")]
struct Cli {
    /// JSON request; read from stdin when omitted
    #[arg(long)]
    request: Option<String>,

    /// Path to the credential store file
    #[arg(long, env = "CALPILOT_CREDENTIALS_PATH")]
    credentials: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.json_logs {
        TracingConfig::service()
    } else if cli.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let mut config = ServerConfig::from_env()?;
    if let Some(credentials) = cli.credentials {
        config.credentials_path = credentials;
    }
    config.validate()?;

    let raw_request = match cli.request {
        Some(request) => request,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    if raw_request.trim().is_empty() {
        return Err(ServerError::config(
            "no request supplied (pass --request or pipe JSON to stdin)",
        ));
    }

    let handler = build_handler(&config)?;
    let envelope = handler.handle_json(&raw_request).await;

    let rendered = serde_json::to_string(&envelope)
        .map_err(|e| ServerError::config(format!("failed to render response: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

fn build_handler(config: &ServerConfig) -> ServerResult<RequestHandler> {
    let store = Arc::new(FileCredentialStore::open(&config.credentials_path)?);

    let credentials =
        OAuthCredentials::new(config.client_id.as_str(), config.client_secret.as_str());
    let mut oauth = OAuthClient::new(credentials, config.http_timeout);
    if let Some(ref token_url) = config.token_url {
        oauth = oauth.with_token_url(token_url.as_str());
    }

    let auth = TokenManager::new(store, Arc::new(oauth))
        .with_leeway(chrono::Duration::seconds(config.refresh_leeway_secs));

    let mut factory = GoogleApiFactory::new(config.http_timeout);
    if let Some(ref base_url) = config.api_base_url {
        factory = factory.with_base_url(base_url.as_str());
    }

    let ops = EventOperations::new(auth, Arc::new(factory))
        .with_lookahead_days(config.lookahead_days);
    Ok(RequestHandler::new(ops))
}
