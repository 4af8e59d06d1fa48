//! Multi-RP operator CLI
//!
//! Resolves, inspects and removes the OpenID Connect client registrations a
//! multi-provider relying party keeps, one per issuer. Resolving an issuer with
//! no stored registration performs discovery and dynamic client registration
//! against that issuer and stores the result.
//!
//! ## Usage Examples
//!
//! ```bash
//! # Register with (or load the stored client for) an issuer
//! multi-rp --redirect-uri https://rp.example/rp resolve https://issuer.example
//!
//! # Print an authorization URL for the implicit workflow
//! multi-rp auth-url https://issuer.example --workflow implicit
//!
//! # Show or forget a stored registration
//! multi-rp show https://issuer.example
//! multi-rp delete https://issuer.example
//!
//! # Preview the registration request without contacting the issuer
//! multi-rp --format json-pretty registration-config https://issuer.example
//! ```
//!
//! ## Environment Variables
//!
//! - `STORAGE_BACKEND`: `memory`, `file`, `sqlite` or `postgres` (default `file`)
//! - `STORAGE_PATH`: base directory of the file backend (default `./data`)
//! - `DATABASE_URL`: connection string for the SQL backends
//! - `CLIENT_COLLECTION`: collection holding registrations (default `clients`)
//! - `LOCAL_ISSUER`: this service's own issuer
//! - `REDIRECT_URI`: base of the per-issuer redirect URIs
//! - `POST_LOGOUT_REDIRECT_URIS`: `;`-separated post-logout redirect URIs
//! - `SERVICE_NAME`: used in generated client names (default `multi-rp`)
//! - `DEFAULT_MAX_AGE`: registered `default_max_age` (default `1d`)
//! - `HTTP_CLIENT_TIMEOUT`, `USER_AGENT`, `CERTIFICATE_BUNDLES`: HTTP client settings
//! - `REGISTRATION_ACCESS_TOKEN`: initial access token for protected registration endpoints
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error (configuration, storage, output)
//! - 2: Registration or persistence error
//! - 3: No stored client for the issuer

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use multi_rp::client_store::encode_key;
use multi_rp::config::{Config, RedirectUri};
use multi_rp::errors::MultiRpError;
use multi_rp::oidc::{HttpClientRegistrar, RegistrationOverrides, Workflow};
use multi_rp::storage::{create_storage_backend, parse_storage_backend};
use multi_rp::{ClientStore, MultiRpClient};

#[derive(Parser)]
#[command(
    name = "multi-rp",
    about = "Multi-provider OpenID Connect relying party client registry",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Storage backend, overrides STORAGE_BACKEND
    #[arg(long)]
    storage: Option<String>,

    /// Base directory for the file backend, overrides STORAGE_PATH
    #[arg(long)]
    storage_path: Option<String>,

    /// Base redirect URI, overrides REDIRECT_URI
    #[arg(long)]
    redirect_uri: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// JSON formatted output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Return the stored client for an issuer, registering one if needed
    Resolve { issuer: String },
    /// Print an authorization URL for an issuer
    AuthUrl {
        issuer: String,
        /// `code` or `implicit`
        #[arg(long, default_value = "code")]
        workflow: String,
    },
    /// Show the stored client for an issuer
    Show { issuer: String },
    /// Delete the stored client for an issuer
    Delete { issuer: String },
    /// Print the registration request that would be sent to an issuer
    RegistrationConfig { issuer: String },
}

#[derive(Debug, thiserror::Error)]
#[error("error-multirp-cli-1 No stored client for issuer {0}")]
struct ClientNotFound(String);

#[derive(Serialize)]
struct DeleteResult {
    issuer: String,
    key: String,
    deleted: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "multi_rp=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        process::exit(exit_code(&err));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ClientNotFound>().is_some() {
        return 3;
    }
    match err.downcast_ref::<MultiRpError>() {
        Some(MultiRpError::Registration(_)) | Some(MultiRpError::Persistence(_)) => 2,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::new()?;
    tracing::debug!(version = %config.version, "starting multi-rp");

    let mut local_config = config.local_config();
    if let Some(redirect_uri) = cli.redirect_uri.clone() {
        let redirect_uri: RedirectUri = redirect_uri.try_into()?;
        local_config.redirect_uri = redirect_uri.as_ref().clone();
    }

    let backend_name = cli.storage.as_deref().unwrap_or(&config.storage_backend);
    let storage_path = cli.storage_path.as_deref().unwrap_or(&config.storage_path);
    let backend = parse_storage_backend(
        backend_name,
        Some(storage_path),
        config.database_url.as_deref(),
    )?;
    tracing::debug!(?backend, "using storage backend");
    let store = ClientStore::new(create_storage_backend(backend).await?)
        .with_collection_name(config.client_collection.clone());

    // Build HTTP client with certificate bundles
    let mut client_builder = reqwest::Client::builder();
    for ca_certificate in config.certificate_bundles.as_ref() {
        tracing::info!("Loading CA certificate: {:?}", ca_certificate);
        let cert = std::fs::read(ca_certificate)?;
        let cert = reqwest::Certificate::from_pem(&cert)?;
        client_builder = client_builder.add_root_certificate(cert);
    }
    let http_client = client_builder
        .user_agent(config.user_agent.clone())
        .timeout(*config.http_client_timeout.as_ref())
        .build()?;

    let mut registrar = HttpClientRegistrar::new(http_client);
    if let Some(token) = &config.registration_access_token {
        registrar = registrar.with_initial_access_token(token.clone());
    }

    let client = MultiRpClient::new(store, Arc::new(registrar), local_config);

    match &cli.command {
        Commands::Resolve { issuer } => {
            let registered = client.client_for_issuer(issuer).await?;
            output(&cli.format, &registered)
        }
        Commands::AuthUrl { issuer, workflow } => {
            let workflow = Workflow::from_str(workflow)?;
            let auth_url = client.auth_url_for_issuer(issuer, workflow).await?;
            output(&cli.format, &auth_url)
        }
        Commands::Show { issuer } => {
            let registered = client
                .load_client(issuer)
                .await?
                .ok_or_else(|| ClientNotFound(issuer.clone()))?;
            output(&cli.format, &registered)
        }
        Commands::Delete { issuer } => {
            // Records that no longer parse are removed too
            let deleted = client.store().contains(issuer).await?;
            if deleted {
                client.store().del_issuer(issuer).await?;
                tracing::info!(%issuer, "stored client deleted");
            }
            output(
                &cli.format,
                &DeleteResult {
                    issuer: issuer.clone(),
                    key: encode_key(issuer),
                    deleted,
                },
            )
        }
        Commands::RegistrationConfig { issuer } => {
            let registration_config =
                client.registration_config_for(issuer, RegistrationOverrides::default())?;
            output(&cli.format, &registration_config)
        }
    }
}

fn output<T: Serialize>(format: &OutputFormat, data: &T) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(data)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data)?),
    }
    Ok(())
}
