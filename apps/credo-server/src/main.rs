mod auth;
mod authz;
mod config;
mod email;
mod error;
mod handlers;
mod password;
mod retry;
mod server;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use credo_store_sqlite::SqliteStore;

use auth::{HmacAuthenticator, TokenClaims};
use config::ServerConfig;
use email::RandomTokenGenerator;
use server::{CredoServer, Mailer};

#[derive(Parser)]
#[command(name = "credo-server")]
#[command(about = "Credo account service CLI for administration and serving")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db); defaults to ~/.credo/store.db
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Server address
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
    /// Bearer-token utilities for operators
    Token {
        #[command(subcommand)]
        token_cmd: TokenCommand,
    },
}

#[derive(Subcommand)]
enum TokenCommand {
    /// Mint a client-credential token
    Client {
        /// Expiry in seconds from now (omit for no expiry)
        #[arg(long)]
        expires_in: Option<i64>,
    },
    /// Mint a user token for an account
    User {
        /// Account id (uuid)
        #[arg(long)]
        account_id: String,

        /// Granted scopes, e.g. --scope manage-account --scope read-general
        #[arg(long = "scope")]
        scopes: Vec<String>,

        /// Expiry in seconds from now (omit for no expiry)
        #[arg(long)]
        expires_in: Option<i64>,
    },
}

async fn open_store(database_url: Option<&str>) -> Result<SqliteStore, credo_storage::StoreError> {
    match database_url {
        Some(url) => SqliteStore::open(url).await,
        None => SqliteStore::open_default().await,
    }
}

fn expiry(expires_in: Option<i64>) -> Option<i64> {
    expires_in.map(|secs| chrono::Utc::now().timestamp() + secs)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::from_env()?;

    match cli.command {
        Command::Serve { addr } => {
            let secret = config
                .auth_secret
                .clone()
                .ok_or("CREDO_AUTH_SECRET is required to serve")?;

            let store = open_store(cli.database_url.as_deref()).await?;

            let mailer = match &config.email {
                Some(email_config) => {
                    let provider = email::create_provider(email_config)?;
                    Some(Arc::new(Mailer {
                        provider: Arc::from(provider),
                        from_address: email_config.from_address.clone(),
                        from_name: email_config.from_name.clone(),
                    }))
                }
                None => {
                    tracing::warn!("no email provider configured; resend will fail");
                    None
                }
            };

            let server = CredoServer::new(
                Arc::new(store),
                Arc::new(HmacAuthenticator::new(secret)),
                mailer,
                Arc::new(RandomTokenGenerator),
                Arc::new(config),
            );

            let app = handlers::router(server);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("credo-server listening on {addr}");
            axum::serve(listener, app).await?;
        }
        Command::Token { token_cmd } => {
            let secret = config
                .auth_secret
                .ok_or("CREDO_AUTH_SECRET is required to mint tokens")?;
            let authenticator = HmacAuthenticator::new(secret);

            let claims = match token_cmd {
                TokenCommand::Client { expires_in } => TokenClaims {
                    token_use: "client".to_string(),
                    sub: None,
                    scopes: vec![],
                    exp: expiry(expires_in),
                },
                TokenCommand::User {
                    account_id,
                    scopes,
                    expires_in,
                } => {
                    // Fail early on a malformed id rather than minting a
                    // token no request will accept.
                    uuid::Uuid::try_parse(&account_id)
                        .map_err(|_| format!("invalid account id: {account_id}"))?;
                    TokenClaims {
                        token_use: "user".to_string(),
                        sub: Some(account_id),
                        scopes,
                        exp: expiry(expires_in),
                    }
                }
            };

            println!("{}", authenticator.issue(&claims)?);
        }
    }

    Ok(())
}
