use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use auth_cell::{AuthService, SessionStore};
use shared_api_client::PortalClient;
use shared_config::AppConfig;
use shared_models::auth::{SessionProvider, StaticToken};

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env();
    if !config.is_configured() {
        bail!("Set PORTAL_TOKEN, or PORTAL_EMAIL and PORTAL_PASSWORD");
    }

    let client = Arc::new(PortalClient::new(&config)?);
    info!("Using portal API at {}", client.get_base_url());

    let session = authenticate(&config, &client).await?;

    commands::run(cli.command, client, session).await
}

/// A pre-issued token wins over credentials.
async fn authenticate(
    config: &AppConfig,
    client: &Arc<PortalClient>,
) -> anyhow::Result<Arc<dyn SessionProvider>> {
    if let Some(token) = &config.portal_token {
        info!("Using pre-issued token from PORTAL_TOKEN");
        let session: Arc<dyn SessionProvider> = Arc::new(StaticToken(token.clone()));
        return Ok(session);
    }

    let (Some(email), Some(password)) = (&config.portal_email, &config.portal_password) else {
        bail!("PORTAL_EMAIL and PORTAL_PASSWORD must both be set");
    };

    let auth = AuthService::new(Arc::clone(client), Arc::new(SessionStore::new()));
    let user = auth.login(email, password).await.context("Login failed")?;
    info!("Signed in as {} ({:?})", user.name, user.role);

    let session: Arc<dyn SessionProvider> = auth.session();
    Ok(session)
}
