use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auto_merge_bot::config::DEFAULT_CONFIG_PATH;
use auto_merge_bot::github::{GitHubAppAuth, load_private_key};
use auto_merge_bot::server::{AppState, build_router};
use auto_merge_bot::types::AppId;
use auto_merge_bot::worker::{
    PullRequestProcessor, RepositoryWorkers, TracingReporter, WorkerContextFactory,
};

/// Reports whether pull requests are ready to merge.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Config {
    /// GitHub App id.
    #[arg(long, env = "APP_ID")]
    app_id: u64,

    /// PEM file holding the GitHub App's private key.
    #[arg(long, env = "PRIVATE_KEY_PATH")]
    private_key_path: PathBuf,

    /// Secret used to sign webhook deliveries.
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: String,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// Name of the check run the bot maintains.
    #[arg(long, env = "CHECK_NAME", default_value = "auto-merge")]
    check_name: String,

    /// Repository path of the per-repository configuration file.
    #[arg(long, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auto_merge_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let app_id = AppId(config.app_id);

    let key = load_private_key(&config.private_key_path)?;
    let auth = Arc::new(GitHubAppAuth::new(app_id, key).context("building GitHub App client")?);

    let factory = WorkerContextFactory::new(
        Arc::clone(&auth),
        app_id,
        config.check_name,
        config.config_path,
    );
    let workers = RepositoryWorkers::new(PullRequestProcessor::new(factory), TracingReporter);
    let app = build_router(AppState::new(config.webhook_secret, app_id, auth, workers));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    tracing::info!(app_id = %app_id, "listening on {}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
