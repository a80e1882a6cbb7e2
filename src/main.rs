use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use expo_relay::{
    config::{Args, Config},
    expo,
    relay::Relay,
    slack::SlackClient,
    webhook::{self, AppState},
};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::try_from(Args::parse())?;

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let http_client = reqwest::Client::new();
    let relay = Relay::new(
        Arc::new(expo::Client::new(
            http_client.clone(),
            &config.expo_api_url,
            &config.expo_token,
        )),
        Arc::new(SlackClient::new(
            http_client,
            &config.slack_token,
            &config.slack_channel,
        )),
        config.links.clone(),
        config.previews.clone(),
    );
    let state = Arc::new(AppState {
        webhook_secret: config.hmac_secret.clone(),
        relay,
    });

    let app = webhook::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Expo relay starting on {}", addr);
    if config.previews.allow {
        info!("Relaying updates on preview branches");
    }

    let stop = Arc::new(Notify::new());
    let mut server = tokio::spawn({
        let stop = stop.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.notified().await })
                .await
        }
    });

    tokio::select! {
        served = &mut server => {
            served?.context("http server failed")?;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    info!("Got an interrupt, shutting down server");
    stop.notify_one();
    match tokio::time::timeout(config.shutdown_grace, server).await {
        Ok(Ok(Ok(()))) => info!("Server drained"),
        Ok(Ok(Err(e))) => error!("Server failed while draining: {}", e),
        Ok(Err(e)) => error!("Server task failed: {}", e),
        Err(_) => warn!(
            "Requests still in flight after {:?}, exiting anyway",
            config.shutdown_grace
        ),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
