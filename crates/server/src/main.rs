mod bootstrap;
mod bridge;
mod health;
mod hook;

use std::time::Duration;

use anyhow::Result;
use linkbot_chat::runner::EventLoopRunner;
use linkbot_core::config::{AppConfig, LoadOptions};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EVENT_QUEUE_CAPACITY: usize = 256;

fn init_logging(config: &AppConfig) {
    use linkbot_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging depends on config, so load it first
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let config = app.config;

    let (sender, runner) = EventLoopRunner::channel(EVENT_QUEUE_CAPACITY, app.dispatcher);
    let runner_task = tokio::spawn(runner.run());

    let router = health::router().merge(hook::router(&config.chat.events_path, sender));
    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        events_path = %config.chat.events_path,
        chat_bridge = app.chat_bridge.as_str(),
        domain_count = app.domains.domains().len(),
        "linkbot-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "linkbot-server stopping"
    );

    // The webhook sender was dropped with the router, so the runner drains in-flight handlers
    // and exits.
    let grace = Duration::from_secs(config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, runner_task).await {
        Ok(Ok(())) => {}
        Ok(Err(join_error)) => {
            error!(
                event_name = "system.server.runner_panicked",
                error = %join_error,
                "event loop task failed"
            );
        }
        Err(_) => {
            warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = config.server.graceful_shutdown_secs,
                "event loop did not drain before the shutdown deadline"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = wait_for_shutdown().await {
        error!(
            event_name = "system.server.signal_error",
            error = %error,
            "could not listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
