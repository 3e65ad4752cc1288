//! Courier server binary.
//!
//! Starts the HTTP channel with structured logging, wires it to an
//! in-process message bus, and shuts down gracefully on SIGTERM/SIGINT.

use courier_server::{
    app, background,
    bus::{spawn_outbound_dispatcher, QueueBus},
    channel::HttpChannel,
    config, loopback, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("COURIER_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("courier.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let workspace = config
        .workspace
        .path
        .clone()
        .filter(|p| !p.as_os_str().is_empty());
    match &workspace {
        Some(path) => tracing::info!(path = %path.display(), "using agent workspace"),
        None => tracing::warn!("no workspace configured, uploads are disabled"),
    }

    // Message bus: inbound to the agent, outbound back to this channel
    let (bus, inbound_rx) = QueueBus::channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let channel = Arc::new(HttpChannel::new(Arc::new(bus)));
    spawn_outbound_dispatcher(outbound_rx, channel.clone());

    // Held for the lifetime of the server so publishes keep succeeding when
    // no agent is embedded.
    let _idle_agent = if config.agent.loopback {
        tracing::info!("loopback agent enabled, replies echo the request");
        loopback::spawn(inbound_rx, outbound_tx, config.agent.reset_command.clone());
        None
    } else {
        tracing::warn!("no agent runtime embedded, conversational requests will time out");
        Some((inbound_rx, outbound_tx))
    };

    tokio::spawn(background::start_sweeper_task(
        channel.clone(),
        config.agent.sweep_interval_secs,
        config.agent.chat_timeout().max(config.agent.reset_timeout()),
    ));

    // Build application
    let app = app(AppState {
        channel,
        workspace,
        agent: config.agent.clone(),
        max_body_bytes: config.server.max_body_bytes,
    });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting courier http channel");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("courier server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
