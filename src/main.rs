use std::time::Duration;

use tokio::sync::watch;

use pocketledger_gateway::config;
use pocketledger_gateway::proxy::{self, GatewayState};
use pocketledger_gateway::supervisor::{Supervisor, UpstreamCommand};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up GATEWAY_PORT, UPSTREAM_HOST, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting PocketLedger gateway in {:?} mode", config.environment);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Launch the backend process under supervision before accepting traffic
    let supervisor_task = if config.supervisor.enabled {
        let command =
            UpstreamCommand::new(config.supervisor.command.clone(), config.supervisor.args.clone());
        let (supervisor, _upstream) = Supervisor::new(
            command,
            Duration::from_secs(config.supervisor.restart_delay_secs),
        );
        Some(tokio::spawn(supervisor.run(shutdown_rx.clone())))
    } else {
        None
    };

    let state = GatewayState::from_config(config)
        .unwrap_or_else(|e| panic!("invalid gateway configuration: {}", e));
    let app = proxy::router(state);

    let bind_addr = format!("0.0.0.0:{}", config.gateway.listen_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 PocketLedger gateway listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server");

    // The upstream process is killed before we exit so a normal shutdown
    // never leaves an orphan behind.
    let _ = shutdown_tx.send(true);
    if let Some(task) = supervisor_task {
        let _ = task.await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
