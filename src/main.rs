use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

use compose_lab::{
    app::{create_router, AppState},
    config::Config,
    middleware::init_tracing,
};

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("compose-lab: cannot set up logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run().await {
        error!("compose-lab stopped: {:#}", e);
        std::process::exit(1);
    }
}

/// Binds the listener and serves until SIGINT/SIGTERM.
///
/// DB_* variables are not read here: every `GET /` resolves them again, so a
/// container started before its database is configured still comes up.
async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let addr = config.bind_addr();

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    info!(%addr, "compose-lab accepting requests on GET / and GET /health");

    axum::serve(listener, create_router(AppState::from_process()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("compose-lab drained in-flight requests, exiting");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM (what `docker stop` sends).
/// A handler that cannot be installed never resolves instead of aborting.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, stopping"),
        _ = terminate => info!("SIGTERM received, stopping"),
    }
}
