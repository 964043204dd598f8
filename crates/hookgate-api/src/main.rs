//! hookgate CLI and HTTP gateway entry point.
//!
//! Binary name: `hookgate`
//!
//! Parses CLI arguments, initializes tracing, database and services, then
//! dispatches to the appropriate command handler or starts the HTTP server.

mod cli;
mod http;
mod state;

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use hookgate_infra::store::spawn_purge_task;
use hookgate_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(filter_for_verbosity(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Signing needs no app state.
    if let Commands::Sign { secret, file } = &cli.command {
        return cli::sign::sign_payload(secret, file.as_deref(), cli.json).await;
    }

    let state = AppState::init(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve { host, port } => serve(state, host, port).await?,

        Commands::Workflow { action } => {
            cli::workflow::handle_workflow_command(action, &state, cli.json).await?;
        }

        Commands::Executions { workflow_id, limit } => {
            cli::execution::list_executions(&state, &workflow_id, limit, cli.json).await?;
        }

        Commands::Sign { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);

    let shutdown = CancellationToken::new();
    let purge = spawn_purge_task(
        state.store.clone(),
        Duration::from_secs(state.config.store.purge_interval_secs),
        shutdown.clone(),
    );

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} hookgate listening on {}",
        console::style(">").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    if !state.config.webhooks.signature_required {
        println!(
            "  {}",
            console::style("Signature verification is disabled (development mode)").yellow()
        );
    }
    println!("  Data directory: {}", state.data_dir.display());
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let trigger = state.trigger.clone();
    let db_pool = state.db_pool.clone();
    let router = http::router::build_router(state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    trigger.cancel_all();
    shutdown.cancel();
    if let Err(e) = purge.await {
        tracing::warn!(error = %e, "cache purge task ended abnormally");
    }
    db_pool.close().await;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
