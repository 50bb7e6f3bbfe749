use clap::Parser;
use griddle_server::server::{
    config::{CliArgs, ServerConfig},
    service::KitchenService,
    telemetry::init_telemetry,
};
use std::net::SocketAddr;
use tokio::{net::TcpListener, signal};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let listener = TcpListener::bind(&config.server_addr).await?;
    log_startup_info(listener.local_addr()?, &config);

    let service = KitchenService::new(config);

    let served = axum::serve(listener, service.router())
        .with_graceful_shutdown(shutdown_signal(service.clone()))
        .await;

    providers.shutdown();
    served?;
    Ok(())
}

fn log_startup_info(addr: SocketAddr, config: &ServerConfig) {
    tracing::info!(
        "Starting kitchen on ws://{} with {} fryers per session (queue {}, fry {:?}, event buffer {})",
        addr,
        config.num_fryers,
        config.job_queue_capacity,
        config.fry_duration,
        config.event_buffer_size
    );
}

async fn shutdown_signal(service: KitchenService) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
    service.shutdown().await;
}
