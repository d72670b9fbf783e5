//! Prometheus exporter for RabbitMQ queue statistics.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use rabbitmq_exporter::{
    BrokerClient, ExporterArgs, HttpServer, Pinger, QueueCollector, init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ExporterArgs::parse();

    let config = args.load_config()?;
    init_tracing(&config.logging)?;

    info!("Starting RabbitMQ Prometheus Exporter");

    let settings = config.broker.resolve()?;
    info!(
        broker = %settings.base_url,
        user = settings.username.as_deref().unwrap_or("-"),
        authenticated = settings.auth_token.is_some(),
        timeout_secs = settings.timeout.as_secs_f64(),
        verify_ssl = settings.verify_ssl,
        "Resolved broker settings"
    );

    let listen_addr: SocketAddr = config
        .http
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let client = BrokerClient::new(settings)?;
    let collector = Arc::new(QueueCollector::new(client));

    // Start HTTP server
    let http_server = HttpServer::new(collector.clone(), listen_addr);
    let http_shutdown = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Start background pinger
    let pinger = Pinger::new(collector.clone(), config.ping_interval());
    let pinger_task = tokio::spawn(pinger.run(shutdown_rx.clone()));

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for tasks to complete
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = http_task.await;
        let _ = pinger_task.await;
    })
    .await;

    let stats = collector.stats();
    info!(
        scrapes = stats.scrapes,
        scrapes_failed = stats.scrapes_failed,
        queues_exported = stats.queues_exported,
        queues_skipped = stats.queues_skipped,
        up = collector.is_up(),
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
