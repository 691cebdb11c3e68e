use std::{io::BufRead, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use seat_reservation::{
    config::ServerConfig, processor::Processor, server::Server,
    systems::password::HmacSha256,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    // Connect tracing to stdout
    tracing_subscriber::fmt::init();

    let config = match ServerConfig::try_parse() {
        Ok(config) => config,
        Err(err) => {
            let _ = err.print();
            return match err.use_stderr() {
                true => ExitCode::FAILURE,
                false => ExitCode::SUCCESS,
            };
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(reason) => {
            tracing::error!("{:#}", reason);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let hasher = match &config.password_key {
        Some(key) => HmacSha256::new(key.as_bytes()),
        None => HmacSha256::random(),
    }
    .context("failed to set up the password hasher")?;

    let processor = Arc::new(Processor::new(config.seats, Box::new(hasher)));
    let shutdown = CancellationToken::new();

    let server = Server::bind(("0.0.0.0", config.port), &config, processor, shutdown.clone())
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!("Server listening on: {}", server.local_addr()?);
    tracing::info!(
        "serving {} seats with {} shards of {} clients",
        config.seats,
        config.shard_count(),
        config.clients_per_shard
    );

    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt");
            on_signal.cancel();
        }
    });

    // A blocking read of stdin would keep the runtime from shutting down,
    // So the operator console lives on its own thread
    let on_command = shutdown.clone();
    std::thread::spawn(move || watch_console(on_command));

    server.run().await
}

fn watch_console(shutdown: CancellationToken) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { break };

        if is_shutdown_command(&line) {
            tracing::info!("shutdown requested from the console");
            shutdown.cancel();
            return;
        }
    }
}

fn is_shutdown_command(line: &str) -> bool {
    let command = line.trim();
    ["exit", "quit", "shutdown"]
        .iter()
        .any(|known| command.eq_ignore_ascii_case(known))
}
