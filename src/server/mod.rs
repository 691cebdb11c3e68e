use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;

use crate::{config::ServerConfig, processor::Processor};

pub mod shard;

use shard::{Connection, Shard};

pub struct Server {
    listener: TcpListener,
    shards: Vec<Arc<Shard>>,
    processor: Arc<Processor>,
    poll_timeout: Duration,
    shutdown: CancellationToken,
}

impl Server {
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        config: &ServerConfig,
        processor: Arc<Processor>,
        shutdown: CancellationToken,
    ) -> tokio::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;

        let shards = (0..config.shard_count())
            .map(|index| Arc::new(Shard::new(index, config.clients_per_shard as usize)))
            .collect();

        Ok(Self {
            listener,
            shards,
            processor,
            poll_timeout: config.poll_timeout(),
            shutdown,
        })
    }

    pub fn local_addr(&self) -> tokio::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shards(&self) -> &[Arc<Shard>] {
        &self.shards
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let workers: Vec<_> = self
            .shards
            .iter()
            .map(|shard| {
                tokio::spawn(shard.clone().run(
                    self.processor.clone(),
                    self.poll_timeout,
                    self.shutdown.clone(),
                ))
            })
            .collect();
        tracing::info!("started {} shards", workers.len());

        loop {
            let (stream, peer) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(reason) => {
                        // Running out of descriptors and the like is not fatal,
                        // The connection is simply lost
                        tracing::warn!("failed to accept a connection: {}", reason);
                        continue;
                    }
                },
            };

            tracing::info!("accepted connection from {}", peer);
            self.assign(Connection::new(stream, peer)).await;
        }

        tracing::info!("shutting down");
        for worker in workers {
            worker.await?;
        }

        Ok(())
    }

    // Hands the connection to the least loaded shard, waiting as long as it
    // Takes for one of them to have room
    async fn assign(&self, mut connection: Connection) {
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }

            let loads = self.shards.iter().map(|shard| (shard.load(), shard.capacity()));
            if let Some(index) = least_loaded(loads) {
                let peer = connection.peer();
                match self.shards[index].insert(connection).await {
                    Ok(()) => {
                        tracing::debug!("{} was assigned to shard {}", peer, index);
                        return;
                    }
                    Err(rejected) => connection = rejected,
                }
            }

            // Every shard is full, give them a chance to drop connections
            tokio::task::yield_now().await;
        }
    }
}

/// Picks the shard with the fewest connections that still has room, ties go to the lowest index
pub fn least_loaded(loads: impl IntoIterator<Item = (usize, usize)>) -> Option<usize> {
    loads
        .into_iter()
        .enumerate()
        .filter(|(_, (load, capacity))| load < capacity)
        .min_by_key(|(_, (load, _))| *load)
        .map(|(index, _)| index)
}
