use std::{
    future::{poll_fn, Future},
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    task::Poll,
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufWriter},
    net::TcpStream,
    sync::{Mutex, Notify},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    processor::Processor,
    protocol::{
        deserializer::{Deserialize, DeserializeError},
        message::{Action, Request},
        serializer::{Serialize, SerializeError},
    },
};

#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ShardError {
    #[error("{0}")]
    Deserialize(#[from] DeserializeError),

    #[error("{0}")]
    Serialize(#[from] SerializeError),

    #[error("{0}")]
    Io(#[from] tokio::io::Error),

    #[error("The peer has closed the connection")]
    Closed,
}

// What happened to a connection that was reported as readable
enum Served {
    // The readiness was stale, nothing to read yet
    Idle,
    Request(Action),
}

// The acceptor inserts connections and the shard's own loop removes them.
// The loop keeps the lock for a whole pass, so the set it waits on is the set it serves.
pub struct Shard {
    index: usize,
    capacity: usize,
    connections: Mutex<Vec<Connection>>,
    // Mirrors `connections.len()`, only written while the lock is held
    load: AtomicUsize,
    wake: Notify,
}

impl Shard {
    pub fn new(index: usize, capacity: usize) -> Self {
        Self {
            index,
            capacity,
            connections: Mutex::default(),
            load: AtomicUsize::new(0),
            wake: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn load(&self) -> usize {
        self.load.load(Ordering::Acquire)
    }

    /// Gives the connection back if the shard is already full
    pub async fn insert(&self, connection: Connection) -> Result<(), Connection> {
        // Cut the current wait short so the loop lets go of the set
        self.wake.notify_one();

        let mut connections = self.connections.lock().await;
        if connections.len() >= self.capacity {
            return Err(connection);
        }

        connections.push(connection);
        self.load.store(connections.len(), Ordering::Release);
        drop(connections);

        // Then make it poll again with the new connection included
        self.wake.notify_one();
        Ok(())
    }

    pub async fn run(
        self: Arc<Self>,
        processor: Arc<Processor>,
        poll_timeout: Duration,
        shutdown: CancellationToken,
    ) {
        tracing::debug!("shard {} is running", self.index);

        while !shutdown.is_cancelled() {
            let mut connections = self.connections.lock().await;

            let ready = tokio::select! {
                _ = shutdown.cancelled() => break,
                // A pure signal, the permit is consumed by `notified`
                _ = self.wake.notified() => continue,
                _ = time::sleep(poll_timeout) => continue,
                ready = readiness(&connections) => ready,
            };

            // `idx` follows the live position of each snapshot entry,
            // A removal shifts the remaining connections down by one
            let mut idx = 0;
            for is_ready in ready {
                if !is_ready {
                    idx += 1;
                    continue;
                }

                let connection = &mut connections[idx];
                match serve(&processor, connection).await {
                    Ok(Served::Idle) => idx += 1,
                    Ok(Served::Request(Action::Termination)) => {
                        tracing::debug!("{} has terminated its session", connection.peer);
                        connections.remove(idx);
                    }
                    Ok(Served::Request(_)) => idx += 1,
                    Err(ShardError::Deserialize(reason)) if reason.is_disconnect() => {
                        tracing::debug!("{} disconnected mid-frame", connection.peer);
                        connections.remove(idx);
                    }
                    Err(reason) => {
                        tracing::debug!("closing connection to {}: {}", connection.peer, reason);
                        connections.remove(idx);
                    }
                }
            }

            self.load.store(connections.len(), Ordering::Release);
        }

        let mut connections = self.connections.lock().await;
        tracing::debug!(
            "shard {} is stopping, closing {} connections",
            self.index,
            connections.len()
        );
        connections.clear();
        self.load.store(0, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) async fn peers(&self) -> Vec<SocketAddr> {
        self.connections
            .lock()
            .await
            .iter()
            .map(Connection::peer)
            .collect()
    }
}

// Resolves once at least one connection is readable, with a flag per connection.
// A failed socket counts as readable so the next read can surface the error.
fn readiness(connections: &[Connection]) -> impl Future<Output = Vec<bool>> + '_ {
    poll_fn(move |cx| {
        let ready: Vec<bool> = connections
            .iter()
            .map(|connection| connection.stream.poll_read_ready(cx).is_ready())
            .collect();

        match ready.contains(&true) {
            true => Poll::Ready(ready),
            false => Poll::Pending,
        }
    })
}

async fn serve(processor: &Processor, connection: &mut Connection) -> Result<Served, ShardError> {
    // Readiness may be left over from a frame that was already consumed,
    // Confirm there is data before committing to a blocking frame read
    let mut head = [0u8; 4];
    let rcount = match connection.stream.try_read(&mut head) {
        Ok(0) => return Err(ShardError::Closed),
        Ok(rcount) => rcount,
        Err(err) if err.kind() == tokio::io::ErrorKind::WouldBlock => return Ok(Served::Idle),
        Err(err) => return Err(err.into()),
    };

    let request = {
        let mut reader = (&head[..rcount]).chain(&mut connection.stream);
        Request::deserialize(&mut reader).await?
    };
    tracing::debug!("received from {}: {:?}", connection.peer, request.action);

    let response = processor.handle(&request);
    tracing::debug!("responded to {}: {}", connection.peer, response.status);

    let mut writer = BufWriter::new(&mut connection.stream);
    response.serialize(&mut writer).await?;
    writer.flush().await?;

    Ok(Served::Request(request.action))
}
