//! Fan-out of serialized events to live subscriber connections.
//!
//! [`Hub`] is a handle to a single task that owns the connection
//! registry. Registration, removal and broadcast are requests sent to
//! that task through its inbox, so the registry itself needs no lock and
//! every broadcast is applied in the order it was received.
//!
//! Each [`Connection`] owns a bounded outbound queue drained by its own
//! writer. Broadcast never waits on a queue: a subscriber whose queue is
//! full is treated as dead, dropped from the registry and its queue is
//! closed. Delivery is at-most-once.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::error::FaucetError;

/// Default depth of a connection's outbound queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Default capacity of the hub's request inbox.
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;

/// Identifies a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Producer side of a subscriber's outbound queue, as held by the hub.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    queue: mpsc::Sender<Bytes>,
}

impl Connection {
    /// Creates a connection with a queue of `depth` payloads.
    ///
    /// Returns the connection (to be registered) and the consumer end of
    /// its queue (to be drained by the subscriber's writer). The receiver
    /// yields `None` once the hub has dropped the connection.
    #[must_use]
    pub fn new(depth: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (queue, outbound) = mpsc::channel(depth.max(1));
        (
            Self {
                id: ConnectionId::new(),
                queue,
            },
            outbound,
        )
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

#[derive(Debug)]
enum HubCommand {
    Register(Connection),
    Unregister(ConnectionId),
    Broadcast(Bytes),
    Count(oneshot::Sender<usize>),
}

/// Handle to the broadcast hub task.
///
/// Cheap to clone. The task exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct Hub {
    inbox: mpsc::Sender<HubCommand>,
}

impl Hub {
    /// Spawns the hub task on the current Tokio runtime.
    #[must_use]
    pub fn spawn(inbox_capacity: usize) -> Self {
        let (inbox, requests) = mpsc::channel(inbox_capacity.max(1));
        tokio::spawn(run(requests));
        Self { inbox }
    }

    /// Adds `connection` to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`FaucetError::HubClosed`] if the hub task has stopped.
    pub async fn register(&self, connection: Connection) -> Result<(), FaucetError> {
        self.send(HubCommand::Register(connection)).await
    }

    /// Removes a connection and closes its queue. No-op if it is not
    /// registered, e.g. because it was already evicted.
    ///
    /// # Errors
    ///
    /// Returns [`FaucetError::HubClosed`] if the hub task has stopped.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), FaucetError> {
        self.send(HubCommand::Unregister(id)).await
    }

    /// Queues `payload` for every registered connection.
    ///
    /// # Errors
    ///
    /// Returns [`FaucetError::HubClosed`] if the hub task has stopped.
    pub async fn broadcast(&self, payload: impl Into<Bytes>) -> Result<(), FaucetError> {
        self.send(HubCommand::Broadcast(payload.into())).await
    }

    /// Returns the number of registered connections.
    ///
    /// # Errors
    ///
    /// Returns [`FaucetError::HubClosed`] if the hub task has stopped.
    pub async fn connection_count(&self) -> Result<usize, FaucetError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Count(tx)).await?;
        rx.await.map_err(|_| FaucetError::HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), FaucetError> {
        self.inbox
            .send(command)
            .await
            .map_err(|_| FaucetError::HubClosed)
    }
}

async fn run(mut requests: mpsc::Receiver<HubCommand>) {
    let mut connections: HashMap<ConnectionId, mpsc::Sender<Bytes>> = HashMap::new();

    while let Some(command) = requests.recv().await {
        match command {
            HubCommand::Register(connection) => {
                tracing::debug!(connection = %connection.id, "subscriber registered");
                connections.insert(connection.id, connection.queue);
            }
            HubCommand::Unregister(id) => {
                if connections.remove(&id).is_some() {
                    tracing::debug!(connection = %id, "subscriber unregistered");
                }
            }
            HubCommand::Broadcast(payload) => {
                connections.retain(|id, queue| match queue.try_send(payload.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(connection = %id, "subscriber queue full, evicting");
                        false
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        tracing::debug!(connection = %id, "subscriber gone, dropping");
                        false
                    }
                });
            }
            HubCommand::Count(reply) => {
                let _ = reply.send(connections.len());
            }
        }
    }

    tracing::debug!(remaining = connections.len(), "hub stopped");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    async fn count(hub: &Hub) -> usize {
        let Ok(n) = hub.connection_count().await else {
            panic!("hub closed");
        };
        n
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber_once() {
        let hub = Hub::spawn(16);
        let mut outbound = Vec::new();
        for _ in 0..3 {
            let (conn, rx) = Connection::new(DEFAULT_QUEUE_DEPTH);
            assert!(hub.register(conn).await.is_ok());
            outbound.push(rx);
        }

        assert!(hub.broadcast(Bytes::from_static(b"block-1")).await.is_ok());
        assert_eq!(count(&hub).await, 3);

        for rx in &mut outbound {
            assert_eq!(rx.recv().await, Some(Bytes::from_static(b"block-1")));
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn broadcasts_arrive_in_order() {
        let hub = Hub::spawn(16);
        let (conn, mut rx) = Connection::new(DEFAULT_QUEUE_DEPTH);
        assert!(hub.register(conn).await.is_ok());

        for i in 0..10u8 {
            assert!(hub.broadcast(vec![i]).await.is_ok());
        }
        for i in 0..10u8 {
            assert_eq!(rx.recv().await, Some(Bytes::from(vec![i])));
        }
    }

    #[tokio::test]
    async fn slow_subscriber_is_evicted() {
        let hub = Hub::spawn(16);
        let (slow, mut slow_rx) = Connection::new(2);
        let (fast, mut fast_rx) = Connection::new(DEFAULT_QUEUE_DEPTH);
        assert!(hub.register(slow).await.is_ok());
        assert!(hub.register(fast).await.is_ok());

        for i in 0..3u8 {
            assert!(hub.broadcast(vec![i]).await.is_ok());
        }
        assert_eq!(count(&hub).await, 1);

        // The evicted queue yields what it buffered, then closes.
        assert_eq!(slow_rx.recv().await, Some(Bytes::from(vec![0])));
        assert_eq!(slow_rx.recv().await, Some(Bytes::from(vec![1])));
        assert_eq!(slow_rx.recv().await, None);

        assert!(hub.broadcast(vec![3]).await.is_ok());
        for i in 0..4u8 {
            assert_eq!(fast_rx.recv().await, Some(Bytes::from(vec![i])));
        }
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_broadcast() {
        let hub = Hub::spawn(16);
        let (conn, rx) = Connection::new(DEFAULT_QUEUE_DEPTH);
        assert!(hub.register(conn).await.is_ok());
        drop(rx);

        assert!(hub.broadcast(Bytes::from_static(b"x")).await.is_ok());
        assert_eq!(count(&hub).await, 0);
    }

    #[tokio::test]
    async fn unregister_closes_queue_and_is_idempotent() {
        let hub = Hub::spawn(16);
        let (conn, mut rx) = Connection::new(DEFAULT_QUEUE_DEPTH);
        let id = conn.id();
        assert!(hub.register(conn).await.is_ok());

        assert!(hub.unregister(id).await.is_ok());
        assert!(hub.unregister(id).await.is_ok());
        assert_eq!(count(&hub).await, 0);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_ok() {
        let hub = Hub::spawn(16);
        assert!(hub.broadcast(Bytes::from_static(b"nobody")).await.is_ok());
        assert_eq!(count(&hub).await, 0);
    }
}
