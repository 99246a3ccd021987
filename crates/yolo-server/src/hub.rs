//! Fan-out of server messages to connected WebSocket clients.
//!
//! One task owns the client set. Everything else talks to it through the
//! register, unregister and broadcast channels, so the set is never shared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 64;
/// Per-client backlog; a client that falls further behind is dropped.
const CLIENT_BACKLOG: usize = 32;

pub type ClientId = u64;

struct Registration {
    id: ClientId,
    tx: mpsc::Sender<String>,
}

#[derive(Clone)]
pub struct Hub {
    register: mpsc::Sender<Registration>,
    unregister: mpsc::Sender<ClientId>,
    broadcast: mpsc::Sender<String>,
    next_id: Arc<AtomicU64>,
}

impl Hub {
    /// Create the hub and start its loop on the current runtime. Outside a
    /// runtime the loop is not started and messages are dropped.
    pub fn spawn() -> Self {
        let (register, register_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (unregister, unregister_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (broadcast, broadcast_rx) = mpsc::channel(CHANNEL_CAPACITY);
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::spawn(run(register_rx, unregister_rx, broadcast_rx));
        }
        Self {
            register,
            unregister,
            broadcast,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Add a client. Messages for it arrive on the returned receiver until
    /// it is unregistered.
    pub async fn register(&self) -> Option<(ClientId, mpsc::Receiver<String>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BACKLOG);
        self.register.send(Registration { id, tx }).await.ok()?;
        Some((id, rx))
    }

    pub async fn unregister(&self, id: ClientId) {
        if self.unregister.send(id).await.is_err() {
            tracing::debug!(id, "hub stopped before unregister");
        }
    }

    /// Send `message` to every connected client.
    pub async fn broadcast(&self, message: String) {
        if self.broadcast.send(message).await.is_err() {
            tracing::debug!("hub stopped, broadcast dropped");
        }
    }
}

async fn run(
    mut register: mpsc::Receiver<Registration>,
    mut unregister: mpsc::Receiver<ClientId>,
    mut broadcast: mpsc::Receiver<String>,
) {
    let mut clients: HashMap<ClientId, mpsc::Sender<String>> = HashMap::new();
    loop {
        // Registrations are drained first so a client registered before a
        // broadcast always receives it.
        tokio::select! {
            biased;
            Some(reg) = register.recv() => {
                tracing::debug!(id = reg.id, "ws client registered");
                clients.insert(reg.id, reg.tx);
            }
            Some(id) = unregister.recv() => {
                if clients.remove(&id).is_some() {
                    tracing::debug!(id, "ws client unregistered");
                }
            }
            Some(message) = broadcast.recv() => {
                clients.retain(|id, tx| match tx.try_send(message.clone()) {
                    Ok(()) => true,
                    Err(_) => {
                        tracing::debug!(id, "dropping unresponsive ws client");
                        false
                    }
                });
            }
            else => break,
        }
    }
    tracing::debug!("ws hub stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_registered_clients() {
        let hub = Hub::spawn();
        let (_a, mut rx_a) = hub.register().await.unwrap();
        let (b, mut rx_b) = hub.register().await.unwrap();

        hub.broadcast("{\"kind\":\"ping\"}".into()).await;
        assert_eq!(rx_a.recv().await.unwrap(), "{\"kind\":\"ping\"}");
        assert_eq!(rx_b.recv().await.unwrap(), "{\"kind\":\"ping\"}");

        hub.unregister(b).await;
        hub.broadcast("second".into()).await;
        assert_eq!(rx_a.recv().await.unwrap(), "second");
        assert!(rx_b.recv().await.is_none());
    }

    #[tokio::test]
    async fn client_ids_are_unique() {
        let hub = Hub::spawn();
        let (a, _rx_a) = hub.register().await.unwrap();
        let (b, _rx_b) = hub.register().await.unwrap();
        assert_ne!(a, b);
    }
}
