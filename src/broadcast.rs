//! Per-tenant broadcast hub for live client updates
//!
//! Keeps a registry of live connections keyed by an opaque connection id.
//! Connect, disconnect, and broadcast all run from different tasks, so the
//! registry sits behind a mutex. Delivery is best-effort: a subscriber whose
//! channel is gone is dropped from the registry on the spot, and no ordering
//! is guaranteed across distinct subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::events::ReviewEvent;

struct Subscriber {
    tenant_id: String,
    tx: mpsc::UnboundedSender<ReviewEvent>,
}

/// Registry of live subscribers with tenant-scoped fan-out
#[derive(Clone)]
pub struct BroadcastHub {
    connections: Arc<Mutex<HashMap<Uuid, Subscriber>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a new live connection for a tenant.
    ///
    /// Returns the connection id (pass it back to [`disconnect`](Self::disconnect))
    /// and the receiving end the connection task should drain.
    pub async fn connect(&self, tenant_id: &str) -> (Uuid, mpsc::UnboundedReceiver<ReviewEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        let mut connections = self.connections.lock().await;
        connections.insert(
            id,
            Subscriber {
                tenant_id: tenant_id.to_string(),
                tx,
            },
        );
        info!(
            tenant_id = %tenant_id,
            total = connections.len(),
            "Live connection registered"
        );

        (id, rx)
    }

    /// Remove a connection. Safe to call for an already-removed id.
    pub async fn disconnect(&self, id: Uuid) {
        let mut connections = self.connections.lock().await;
        if connections.remove(&id).is_some() {
            info!(total = connections.len(), "Live connection removed");
        }
    }

    /// Fan an event out to every subscriber of the event's tenant.
    ///
    /// A subscriber whose send fails is treated as disconnected and removed.
    /// Returns the number of subscribers the event was delivered to.
    pub async fn broadcast(&self, event: ReviewEvent) -> usize {
        let tenant_id = event.tenant_id().to_string();
        let mut connections = self.connections.lock().await;

        let mut dead = Vec::new();
        let mut sent = 0usize;
        for (id, subscriber) in connections.iter() {
            if subscriber.tenant_id != tenant_id {
                continue;
            }
            if subscriber.tx.send(event.clone()).is_ok() {
                sent += 1;
            } else {
                dead.push(*id);
            }
        }

        for id in dead {
            connections.remove(&id);
            debug!(connection_id = %id, "Dropped unreachable live connection");
        }

        debug!(
            event = event.event_type(),
            tenant_id = %tenant_id,
            sent,
            "Broadcast event"
        );
        sent
    }

    /// Number of currently registered connections (all tenants)
    pub async fn subscriber_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
