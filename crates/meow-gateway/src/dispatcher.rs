use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

use meow_types::events::{RealtimeEvent, Table};

/// What one connection currently listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub space_id: Uuid,
    pub tables: HashSet<Table>,
}

impl Subscription {
    pub fn new(space_id: Uuid, tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            space_id,
            tables: tables.into_iter().collect(),
        }
    }

    /// True if `event` is a change inside this subscription's space and tables.
    pub fn matches(&self, event: &RealtimeEvent) -> bool {
        match event.scope() {
            Some((space_id, table)) => space_id == self.space_id && self.tables.contains(&table),
            None => false,
        }
    }
}

/// Fans change events out to every connected client.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every connection receives every event and filters by its own subscription
    broadcast_tx: broadcast::Sender<RealtimeEvent>,

    /// conn_id -> active subscription (None until the client subscribes)
    connections: RwLock<HashMap<Uuid, Option<Subscription>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to the raw event stream. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish a change event. Returns how many receivers were live.
    pub fn broadcast(&self, event: RealtimeEvent) -> usize {
        debug!("Broadcasting {:?}", event);
        self.inner.broadcast_tx.send(event).unwrap_or(0)
    }

    /// Register a new connection without a subscription.
    pub async fn register_connection(&self) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner.connections.write().await.insert(conn_id, None);
        conn_id
    }

    pub async fn unregister_connection(&self, conn_id: Uuid) {
        self.inner.connections.write().await.remove(&conn_id);
    }

    /// Replace (or clear, with `None`) the subscription of a connection.
    pub async fn set_subscription(&self, conn_id: Uuid, subscription: Option<Subscription>) {
        if let Some(slot) = self.inner.connections.write().await.get_mut(&conn_id) {
            *slot = subscription;
        }
    }

    /// Number of connections currently subscribed to `space_id`.
    pub async fn listeners_for(&self, space_id: Uuid) -> usize {
        self.inner
            .connections
            .read()
            .await
            .values()
            .filter(|s| s.as_ref().is_some_and(|s| s.space_id == space_id))
            .count()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }
}
