use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use meow_types::events::{RealtimeCommand, RealtimeEvent, Table};

use crate::error::{ClientError, Result};

/// Buffered change notifications per subscription.
const CHANNEL_CAPACITY: usize = 64;

/// Default bound on connecting, subscribing and waiting for the ack.
pub const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

/// "Something changed in this space's table." Consumers re-fetch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub space_id: Uuid,
    pub table: Table,
    pub user_id: Uuid,
}

impl ChangeEvent {
    /// The change carried by `event`, if it is one.
    pub fn from_event(event: &RealtimeEvent) -> Option<Self> {
        match *event {
            RealtimeEvent::MoodInserted { space_id, user_id, .. } => Some(Self {
                space_id,
                table: Table::Moods,
                user_id,
            }),
            RealtimeEvent::AnswerChanged { space_id, user_id, .. } => Some(Self {
                space_id,
                table: Table::Answers,
                user_id,
            }),
            RealtimeEvent::Ready { .. } | RealtimeEvent::Subscribed { .. } => None,
        }
    }

    pub fn matches(&self, space_id: Uuid, tables: &[Table]) -> bool {
        self.space_id == space_id && tables.contains(&self.table)
    }
}

/// Source of change notifications scoped to one space.
pub trait ChangeFeed: Send + Sync + 'static {
    fn subscribe(&self, space_id: Uuid, tables: &[Table]) -> impl Future<Output = Result<Subscription>> + Send;
}

/// A live listener. Yields change events until dropped; dropping it
/// releases the underlying connection or listener task.
pub struct Subscription {
    rx: mpsc::Receiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a receiver fed by `task`. The task is aborted when this is dropped.
    pub fn new(rx: mpsc::Receiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self { rx, task: Some(task) }
    }

    /// A subscription whose sender is owned elsewhere.
    pub fn from_receiver(rx: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { rx, task: None }
    }

    /// Next change, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Wait for a change, then keep absorbing changes until `window` passes
    /// without one. A burst of notifications yields one event (the last).
    /// A steady stream is cut off at twice `window` after its first event.
    pub async fn next_debounced(&mut self, window: Duration) -> Option<ChangeEvent> {
        let mut last = self.rx.recv().await?;
        let deadline = Instant::now() + window * 2;
        loop {
            let quiet_until = (Instant::now() + window).min(deadline);
            match tokio::time::timeout_at(quiet_until, self.rx.recv()).await {
                Ok(Some(event)) => last = event,
                Ok(None) | Err(_) => return Some(last),
            }
        }
    }
}

impl Stream for Subscription {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChangeEvent>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// [`ChangeFeed`] over the gateway websocket. Each subscription owns its own
/// connection, closed when the subscription is dropped.
#[derive(Debug, Clone)]
pub struct WsChangeFeed {
    url: String,
    timeout: Duration,
}

impl WsChangeFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
        }
    }

    /// Bound the whole handshake (connect, Subscribe, ack) by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn handshake(&self, space_id: Uuid, tables: &[Table]) -> Result<GatewayStream> {
        let (mut ws, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::NetworkUnavailable(format!("gateway connect failed: {e}")))?;

        let cmd = RealtimeCommand::Subscribe {
            space_id,
            tables: tables.to_vec(),
        };
        let text = serde_json::to_string(&cmd).map_err(|e| ClientError::Unknown(e.to_string()))?;
        ws.send(Message::Text(text.into()))
            .await
            .map_err(|e| ClientError::NetworkUnavailable(format!("gateway send failed: {e}")))?;

        // Events published before the ack may not reach us
        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            if let Ok(RealtimeEvent::Subscribed { space_id: acked, .. }) = serde_json::from_str(&text) {
                if acked == space_id {
                    return Ok(ws);
                }
            }
        }
        Err(ClientError::NetworkUnavailable("gateway closed before acknowledging subscription".into()))
    }
}

type GatewayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

impl ChangeFeed for WsChangeFeed {
    async fn subscribe(&self, space_id: Uuid, tables: &[Table]) -> Result<Subscription> {
        let mut ws = match tokio::time::timeout(self.timeout, self.handshake(space_id, tables)).await {
            Ok(ws) => ws?,
            Err(_) => {
                return Err(ClientError::NetworkUnavailable(format!(
                    "gateway did not answer within {:?}",
                    self.timeout
                )));
            }
        };
        info!("Subscribed to {} {:?}", space_id, tables);

        let tables = tables.to_vec();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(async move {
            // Pings are answered by tungstenite while reading
            while let Some(msg) = ws.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Gateway connection for {} failed: {}", space_id, e);
                        break;
                    }
                };

                let change = match serde_json::from_str::<RealtimeEvent>(&text) {
                    Ok(event) => ChangeEvent::from_event(&event),
                    Err(e) => {
                        warn!("Unreadable gateway event: {}", e);
                        continue;
                    }
                };
                let Some(change) = change.filter(|c| c.matches(space_id, &tables)) else {
                    continue;
                };
                if tx.send(change).await.is_err() {
                    break;
                }
            }
            let _ = ws.close(None).await;
            debug!("Gateway subscription for {} ended", space_id);
        });

        Ok(Subscription::new(rx, task))
    }
}
