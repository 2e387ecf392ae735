use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use meow_types::events::{RealtimeCommand, RealtimeEvent};

use crate::dispatcher::{Dispatcher, Subscription};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

type SharedSubscription = Arc<RwLock<Option<Subscription>>>;

/// Drive one websocket client: send `Ready`, then forward every change event
/// that matches the client's current subscription until either side hangs up.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher) {
    let (mut sender, mut receiver) = socket.split();

    let conn_id = dispatcher.register_connection().await;
    info!("Gateway connection {} opened", conn_id);

    let ready = RealtimeEvent::Ready { connection_id: conn_id };
    if send_event(&mut sender, &ready).await.is_err() {
        dispatcher.unregister_connection(conn_id).await;
        return;
    }

    // Subscribe before reading commands so no event after Subscribe is missed
    let mut broadcast_rx = dispatcher.subscribe();

    let subscription: SharedSubscription = Arc::new(RwLock::new(None));
    let send_subscription = subscription.clone();

    // Acknowledgements for this connection only
    let (ack_tx, mut ack_rx) = mpsc::unbounded_channel::<RealtimeEvent>();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward matching broadcasts -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(RecvError::Lagged(n)) => {
                            warn!("Gateway connection {} lagged by {} events", conn_id, n);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    let wanted = send_subscription
                        .read()
                        .map(|sub| sub.as_ref().is_some_and(|s| s.matches(&event)))
                        .unwrap_or(false);
                    if !wanted {
                        continue;
                    }

                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Some(ack) = ack_rx.recv() => {
                    if send_event(&mut sender, &ack).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout on {} (missed {} pongs), dropping connection", conn_id, missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let recv_dispatcher = dispatcher.clone();
    let recv_subscription = subscription.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<RealtimeCommand>(&text) {
                    Ok(cmd) => {
                        if let Some(ack) = handle_command(&recv_dispatcher, conn_id, cmd, &recv_subscription).await {
                            let _ = ack_tx.send(ack);
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Gateway connection {} bad command: {} -- raw: {}",
                            conn_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_connection(conn_id).await;
    info!("Gateway connection {} closed", conn_id);
}

async fn handle_command(
    dispatcher: &Dispatcher,
    conn_id: Uuid,
    cmd: RealtimeCommand,
    subscription: &SharedSubscription,
) -> Option<RealtimeEvent> {
    let (next, ack) = match cmd {
        RealtimeCommand::Subscribe { space_id, tables } => {
            debug!("Connection {} subscribing to {} ({:?})", conn_id, space_id, tables);
            let sub = Subscription::new(space_id, tables.iter().copied());
            (Some(sub), Some(RealtimeEvent::Subscribed { space_id, tables }))
        }
        RealtimeCommand::Unsubscribe => {
            debug!("Connection {} unsubscribed", conn_id);
            (None, None)
        }
    };

    {
        let mut slot = subscription.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = next.clone();
    }
    let space_id = next.as_ref().map(|s| s.space_id);
    dispatcher.set_subscription(conn_id, next).await;
    if let Some(space_id) = space_id {
        info!("Space {} has {} live listener(s)", space_id, dispatcher.listeners_for(space_id).await);
    }
    ack
}

async fn send_event<S>(sender: &mut S, event: &RealtimeEvent) -> Result<(), ()>
where
    S: futures_util::Sink<Message> + Unpin,
{
    let text = serde_json::to_string(event).map_err(|e| warn!("Unserializable event: {}", e))?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
