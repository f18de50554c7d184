//! WebSocket Connection Management - Gestione connessioni WebSocket

use crate::dtos::{ModelEvent, WsEventDTO};
use crate::ws::WsSettings;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::body::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::Receiver;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, error, info, instrument, warn};

/// Segnali dal task di ascolto al task di scrittura
#[derive(Debug)]
pub enum InternalSignal {
    /// Il client ha chiuso o è andato in timeout
    Shutdown,
    /// Risposta diretta al client (es. frame non previsto)
    Reply(WsEventDTO),
}

#[instrument(skip(ws, events))]
pub async fn handle_socket(ws: WebSocket, events: Receiver<ModelEvent>, settings: WsSettings) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    // canale unbounded per non perdere il segnale di shutdown
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    tokio::spawn(listen_ws(ws_rx, int_tx, settings));
    tokio::spawn(write_ws(ws_tx, int_rx, events, settings));
}

#[instrument(skip_all)]
pub async fn write_ws(
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
    events: Receiver<ModelEvent>,
    settings: WsSettings,
) {
    info!("Write task started");

    let mut events = BroadcastStream::new(events);

    // i ping tengono viva la connessione anche per i client che ascoltano soltanto
    let mut ping = interval(settings.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await; // Consuma primo tick immediato

    'external: loop {
        tokio::select! {
            next = tokio_stream::StreamExt::next(&mut events) => {
                match next {
                    Some(Ok(event)) => {
                        let id = event.model.id;
                        if send_event(&mut websocket_tx, &WsEventDTO::UpdatedModel(event)).await.is_err() {
                            warn!("Failed to forward event, closing connection");
                            break 'external;
                        }
                        debug!(id, "Event forwarded");
                    }
                    // client troppo lento: gli eventi persi sono già superati da quelli successivi
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(skipped, "Subscriber lagging, events dropped");
                    }
                    None => {
                        info!("Event channel closed");
                        break 'external;
                    }
                }
            }

            _ = ping.tick() => {
                if let Err(e) = websocket_tx.send(Message::Ping(Bytes::new())).await {
                    warn!("Failed to send ping, closing connection: {:?}", e);
                    break 'external;
                }
            }

            signal = internal_rx.recv() => {
                match signal {
                    Some(InternalSignal::Shutdown) => {
                        info!("Shutdown signal received");
                        break 'external;
                    }
                    Some(InternalSignal::Reply(event)) => {
                        if send_event(&mut websocket_tx, &event).await.is_err() {
                            break 'external;
                        }
                    }
                    None => {
                        info!("Internal channel closed");
                        break 'external; // listener ws chiuso, quindi stacca tutto
                    }
                }
            }
        }
    }

    let _ = websocket_tx.close().await;
    info!("Write task terminated");
}

async fn send_event(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    event: &WsEventDTO,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(|e| {
        error!("Failed to serialize event: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|e| {
            error!("Failed to send event through WebSocket: {:?}", e);
            e
        })
}

#[instrument(skip_all)]
pub async fn listen_ws(
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
    settings: WsSettings,
) {
    info!("Listen task started");

    // ogni frame del client conta come attività, compresi i pong ai nostri ping
    let timeout_duration = settings.idle_timeout;

    loop {
        match timeout(timeout_duration, StreamExt::next(&mut websocket_rx)).await {
            Ok(Some(Ok(Message::Text(_)))) | Ok(Some(Ok(Message::Binary(_)))) => {
                warn!("Client sent data on a read-only socket");
                let reply = WsEventDTO::Error {
                    code: 400,
                    message: "This socket only delivers server events".to_string(),
                };
                if internal_tx.send(InternalSignal::Reply(reply)).is_err() {
                    break;
                }
            }
            Ok(Some(Ok(Message::Close(_)))) => {
                info!("Close message received");
                break;
            }
            // pong (e ping del client, a cui risponde axum)
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(e))) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(
                    timeout_secs = timeout_duration.as_secs(),
                    "Connection timeout, client stopped answering pings"
                );
                break;
            }
        }
    }

    let _ = internal_tx.send(InternalSignal::Shutdown);
    info!("Listen task terminated");
}
