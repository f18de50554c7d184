//! WebSocket Module - Inoltro real-time degli eventi di cambiamento
//!
//! Ogni connessione si iscrive al notifier e riceve, in JSON, ogni evento pubblicato
//! dalla pipeline o dalle modifiche via HTTP:
//! `{"type":"UpdatedModel","data":{"class":"Message","model":{...}}}`.
//! Il socket è in sola lettura per il client; il server manda ping periodici e il
//! client resta vivo finché risponde con i pong.

pub mod connection;

// Re-exports pubblici
pub use connection::handle_socket;

use crate::{AppError, AppState};
use axum::{
    extract::{State, ws::WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const PING_INTERVAL_SECONDS: u64 = 30;
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;

/// Keep-alive di una connessione WebSocket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsSettings {
    /// Ogni quanto il server manda un ping
    pub ping_interval: Duration,
    /// Chiusura dopo questo periodo senza frame dal client (pong inclusi)
    pub idle_timeout: Duration,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(PING_INTERVAL_SECONDS),
            idle_timeout: Duration::from_secs(TIMEOUT_DURATION_SECONDS),
        }
    }
}

/// Entry point per gestire richieste di upgrade WebSocket
/// Operazioni:
/// 1. Iscriversi agli eventi prima dell'upgrade (nessun evento perso dopo il 101)
/// 2. Eseguire upgrade HTTP -> WebSocket
/// 3. Passare la connessione ad handle_socket
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let Some(events) = state.notifier.live_events() else {
        warn!("WebSocket requested but live events are disabled");
        return AppError::service_unavailable("Live events are disabled").into_response();
    };
    let settings = state.ws;

    ws
        // Possibile limitazione dei buffer, default 128 KB
        //.read_buffer_size(4*1024)
        //.write_buffer_size(16*1024)
        .on_upgrade(move |socket| handle_socket(socket, events, settings))
}
