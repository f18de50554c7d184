//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.
//! L'autenticazione non è gestita qui: l'autore di un messaggio arriva dal chiamante.

pub mod message;

// Re-exports per facilitare l'import
pub use message::{create_message, edit_message, get_message, list_messages};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
