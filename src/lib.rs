//! Server library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod enrich;
pub mod entities;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use core::{AppError, AppState, config};
pub use services::root;

use axum::{
    Router,
    routing::{any, get},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/api/messages", configure_message_routes())
        .route("/ws", any(ws_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Configura le routes per la gestione dei messaggi
fn configure_message_routes() -> Router<Arc<AppState>> {
    use services::*;

    Router::new()
        .route("/", get(list_messages).post(create_message))
        .route("/{message_id}", get(get_message).put(edit_message))
}
