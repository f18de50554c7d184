//! Message services - Gestione operazioni sui messaggi

use crate::core::{AppError, AppState};
use crate::dtos::{
    CreateMessageDTO, MessageDTO, MessageListDTO, MessagesQuery, UpdateMessageDTO,
    message_location,
};
use crate::entities::NewMessage;
use crate::notify::message_updated;
use axum::{
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// La lista non ritorna mai più di un giorno di messaggi
pub const MAX_LIST_WINDOW_SECS: i64 = 24 * 60 * 60;

#[instrument(skip(state, body))]
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMessageDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Creating new message");
    // 1. Validare il body (source obbligatorio e non vuoto, author_id obbligatorio)
    // 2. Salvare il messaggio con l'html placeholder
    // 3. Preparare la risposta con lo stato appena creato
    // 4. Innescare la pipeline (inline: il rendering avviene prima della risposta)
    body.validate()?;

    let (Some(source), Some(author_id)) = (body.source, body.author_id) else {
        warn!("Message creation attempted with incomplete body");
        return Err(AppError::bad_request("Message source and author are required"));
    };

    let message = state
        .store
        .create(&NewMessage { source, author_id })
        .await?;
    info!(id = message.id, author_id, "Message created");

    let id = message.id;
    let dto = MessageDTO::from(message);

    state.pipeline.on_message_created(id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, message_location(id))],
        Json(dto),
    ))
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MessagesQuery>,
) -> Result<Json<MessageListDTO>, AppError> {
    let day_ago = Utc::now().timestamp() - MAX_LIST_WINDOW_SECS;
    let since = params.updated_since.unwrap_or(0).max(day_ago);
    debug!(since, "Listing messages");

    let messages: Vec<MessageDTO> = state
        .store
        .list_updated_since(since)
        .await?
        .into_iter()
        .map(MessageDTO::from)
        .collect();

    info!("Successfully retrieved {} messages", messages.len());
    Ok(Json(MessageListDTO { messages }))
}

#[instrument(skip(state))]
pub async fn get_message(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<i64>,
) -> Result<Json<MessageDTO>, AppError> {
    let message = state.store.load(message_id).await?.ok_or_else(|| {
        warn!("Message not found");
        AppError::not_found("Message not found")
    })?;

    Ok(Json(MessageDTO::from(message)))
}

#[instrument(skip(state, body))]
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<i64>,
    body: Option<Json<UpdateMessageDTO>>,
) -> Result<StatusCode, AppError> {
    debug!("Editing message");
    // 1. Validare il body (un body assente equivale a nessuna modifica)
    // 2. Se c'è un nuovo sorgente: salvarlo e notificare la scrittura (404 se non esiste)
    // 3. Altrimenti solo verificare che il messaggio esista
    // 4. Innescare la pipeline in ogni caso, così l'html torna coerente col sorgente
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;

    // solo il sorgente: l'html è della pipeline e non va riscritto con una copia vecchia
    match body.source {
        Some(source) => {
            let saved = state.store.save_source(message_id, &source).await?;
            info!("Message source updated");
            state.notifier.publish(message_updated(&saved));
        }
        None => {
            state.store.load(message_id).await?.ok_or_else(|| {
                warn!("Message not found");
                AppError::not_found("Message not found")
            })?;
        }
    }

    state.pipeline.on_message_source_changed(message_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
