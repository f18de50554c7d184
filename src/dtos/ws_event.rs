//! WebSocket Event DTOs - Data Transfer Objects per eventi WebSocket

use serde::{Deserialize, Serialize};

use crate::dtos::MessageDTO;

/// Evento di cambiamento: tipo dell'entità + rappresentazione completa corrente
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelEvent {
    pub class: String,
    pub model: MessageDTO,
}

impl ModelEvent {
    pub fn message(model: MessageDTO) -> Self {
        Self {
            class: "Message".to_string(),
            model,
        }
    }
}

/// Enum per gestire gli eventi WebSocket in modo type-safe
/// Tagged union per eventi WebSocket
/// Serde serializza questo come:
/// { "type": "UpdatedModel", "data": { "class": "Message", "model": { ... } } }
/// oppure
/// { "type": "Error", "data": { "code": 400, "message": "..." } }
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum WsEventDTO {
    UpdatedModel(ModelEvent),
    Error { code: u16, message: String },
}
