//! Message DTOs - Data Transfer Objects per messaggi

use crate::entities::Message;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Rappresentazione completa del messaggio verso il client (e negli eventi di notifica)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageDTO {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub source: String,
    pub html: String,
    pub author_id: i64,
    #[serde(rename = "_links")]
    pub links: MessageLinks,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub user: String,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            links: MessageLinks {
                self_link: message_location(value.id),
                user: format!("/users/{}", value.author_id),
            },
            id: value.id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            source: value.source,
            html: value.html,
            author_id: value.author_id,
        }
    }
}

/// Path canonico di un messaggio, usato anche per l'header `Location`
pub fn message_location(id: i64) -> String {
    format!("/api/messages/{}", id)
}

/// DTO per creare un nuovo messaggio (senza id, l'html viene generato dalla pipeline)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateMessageDTO {
    #[validate(
        required(message = "Message source is required"),
        length(min = 1, max = 5000, message = "Message source must be between 1 and 5000 characters")
    )]
    pub source: Option<String>,

    #[validate(required(message = "Message author is required"))]
    pub author_id: Option<i64>,
}

/// DTO per aggiornare un messaggio (solo il sorgente è modificabile)
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message source must be between 1 and 5000 characters"))]
    pub source: Option<String>,
}
