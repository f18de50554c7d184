//! Query DTOs - Data Transfer Objects per query di ricerca

use serde::{Deserialize, Serialize};

/// DTO per query parameters della lista messaggi
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct MessagesQuery {
    /// Timestamp unix: ritorna solo i messaggi aggiornati da questo istante in poi
    #[serde(default)]
    pub updated_since: Option<i64>,
}

/// Risposta della lista messaggi
#[derive(Serialize, Deserialize, Debug)]
pub struct MessageListDTO {
    pub messages: Vec<super::MessageDTO>,
}
