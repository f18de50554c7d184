//! Message entity - Entità messaggio

use serde::{Deserialize, Serialize};

/// Segnaposto salvato in `html` finché la pipeline non ha renderizzato il sorgente
pub const HTML_PLACEHOLDER: &str = "...";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    // timestamp unix in secondi, updated_at non decresce mai
    pub created_at: i64,
    pub updated_at: i64,
    /// Markdown grezzo scritto dall'autore
    pub source: String,
    /// Derivato da `source`: mai scritto a mano, sempre output del renderer (+ eventuale enrichment)
    pub html: String,
    pub author_id: i64,
}

impl Message {
    /// Stato osservabile del messaggio (created -> rendered -> enriched)
    pub fn state(&self) -> MessageState {
        if self.html == HTML_PLACEHOLDER {
            MessageState::Created
        } else if crate::enrich::is_enriched(&self.html) {
            MessageState::Enriched
        } else {
            MessageState::Rendered
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Created,
    Rendered,
    Enriched,
}

/// Dati per creare un nuovo messaggio (senza id, timestamp e html assegnati dallo store)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub source: String,
    pub author_id: i64,
}
