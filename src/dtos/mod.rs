//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod message;
pub mod query;
pub mod ws_event;

pub use message::{CreateMessageDTO, MessageDTO, MessageLinks, UpdateMessageDTO, message_location};
pub use query::{MessageListDTO, MessagesQuery};
pub use ws_event::{ModelEvent, WsEventDTO};
