//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene le entità che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod message;

// Re-exports per facilitare l'import
pub use message::{HTML_PLACEHOLDER, Message, MessageState, NewMessage};
