//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! Questo modulo contiene tutti i componenti "core" dell'applicazione:
//! - Configurazione
//! - Pool del database e migrations
//! - Gestione errori
//! - Stato applicazione

pub mod config;
pub mod database;
pub mod error;
pub mod state;

// Re-exports per facilitare l'import
pub use config::Config;
pub use error::{AppError, FetchError, PipelineError};
pub use state::AppState;
