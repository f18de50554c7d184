//! Common repository traits
//!
//! This module defines the storage interface the enrichment pipeline reads and writes through.

use crate::entities::{Message, NewMessage};
use async_trait::async_trait;

/// Durable record of messages keyed by id
///
/// The pipeline does not own the schema: any backend implementing this trait can be
/// injected in [`crate::AppState`]. Errors are always fatal for the calling operation,
/// the core never retries them.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Creates a new message with the html placeholder
    ///
    /// # Arguments
    /// * `data` - source and author of the message (without ID)
    ///
    /// # Returns
    /// * `Ok(Message)` - Created message with ID and timestamps assigned by the store
    /// * `Err(sqlx::Error)` - Error during insertion
    async fn create(&self, data: &NewMessage) -> Result<Message, sqlx::Error>;

    /// Reads a message by its primary key
    ///
    /// # Returns
    /// * `Ok(Some(Message))` - Message found
    /// * `Ok(None)` - No message with that ID (e.g. deleted concurrently)
    /// * `Err(sqlx::Error)` - Error during reading
    async fn load(&self, id: i64) -> Result<Option<Message>, sqlx::Error>;

    /// Persists `source` and `html` of an existing message
    ///
    /// `updated_at` is bumped to the current time and never moves backwards.
    /// `created_at` and `author_id` are never modified.
    ///
    /// # Returns
    /// * `Ok(Message)` - Message as persisted
    /// * `Err(sqlx::Error::RowNotFound)` - The message does not exist anymore
    async fn save(&self, message: &Message) -> Result<Message, sqlx::Error>;

    /// Persists only the `source` of a message, leaving `html` untouched
    ///
    /// Used by the edit endpoint: the derived `html` belongs to the pipeline, and writing
    /// back a previously loaded copy would revert a render saved in the meantime.
    ///
    /// # Returns
    /// * `Ok(Message)` - Message as persisted
    /// * `Err(sqlx::Error::RowNotFound)` - The message does not exist anymore
    async fn save_source(&self, id: i64, source: &str) -> Result<Message, sqlx::Error>;

    /// Persists the derived `html` only if `source` is still `rendered_source`
    ///
    /// The pipeline renders from a snapshot of the source: if an edit changed it in the
    /// meantime the html is stale and must not land. Bumps `updated_at` like
    /// [`MessageStore::save`].
    ///
    /// # Returns
    /// * `Ok(Some(Message))` - Message as persisted
    /// * `Ok(None)` - The source changed (or the message is gone): nothing written
    /// * `Err(sqlx::Error)` - Error during update
    async fn save_html(
        &self,
        id: i64,
        rendered_source: &str,
        html: &str,
    ) -> Result<Option<Message>, sqlx::Error>;

    /// Lists messages with `updated_at >= since`, oldest update first
    async fn list_updated_since(&self, since: i64) -> Result<Vec<Message>, sqlx::Error>;
}
