//! MessageRepository - Repository per la gestione dei messaggi

use super::MessageStore;
use crate::entities::{HTML_PLACEHOLDER, Message, NewMessage};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Error, SqlitePool};

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn create(&self, data: &NewMessage) -> Result<Message, Error> {
        let now = Utc::now().timestamp();
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (created_at, updated_at, source, html, author_id)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, created_at, updated_at, source, html, author_id
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(&data.source)
        .bind(HTML_PLACEHOLDER)
        .bind(data.author_id)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok(message)
    }

    async fn load(&self, id: i64) -> Result<Option<Message>, Error> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, created_at, updated_at, source, html, author_id
            FROM messages
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(message)
    }

    async fn save(&self, message: &Message) -> Result<Message, Error> {
        // MAX() garantisce updated_at monotono anche se l'orologio torna indietro
        sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
            SET source = ?, html = ?, updated_at = MAX(updated_at, ?)
            WHERE id = ?
            RETURNING id, created_at, updated_at, source, html, author_id
            "#,
        )
        .bind(&message.source)
        .bind(&message.html)
        .bind(Utc::now().timestamp())
        .bind(message.id)
        .fetch_optional(&self.connection_pool)
        .await?
        .ok_or(Error::RowNotFound)
    }

    async fn save_source(&self, id: i64, source: &str) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
            SET source = ?, updated_at = MAX(updated_at, ?)
            WHERE id = ?
            RETURNING id, created_at, updated_at, source, html, author_id
            "#,
        )
        .bind(source)
        .bind(Utc::now().timestamp())
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?
        .ok_or(Error::RowNotFound)
    }

    async fn save_html(
        &self,
        id: i64,
        rendered_source: &str,
        html: &str,
    ) -> Result<Option<Message>, Error> {
        // confronto e scrittura nella stessa UPDATE: nessuna finestra tra i due
        let message = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
            SET html = ?, updated_at = MAX(updated_at, ?)
            WHERE id = ? AND source = ?
            RETURNING id, created_at, updated_at, source, html, author_id
            "#,
        )
        .bind(html)
        .bind(Utc::now().timestamp())
        .bind(id)
        .bind(rendered_source)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(message)
    }

    async fn list_updated_since(&self, since: i64) -> Result<Vec<Message>, Error> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, created_at, updated_at, source, html, author_id
            FROM messages
            WHERE updated_at >= ?
            ORDER BY updated_at ASC, id ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(messages)
    }
}
