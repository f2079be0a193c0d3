use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::{now, Database, DbError};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: i64,
    pub author_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    pub async fn create_message(&self, author_id: i64, content: &str) -> Result<i64, DbError> {
        let id = sqlx::query("INSERT INTO messages (author_id, content, created_at) VALUES (?, ?, ?)")
            .bind(author_id)
            .bind(content)
            .bind(now())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    /// Messages sent by one user, newest first.
    pub async fn messages_by_author(&self, author_id: i64) -> Result<Vec<Message>, DbError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT m.id, m.author_id, u.username AS author, m.content, m.created_at
             FROM messages m JOIN users u ON u.id = m.author_id
             WHERE m.author_id = ?
             ORDER BY m.created_at DESC, m.id DESC",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// All messages for the staff inbox, newest first.
    pub async fn all_messages(&self) -> Result<Vec<Message>, DbError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT m.id, m.author_id, u.username AS author, m.content, m.created_at
             FROM messages m JOIN users u ON u.id = m.author_id
             ORDER BY m.created_at DESC, m.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}
