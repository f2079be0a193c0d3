use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::{now, Database, DbError};

/// A visitor's comment under a realization, with the author's username.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: i64,
    pub realization_id: i64,
    pub author_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    pub async fn create_comment(
        &self,
        realization_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<i64, DbError> {
        let id = sqlx::query(
            "INSERT INTO comments (realization_id, author_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(realization_id)
        .bind(author_id)
        .bind(content)
        .bind(now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    /// Comments of one realization, oldest first.
    pub async fn comments_for(&self, realization_id: i64) -> Result<Vec<Comment>, DbError> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT c.id, c.realization_id, c.author_id, u.username AS author, c.content, c.created_at
             FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.realization_id = ?
             ORDER BY c.created_at, c.id",
        )
        .bind(realization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}
