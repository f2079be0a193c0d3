use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::{stored_time, Database, DbError};

/// A portfolio entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Realization {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
}

impl fmt::Display for Realization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// An additional picture attached to a realization.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RealizationImage {
    pub id: i64,
    pub realization_id: i64,
    pub image: String,
}

/// Field values for creating or updating a realization.
#[derive(Debug, Clone)]
pub struct RealizationDraft {
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
}

/// Admin list narrowing: free-text search and a date range.
#[derive(Debug, Clone, Default)]
pub struct RealizationFilter {
    pub query: Option<String>,
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

const SELECT_REALIZATIONS: &str = "SELECT id, title, content, date, image FROM realizations";

impl Database {
    pub async fn create_realization(&self, draft: &RealizationDraft) -> Result<Realization, DbError> {
        let id = sqlx::query("INSERT INTO realizations (title, content, date, image) VALUES (?, ?, ?, ?)")
            .bind(&draft.title)
            .bind(&draft.content)
            .bind(stored_time(draft.date))
            .bind(&draft.image)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Realization {
            id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            date: stored_time(draft.date),
            image: draft.image.clone(),
        })
    }

    /// Returns `false` when no realization has that id.
    pub async fn update_realization(&self, id: i64, draft: &RealizationDraft) -> Result<bool, DbError> {
        let done = sqlx::query("UPDATE realizations SET title = ?, content = ?, date = ?, image = ? WHERE id = ?")
            .bind(&draft.title)
            .bind(&draft.content)
            .bind(stored_time(draft.date))
            .bind(&draft.image)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Deletes the realization together with its images and comments.
    pub async fn delete_realization(&self, id: i64) -> Result<bool, DbError> {
        let done = sqlx::query("DELETE FROM realizations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn realization(&self, id: i64) -> Result<Option<Realization>, DbError> {
        let realization = sqlx::query_as::<_, Realization>(&format!("{SELECT_REALIZATIONS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(realization)
    }

    pub async fn count_realizations(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM realizations")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// One page of realizations, newest first.
    pub async fn realizations_page(&self, offset: u64, limit: u64) -> Result<Vec<Realization>, DbError> {
        let realizations = sqlx::query_as::<_, Realization>(&format!(
            "{SELECT_REALIZATIONS} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(realizations)
    }

    /// Realizations matching `filter`, newest first. The query matches title
    /// or content case-insensitively.
    pub async fn search_realizations(&self, filter: &RealizationFilter) -> Result<Vec<Realization>, DbError> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_REALIZATIONS);
        builder.push(" WHERE 1 = 1");

        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", escape_like(query));
            builder
                .push(r" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR content LIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\')");
        }
        if let Some((start, end)) = filter.date_range {
            builder
                .push(" AND date >= ")
                .push_bind(stored_time(start))
                .push(" AND date < ")
                .push_bind(stored_time(end));
        }
        builder.push(" ORDER BY date DESC, id DESC");

        let realizations = builder
            .build_query_as::<Realization>()
            .fetch_all(&self.pool)
            .await?;
        Ok(realizations)
    }

    /// The realizations with the given ids, newest first. Unknown ids are skipped.
    pub async fn realizations_by_ids(&self, ids: &[i64]) -> Result<Vec<Realization>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_REALIZATIONS);
        builder.push(" WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY date DESC, id DESC");

        let realizations = builder
            .build_query_as::<Realization>()
            .fetch_all(&self.pool)
            .await?;
        Ok(realizations)
    }

    pub async fn realization_images(&self, realization_id: i64) -> Result<Vec<RealizationImage>, DbError> {
        let images = sqlx::query_as::<_, RealizationImage>(
            "SELECT id, realization_id, image FROM realization_images WHERE realization_id = ? ORDER BY id",
        )
        .bind(realization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    pub async fn add_realization_image(&self, realization_id: i64, image: &str) -> Result<RealizationImage, DbError> {
        let id = sqlx::query("INSERT INTO realization_images (realization_id, image) VALUES (?, ?)")
            .bind(realization_id)
            .bind(image)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(RealizationImage {
            id,
            realization_id,
            image: image.to_owned(),
        })
    }

    /// Removes an image only if it belongs to `realization_id`.
    pub async fn delete_realization_image(&self, realization_id: i64, image_id: i64) -> Result<bool, DbError> {
        let done = sqlx::query("DELETE FROM realization_images WHERE id = ? AND realization_id = ?")
            .bind(image_id)
            .bind(realization_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
