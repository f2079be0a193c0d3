use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::{stored_time, Database, DbError};
use crate::calendar::Scheduled;

/// A requested visit.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl Scheduled for Appointment {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl Database {
    pub async fn create_appointment(
        &self,
        description: &str,
        date: DateTime<Utc>,
    ) -> Result<Appointment, DbError> {
        let date = stored_time(date);
        let id = sqlx::query("INSERT INTO appointments (description, date) VALUES (?, ?)")
            .bind(description)
            .bind(date)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Appointment {
            id,
            description: description.to_owned(),
            date,
        })
    }

    /// Appointments with `start <= date < end`, earliest first.
    pub async fn appointments_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, DbError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT id, description, date FROM appointments WHERE date >= ? AND date < ? ORDER BY date, id",
        )
        .bind(stored_time(start))
        .bind(stored_time(end))
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    /// Every appointment, latest first.
    pub async fn all_appointments(&self) -> Result<Vec<Appointment>, DbError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT id, description, date FROM appointments ORDER BY date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    pub async fn delete_appointment(&self, id: i64) -> Result<bool, DbError> {
        let done = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
