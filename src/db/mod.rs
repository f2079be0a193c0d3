//! SQLite persistence for users, realizations, comments, messages and
//! appointments.

mod appointments;
mod comments;
mod messages;
mod realizations;
mod users;

use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

pub use appointments::Appointment;
pub use comments::Comment;
pub use messages::Message;
pub use realizations::{Realization, RealizationDraft, RealizationFilter, RealizationImage};
pub use users::{NewUser, User};

const SCHEMA: [&str; 7] = [
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        is_staff BOOLEAN NOT NULL DEFAULT 0,
        date_joined TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS realizations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        date TEXT NOT NULL,
        image TEXT
    )",
    "CREATE TABLE IF NOT EXISTS realization_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        realization_id INTEGER NOT NULL REFERENCES realizations(id) ON DELETE CASCADE,
        image TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        realization_id INTEGER NOT NULL REFERENCES realizations(id) ON DELETE CASCADE,
        author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        date TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS appointments_date ON appointments(date)",
];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
}

/// Shared handle to the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let database = Self {
            pool: pool_options.connect_with(options).await?,
        };
        database.migrate().await?;
        Ok(database)
    }

    pub async fn in_memory() -> Result<Self, DbError> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> Result<(), DbError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Timestamps are stored with whole-second precision so text comparison in
/// SQL matches chronological order.
pub fn stored_time(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(0)
}

pub fn now() -> DateTime<Utc> {
    stored_time(Utc::now())
}
