use actix_session::{SessionGetError, SessionInsertError};
use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use tera::Context;
use thiserror::Error;

use crate::auth;
use crate::db::DbError;
use crate::export::ExportError;
use crate::mail::MailError;
use crate::templates;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Nie znaleziono strony.")]
    NotFound,
    #[error("Brak dostępu do tej strony.")]
    Forbidden,
    #[error("login required to open {next}")]
    LoginRequired { next: String },
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("mail error: {0}")]
    Mail(#[from] MailError),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("session error: {0}")]
    Session(String),
    #[error("password error: {0}")]
    Password(String),
    #[error("calendar for {year}-{month:02} cannot be rendered")]
    Calendar { year: i32, month: u32 },
}

impl From<SessionGetError> for AppError {
    fn from(err: SessionGetError) -> Self {
        Self::Session(err.to_string())
    }
}

impl From<SessionInsertError> for AppError {
    fn from(err: SessionInsertError) -> Self {
        Self::Session(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Password(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::LoginRequired { .. } => StatusCode::FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::LoginRequired { next } = self {
            return HttpResponse::Found()
                .insert_header((header::LOCATION, auth::login_url(next)))
                .finish();
        }

        let status = self.status_code();
        let template = match self {
            Self::NotFound => "404.html",
            Self::Forbidden => "403.html",
            _ => {
                log::error!("Request failed: {self}");
                "error.html"
            }
        };

        let mut context = Context::new();
        context.insert("error", &self.to_string());
        match templates::render(template, &templates::anonymous(context)) {
            Ok(body) => HttpResponse::build(status)
                .content_type("text/html; charset=utf-8")
                .body(body),
            Err(err) => {
                log::error!("Could not render {template}: {err}");
                HttpResponse::build(status).body(self.to_string())
            }
        }
    }
}
