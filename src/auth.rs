//! Password hashing, the logged-in user in the session, and one-shot flash
//! messages.

use actix_session::Session;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::db::{Database, User};
use crate::error::AppError;

const USER_ID_KEY: &str = "user_id";
const MESSAGES_KEY: &str = "messages";

pub const LOGIN_URL: &str = "/accounts/login/";

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `false` for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

/// Checks the credentials and returns the matching user.
pub async fn authenticate(db: &Database, username: &str, password: &str) -> Result<Option<User>, AppError> {
    let user = db.user_by_username(username.trim()).await?;
    Ok(user.filter(|user| verify_password(password, &user.password_hash)))
}

pub fn login(session: &Session, user: &User) -> Result<(), AppError> {
    session.renew();
    session.insert(USER_ID_KEY, user.id)?;
    Ok(())
}

pub fn logout(session: &Session) {
    session.purge();
}

/// The user stored in the session. A stale id (deleted user) reads as
/// anonymous.
pub async fn current_user(session: &Session, db: &Database) -> Result<Option<User>, AppError> {
    match session.get::<i64>(USER_ID_KEY)? {
        Some(id) => Ok(db.user(id).await?),
        None => Ok(None),
    }
}

/// The logged-in user, or a redirect to the login page that returns to `path`.
pub async fn login_required(session: &Session, db: &Database, path: &str) -> Result<User, AppError> {
    current_user(session, db)
        .await?
        .ok_or_else(|| AppError::LoginRequired {
            next: path.to_owned(),
        })
}

/// Like [`login_required`], but logged-in non-staff users are refused.
pub async fn staff_required(session: &Session, db: &Database, path: &str) -> Result<User, AppError> {
    let user = login_required(session, db, path).await?;
    if user.is_staff {
        Ok(user)
    } else {
        log::warn!("User {} tried to open {path} without staff rights", user.username);
        Err(AppError::Forbidden)
    }
}

/// `/accounts/login/?next=<path>`.
pub fn login_url(next: &str) -> String {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => format!("{LOGIN_URL}?{query}"),
        Err(_) => LOGIN_URL.to_owned(),
    }
}

/// Only same-site absolute paths are followed after login.
///
/// Browsers read `/\host` like `//host`, so a backslash after the leading
/// slash is refused too, as is any control character.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => "/",
    }
}

fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/' | '\\'))
        && !path.chars().any(char::is_control)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub text: String,
}

pub fn flash(session: &Session, level: Level, text: &str) -> Result<(), AppError> {
    let mut messages = session.get::<Vec<Flash>>(MESSAGES_KEY)?.unwrap_or_default();
    messages.push(Flash {
        level,
        text: text.to_owned(),
    });
    session.insert(MESSAGES_KEY, messages)?;
    Ok(())
}

/// Returns and clears the pending flash messages.
pub fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove_as::<Vec<Flash>>(MESSAGES_KEY) {
        Some(Ok(messages)) => messages,
        Some(Err(_)) | None => Vec::new(),
    }
}
