use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tera::Context;

use super::{redirect, render, AppState};
use crate::auth::{self, Level};
use crate::db::{DbError, NewUser};
use crate::error::AppError;
use crate::form::{FormErrors, LoginForm, RegistrationForm};

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

pub async fn login_page(
    session: Session,
    state: web::Data<AppState>,
    query: web::Query<NextQuery>,
) -> Result<HttpResponse, AppError> {
    let user = auth::current_user(&session, &state.db).await?;
    let next = auth::safe_next(query.next.as_deref());
    render(&session, user.as_ref(), "accounts/login.html", login_context("", next))
}

pub async fn login(
    session: Session,
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let next = auth::safe_next(form.next.as_deref()).to_owned();

    if form.clean().is_ok() {
        if let Some(user) = auth::authenticate(&state.db, &form.username, &form.password).await? {
            auth::login(&session, &user)?;
            auth::flash(&session, Level::Success, "Pomyślnie zalogowano.")?;
            log::info!("User {user} logged in");
            return Ok(redirect(&next));
        }
    }

    log::info!("Failed login attempt for `{}`", form.username);
    auth::flash(&session, Level::Error, "Nieprawidłowe dane logowania.")?;
    render(&session, None, "accounts/login.html", login_context(&form.username, &next))
}

fn login_context(username: &str, next: &str) -> Context {
    let mut context = Context::new();
    context.insert("username", username);
    context.insert("next", next);
    context
}

pub async fn register_page(session: Session, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = auth::current_user(&session, &state.db).await?;
    render(
        &session,
        user.as_ref(),
        "accounts/register.html",
        register_context(&RegistrationForm::default(), &FormErrors::default()),
    )
}

pub async fn register(
    session: Session,
    state: web::Data<AppState>,
    form: web::Form<RegistrationForm>,
) -> Result<HttpResponse, AppError> {
    if let Err(errors) = form.clean() {
        return render(&session, None, "accounts/register.html", register_context(&form, &errors));
    }

    let password_hash = auth::hash_password(&form.password1)?;
    let new_user = NewUser {
        username: form.username.trim(),
        email: form.email.trim(),
        password_hash: &password_hash,
        is_staff: false,
    };
    let user = match state.db.create_user(&new_user).await {
        Ok(user) => user,
        Err(DbError::UsernameTaken(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", "Użytkownik o tej nazwie już istnieje.");
            return render(&session, None, "accounts/register.html", register_context(&form, &errors));
        }
        Err(err) => return Err(err.into()),
    };

    auth::login(&session, &user)?;
    auth::flash(&session, Level::Success, "Rejestracja zakończona sukcesem.")?;
    log::info!("New user {user} registered");
    Ok(redirect("/"))
}

fn register_context(form: &RegistrationForm, errors: &FormErrors) -> Context {
    let mut context = Context::new();
    context.insert("username", &form.username);
    context.insert("email", &form.email);
    context.insert("errors", errors);
    context
}

pub async fn logout(session: Session) -> HttpResponse {
    auth::logout(&session);
    redirect("/")
}
