use actix_session::Session;
use actix_web::{web, HttpResponse};
use tera::Context;

use super::{redirect, render, AppState};
use crate::auth::{self, Level};
use crate::error::AppError;
use crate::form::{ContactForm, FormErrors};
use crate::mail;

pub async fn index(session: Session, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = auth::current_user(&session, &state.db).await?;
    render(&session, user.as_ref(), "index.html", Context::new())
}

pub async fn contact(session: Session, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = auth::current_user(&session, &state.db).await?;
    let mut form = ContactForm::default();
    if let Some(user) = &user {
        form.email = user.email.clone();
    }
    render(&session, user.as_ref(), "contact.html", contact_context(&form, &FormErrors::default()))
}

pub async fn send_contact(
    session: Session,
    state: web::Data<AppState>,
    form: web::Form<ContactForm>,
) -> Result<HttpResponse, AppError> {
    let form = match form.clean() {
        Ok(form) => form,
        Err(errors) => {
            log::info!("Contact form rejected: {errors:?}");
            let user = auth::current_user(&session, &state.db).await?;
            return render(&session, user.as_ref(), "contact.html", contact_context(&form, &errors));
        }
    };

    state
        .mailer
        .send(mail::contact_email(&state.settings.email, &form))
        .await?;
    log::info!("Contact message from {} <{}>", form.full_name(), form.email);

    auth::flash(&session, Level::Success, "Dziękujemy za wiadomość, odpowiemy najszybciej jak to możliwe.")?;
    Ok(redirect("/"))
}

fn contact_context(form: &ContactForm, errors: &FormErrors) -> Context {
    let mut context = Context::new();
    context.insert("first_name", &form.first_name);
    context.insert("last_name", &form.last_name);
    context.insert("email", &form.email);
    context.insert("message", &form.message);
    context.insert("errors", errors);
    context
}
