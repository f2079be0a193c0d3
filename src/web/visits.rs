//! The appointment calendar and the message box of logged-in users.

use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Datelike, Utc};
use tera::Context;

use super::{redirect, render, request_path, AppState};
use crate::auth;
use crate::calendar::MonthGrid;
use crate::db::User;
use crate::error::AppError;
use crate::form::{AppointmentForm, FormErrors, MessageForm};
use crate::mail;

pub async fn appointment(session: Session, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = auth::current_user(&session, &state.db).await?;
    render_appointment(&session, &state, user.as_ref(), &AppointmentForm::default(), &FormErrors::default()).await
}

pub async fn book_appointment(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    form: web::Form<AppointmentForm>,
) -> Result<HttpResponse, AppError> {
    let user = auth::login_required(&session, &state.db, &request_path(&req)).await?;

    let request = match form.clean(state.calendar.tz(), Utc::now()) {
        Ok(request) => request,
        Err(errors) => {
            log::info!("Appointment form rejected: {errors:?}");
            return render_appointment(&session, &state, Some(&user), &form, &errors).await;
        }
    };

    let appointment = state
        .db
        .create_appointment(&request.description, request.date)
        .await?;
    let emails = mail::appointment_emails(
        &state.settings.email,
        &user.email,
        &appointment.description,
        appointment.date,
        state.calendar.tz(),
    );
    for email in emails {
        state.mailer.send(email).await?;
    }
    log::info!(
        "Appointment {} booked by {user} for {} ({})",
        appointment.id,
        appointment.date,
        appointment.description
    );

    Ok(redirect("/wizyta/"))
}

/// The form with the calendar of the current month.
async fn render_appointment(
    session: &Session,
    state: &AppState,
    user: Option<&User>,
    form: &AppointmentForm,
    errors: &FormErrors,
) -> Result<HttpResponse, AppError> {
    let today = Utc::now().with_timezone(state.calendar.tz());
    let (year, month) = (today.year(), today.month());

    let calendar = month_calendar(state, year, month).await?;

    let mut context = Context::new();
    context.insert("calendar", &calendar);
    context.insert("current_year", &year);
    context.insert("current_month", &month);
    context.insert("description", &form.description);
    context.insert("date", &form.date);
    context.insert("errors", errors);
    render(session, user, "appointment.html", context)
}

/// Reads the appointments of one month in a single query and renders them.
async fn month_calendar(state: &AppState, year: i32, month: u32) -> Result<String, AppError> {
    let unavailable = || AppError::Calendar { year, month };
    let grid = MonthGrid::new(year, month).ok_or_else(unavailable)?;
    let (start, end) = grid.utc_bounds(state.calendar.tz()).ok_or_else(unavailable)?;

    let appointments = state.db.appointments_between(start, end).await?;
    state
        .calendar
        .render_month(year, month, &appointments)
        .ok_or_else(unavailable)
}

pub async fn messages(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = auth::login_required(&session, &state.db, &request_path(&req)).await?;
    render_messages(&session, &state, &user, "", &FormErrors::default()).await
}

pub async fn send_message(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    form: web::Form<MessageForm>,
) -> Result<HttpResponse, AppError> {
    let user = auth::login_required(&session, &state.db, &request_path(&req)).await?;

    match form.clean() {
        Ok(content) => {
            state.db.create_message(user.id, content).await?;
            log::info!("Message sent by {user}");
            Ok(redirect("/wiadomosc/"))
        }
        Err(errors) => {
            log::info!("Message form rejected: {errors:?}");
            render_messages(&session, &state, &user, &form.content, &errors).await
        }
    }
}

async fn render_messages(
    session: &Session,
    state: &AppState,
    user: &User,
    content: &str,
    errors: &FormErrors,
) -> Result<HttpResponse, AppError> {
    let sent = state.db.messages_by_author(user.id).await?;

    let mut context = Context::new();
    context.insert("sent", &sent);
    context.insert("content", content);
    context.insert("errors", errors);
    render(session, Some(user), "message.html", context)
}
