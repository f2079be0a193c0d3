//! Staff-only management of realizations, appointments and messages.

use actix_session::Session;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tera::Context;
use validator::Validate;

use super::{redirect, render, request_path, AppState};
use crate::auth::{self, Level};
use crate::calendar::MonthGrid;
use crate::db::{Realization, RealizationFilter, User};
use crate::error::AppError;
use crate::export;
use crate::form::{validate, FormErrors, RealizationForm};

const REALIZATIONS_URL: &str = "/admin/realizations/";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .service(
            web::resource("/realizations/")
                .route(web::get().to(realizations))
                .route(web::post().to(realization_action)),
        )
        .service(
            web::resource("/realizations/add/")
                .route(web::get().to(add_realization_page))
                .route(web::post().to(add_realization)),
        )
        .service(
            web::resource("/realizations/{id}/")
                .route(web::get().to(edit_realization_page))
                .route(web::post().to(edit_realization)),
        )
        .route("/realizations/{id}/delete/", web::post().to(delete_realization))
        .route("/realizations/{id}/images/", web::post().to(add_image))
        .route("/realizations/{id}/images/{image_id}/delete/", web::post().to(delete_image))
        .route("/appointments/", web::get().to(appointments))
        .route("/appointments/export/", web::get().to(export_appointments))
        .route("/appointments/{id}/delete/", web::post().to(delete_appointment))
        .route("/messages/", web::get().to(messages));
}

async fn index(req: HttpRequest, session: Session, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    Ok(redirect(REALIZATIONS_URL))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    q: Option<String>,
    year: Option<String>,
    month: Option<String>,
}

impl ListQuery {
    fn year(&self) -> Option<i32> {
        self.year.as_deref().and_then(|year| year.trim().parse().ok())
    }

    fn month(&self) -> Option<u32> {
        self.month.as_deref().and_then(|month| month.trim().parse().ok())
    }

    /// Date filter in the local time of `tz`: a whole month, or a whole year
    /// when only the year is given. Blank or malformed values are ignored.
    fn date_range<Tz: TimeZone>(&self, tz: &Tz) -> Option<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)> {
        let year = self.year()?;
        match self.month() {
            Some(month) => MonthGrid::new(year, month)?.utc_bounds(tz),
            None => {
                let (start, _) = MonthGrid::new(year, 1)?.utc_bounds(tz)?;
                let (end, _) = MonthGrid::new(year.checked_add(1)?, 1)?.utc_bounds(tz)?;
                Some((start, end))
            }
        }
    }
}

async fn realizations(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    render_realizations(&session, &state, &user, &query).await
}

async fn render_realizations(
    session: &Session,
    state: &AppState,
    user: &User,
    query: &ListQuery,
) -> Result<HttpResponse, AppError> {
    let filter = RealizationFilter {
        query: query.q.clone(),
        date_range: query.date_range(state.calendar.tz()),
    };
    let realizations = state.db.search_realizations(&filter).await?;

    let mut context = Context::new();
    context.insert("realizations", &realizations);
    context.insert("q", &query.q.as_deref().unwrap_or_default());
    context.insert("year", &query.year());
    context.insert("month", &query.month());
    render(session, Some(user), "admin/realizations.html", context)
}

/// Bulk actions on the checked rows of the realization list.
async fn realization_action(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;

    // Checkbox lists repeat the `selected` key, so read the raw pairs.
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body).unwrap_or_default();
    let action = pairs
        .iter()
        .find(|(key, _)| key == "action")
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();
    let selected: Vec<i64> = pairs
        .iter()
        .filter(|(key, _)| key == "selected")
        .filter_map(|(_, value)| value.parse().ok())
        .collect();

    match action {
        "export_pdf" => {
            let chosen = state.db.realizations_by_ids(&selected).await?;
            let pdf = export::realizations_pdf(&chosen, state.pdf_font.as_deref())?;
            log::info!("{user} exported {} realizations to PDF", chosen.len());
            Ok(HttpResponse::Ok()
                .content_type("application/pdf")
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", export::PDF_FILENAME),
                ))
                .body(pdf))
        }
        "delete_selected" => {
            let mut deleted = 0;
            for id in &selected {
                if state.db.delete_realization(*id).await? {
                    deleted += 1;
                }
            }
            log::info!("{user} deleted {deleted} realizations");
            auth::flash(&session, Level::Success, &format!("Usunięto realizacje: {deleted}."))?;
            Ok(redirect(REALIZATIONS_URL))
        }
        _ => {
            auth::flash(&session, Level::Error, "Nie wybrano akcji.")?;
            Ok(redirect(REALIZATIONS_URL))
        }
    }
}

async fn add_realization_page(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    render_form(&session, &state, &user, None, &RealizationForm::default(), &FormErrors::default()).await
}

async fn add_realization(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    form: web::Form<RealizationForm>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;

    match form.clean(state.calendar.tz(), Utc::now()) {
        Ok(draft) => {
            let realization = state.db.create_realization(&draft).await?;
            log::info!("{user} added realization {}", realization.id);
            auth::flash(&session, Level::Success, &format!("Dodano realizację „{realization}”."))?;
            Ok(redirect(&format!("{REALIZATIONS_URL}{}/", realization.id)))
        }
        Err(errors) => render_form(&session, &state, &user, None, &form, &errors).await,
    }
}

async fn edit_realization_page(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    let realization = find(&state, *id).await?;
    let form = RealizationForm::from_realization(&realization, state.calendar.tz());
    render_form(&session, &state, &user, Some(&realization), &form, &FormErrors::default()).await
}

async fn edit_realization(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    id: web::Path<i64>,
    form: web::Form<RealizationForm>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    let realization = find(&state, *id).await?;

    match form.clean(state.calendar.tz(), realization.date) {
        Ok(draft) => {
            state.db.update_realization(realization.id, &draft).await?;
            log::info!("{user} updated realization {}", realization.id);
            auth::flash(&session, Level::Success, &format!("Zapisano realizację „{}”.", draft.title))?;
            Ok(redirect(REALIZATIONS_URL))
        }
        Err(errors) => render_form(&session, &state, &user, Some(&realization), &form, &errors).await,
    }
}

async fn delete_realization(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    let realization = find(&state, *id).await?;

    state.db.delete_realization(realization.id).await?;
    log::info!("{user} deleted realization {}", realization.id);
    auth::flash(&session, Level::Success, &format!("Usunięto realizację „{realization}”."))?;
    Ok(redirect(REALIZATIONS_URL))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ImageForm {
    #[validate(length(min = 1, max = 255, message = "Podaj ścieżkę obrazu (maksymalnie 255 znaków)."))]
    image: String,
}

async fn add_image(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    id: web::Path<i64>,
    form: web::Form<ImageForm>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    let realization = find(&state, *id).await?;

    let errors = validate(&*form);
    if !errors.is_empty() {
        let edit = RealizationForm::from_realization(&realization, state.calendar.tz());
        return render_form(&session, &state, &user, Some(&realization), &edit, &errors).await;
    }

    state
        .db
        .add_realization_image(realization.id, form.image.trim())
        .await?;
    log::info!("{user} added an image to realization {}", realization.id);
    Ok(redirect(&format!("{REALIZATIONS_URL}{}/", realization.id)))
}

async fn delete_image(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    let (realization_id, image_id) = path.into_inner();

    if !state.db.delete_realization_image(realization_id, image_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(redirect(&format!("{REALIZATIONS_URL}{realization_id}/")))
}

async fn find(state: &AppState, id: i64) -> Result<Realization, AppError> {
    state.db.realization(id).await?.ok_or(AppError::NotFound)
}

async fn render_form(
    session: &Session,
    state: &AppState,
    user: &User,
    realization: Option<&Realization>,
    form: &RealizationForm,
    errors: &FormErrors,
) -> Result<HttpResponse, AppError> {
    let images = match realization {
        Some(realization) => state.db.realization_images(realization.id).await?,
        None => Vec::new(),
    };

    let mut context = Context::new();
    context.insert("realization", &realization);
    context.insert("images", &images);
    context.insert("title", &form.title);
    context.insert("content", &form.content);
    context.insert("date", &form.date);
    context.insert("image", &form.image);
    context.insert("errors", errors);
    render(session, Some(user), "admin/realization_form.html", context)
}

async fn appointments(req: HttpRequest, session: Session, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    let appointments = state.db.all_appointments().await?;

    let mut context = Context::new();
    context.insert("appointments", &appointments);
    render(&session, Some(&user), "admin/appointments.html", context)
}

async fn export_appointments(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    let appointments = state.db.all_appointments().await?;
    let csv = export::appointments_csv(&appointments)?;
    log::info!("{user} exported {} appointments to CSV", appointments.len());

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::CSV_FILENAME),
        ))
        .body(csv))
}

async fn delete_appointment(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    if !state.db.delete_appointment(*id).await? {
        return Err(AppError::NotFound);
    }
    log::info!("{user} deleted appointment {id}");
    auth::flash(&session, Level::Success, "Usunięto wizytę.")?;
    Ok(redirect("/admin/appointments/"))
}

async fn messages(req: HttpRequest, session: Session, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = auth::staff_required(&session, &state.db, &request_path(&req)).await?;
    let messages = state.db.all_messages().await?;

    let mut context = Context::new();
    context.insert("inbox", &messages);
    render(&session, Some(&user), "admin/messages.html", context)
}
