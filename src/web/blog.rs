use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tera::Context;

use super::{redirect, render, request_path, AppState};
use crate::auth;
use crate::db::{Realization, User};
use crate::error::AppError;
use crate::form::{CommentForm, FormErrors};
use crate::pagination::Page;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

/// Realizations newest first, `PAGE_SIZE` per page.
pub async fn list(
    session: Session,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let user = auth::current_user(&session, &state.db).await?;

    let count = state.db.count_realizations().await?;
    let page = Page::get(count, u64::from(state.settings.page_size), query.page.as_deref());
    let entries = state.db.realizations_page(page.offset(), page.per_page).await?;
    log::debug!("Blog page {} of {} ({} entries)", page.number, page.num_pages, entries.len());

    let mut context = Context::new();
    context.insert("page_obj", &page);
    context.insert("entries", &entries);
    render(&session, user.as_ref(), "blog.html", context)
}

pub async fn detail(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = auth::login_required(&session, &state.db, &request_path(&req)).await?;
    let entry = find(&state, *id).await?;
    render_detail(&session, &state, &user, &entry, "", &FormErrors::default()).await
}

pub async fn comment(
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
    id: web::Path<i64>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse, AppError> {
    let user = auth::login_required(&session, &state.db, &request_path(&req)).await?;
    let entry = find(&state, *id).await?;

    match form.clean() {
        Ok(content) => {
            state.db.create_comment(entry.id, user.id, content).await?;
            log::info!("New comment by {user} on realization {}", entry.id);
            Ok(redirect(&format!("/blog/{}/", entry.id)))
        }
        Err(errors) => render_detail(&session, &state, &user, &entry, &form.content, &errors).await,
    }
}

async fn find(state: &AppState, id: i64) -> Result<Realization, AppError> {
    state.db.realization(id).await?.ok_or_else(|| {
        log::warn!("Realization {id} does not exist");
        AppError::NotFound
    })
}

async fn render_detail(
    session: &Session,
    state: &AppState,
    user: &User,
    entry: &Realization,
    comment: &str,
    errors: &FormErrors,
) -> Result<HttpResponse, AppError> {
    let images = state.db.realization_images(entry.id).await?;
    let comments = state.db.comments_for(entry.id).await?;

    let mut context = Context::new();
    context.insert("entry", entry);
    context.insert("images", &images);
    context.insert("comments", &comments);
    context.insert("comment", comment);
    context.insert("errors", errors);
    render(session, Some(user), "detail.html", context)
}
