//! HTTP layer: routes, shared state and page rendering helpers.

mod accounts;
mod admin;
mod blog;
mod pages;
mod visits;

use std::fs;
use std::sync::Arc;

use actix_files::Files;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::http::header;
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::Local;
use tera::Context;

use crate::auth;
use crate::calendar::CalendarRenderer;
use crate::config::Settings;
use crate::db::{Database, User};
use crate::error::AppError;
use crate::mail::Mailer;
use crate::templates;

/// Font embedded in the PDF report when present in the static directory.
const PDF_FONT_FILE: &str = "calibri.ttf";

pub struct AppState {
    pub db: Database,
    pub mailer: Arc<dyn Mailer>,
    pub settings: Settings,
    pub calendar: CalendarRenderer<Local>,
    pub pdf_font: Option<Vec<u8>>,
}

impl AppState {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>, settings: Settings) -> Self {
        let font_path = settings.static_dir.join(PDF_FONT_FILE);
        let pdf_font = fs::read(&font_path).ok();
        if pdf_font.is_none() {
            log::debug!("{} not found, PDF export uses the bundled DejaVu Sans", font_path.display());
        }

        Self {
            db,
            mailer,
            calendar: CalendarRenderer::new(Local, settings.calendar_visibility),
            settings,
            pdf_font,
        }
    }
}

/// Registers every page route. Static files and sessions are added by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(pages::index))
        .route("/blog/", web::get().to(blog::list))
        .service(
            web::resource("/blog/{id}/")
                .route(web::get().to(blog::detail))
                .route(web::post().to(blog::comment)),
        )
        .service(
            web::resource("/wizyta/")
                .route(web::get().to(visits::appointment))
                .route(web::post().to(visits::book_appointment)),
        )
        .service(
            web::resource("/wiadomosc/")
                .route(web::get().to(visits::messages))
                .route(web::post().to(visits::send_message)),
        )
        .service(
            web::resource("/kontakt/")
                .route(web::get().to(pages::contact))
                .route(web::post().to(pages::send_contact)),
        )
        .service(
            web::scope("/accounts")
                .service(
                    web::resource("/login/")
                        .route(web::get().to(accounts::login_page))
                        .route(web::post().to(accounts::login)),
                )
                .service(
                    web::resource("/register/")
                        .route(web::get().to(accounts::register_page))
                        .route(web::post().to(accounts::register)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(accounts::logout))
                        .route(web::post().to(accounts::logout)),
                ),
        )
        .service(web::scope("/admin").configure(admin::configure));
}

pub fn session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("budowlanka_session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Fallback for unknown paths.
pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound)
}

pub async fn start_server(state: AppState) -> std::io::Result<()> {
    let key = match &state.settings.secret_key {
        Some(secret) => Key::derive_from(secret),
        None => {
            log::warn!("SECRET_KEY is not set, sessions will not survive a restart");
            Key::generate()
        }
    };
    let address = state.settings.address;
    let static_dir = state.settings.static_dir.clone();
    let media_dir = state.settings.media_dir.clone();
    let state = web::Data::new(state);

    log::info!("Starting web server on http://{address}");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(session_middleware(key.clone()))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", &static_dir))
            .service(Files::new("/media", &media_dir))
            .configure(configure)
            .default_service(web::to(not_found))
    })
    .bind(address)?
    .run()
    .await
}

/// Path and query of the request, used as the `next` target after login.
fn request_path(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map_or_else(|| req.path().to_owned(), ToString::to_string)
}

/// Renders `name` inside the site layout, consuming pending flash messages.
fn render(session: &Session, user: Option<&User>, name: &str, context: Context) -> Result<HttpResponse, AppError> {
    let messages = auth::take_flashes(session);
    let body = templates::render(name, &templates::page_context(context, user, &messages))?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}
