use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web as actix, App};
use budowlanka::auth;
use budowlanka::config::Settings;
use budowlanka::db::{Database, NewUser, RealizationDraft, User};
use budowlanka::mail::MemoryMailer;
use budowlanka::web::{self, AppState};
use chrono::{Duration, TimeZone, Utc};

const SESSION_COOKIE: &str = "budowlanka_session";

struct TestSite {
    state: actix::Data<AppState>,
    mailer: Arc<MemoryMailer>,
}

impl TestSite {
    async fn new() -> Self {
        let mut settings = Settings::default();
        settings.email.default_from = "biuro@budowlanka.pl".to_owned();
        let db = Database::in_memory().await.unwrap();
        let mailer = Arc::new(MemoryMailer::default());
        let state = actix::Data::new(AppState::new(db, mailer.clone(), settings));
        Self { state, mailer }
    }

    fn db(&self) -> &Database {
        &self.state.db
    }

    async fn user(&self, username: &str, password: &str, is_staff: bool) -> User {
        let hash = auth::hash_password(password).unwrap();
        self.db()
            .create_user(&NewUser {
                username,
                email: &format!("{username}@example.com"),
                password_hash: &hash,
                is_staff,
            })
            .await
            .unwrap()
    }

    async fn realization(&self, title: &str, minutes: i64) -> i64 {
        let draft = RealizationDraft {
            title: title.to_owned(),
            content: format!("{title} content"),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes),
            image: None,
        };
        self.db().create_realization(&draft).await.unwrap().id
    }
}

macro_rules! site_app {
    ($site:expr) => {
        test::init_service(
            App::new()
                .app_data($site.state.clone())
                .wrap(web::session_middleware(Key::generate()))
                .configure(web::configure)
                .default_service(actix::to(web::not_found)),
        )
        .await
    };
}

fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.into_owned())
}

fn location<B>(resp: &ServiceResponse<B>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

async fn body_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

/// Logs in through the form and returns the session cookie.
macro_rules! login {
    ($app:expr, $username:expr, $password:expr) => {{
        let req = test::TestRequest::post()
            .uri("/accounts/login/")
            .set_form([("username", $username), ("password", $password)])
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "login as {} failed", $username);
        session_cookie(&resp).unwrap()
    }};
}

#[actix_web::test]
async fn home_page_renders() {
    let site = TestSite::new().await;
    let app = site_app!(site);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Budowlanka"));
}

#[actix_web::test]
async fn blog_lists_ten_per_page() {
    let site = TestSite::new().await;
    for i in 0..15 {
        site.realization(&format!("Test Title {i}"), i).await;
    }
    let app = site_app!(site);

    for (uri, expected) in [("/blog/", 10), ("/blog/?page=1", 10), ("/blog/?page=2", 5), ("/blog/?page=9", 5)] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert_eq!(body.matches(r#"<article class="entry">"#).count(), expected, "{uri}");
    }

    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog/").to_request()).await;
    let body = body_text(resp).await;
    assert!(body.contains("Test Title 14"));
    assert!(body.contains("Strona 1 z 2"));
}

#[actix_web::test]
async fn detail_requires_login() {
    let site = TestSite::new().await;
    let id = site.realization("Test Title", 0).await;
    site.user("testuser", "password", false).await;
    let app = site_app!(site);

    let uri = format!("/blog/{id}/");
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/accounts/login/?next=%2Fblog%2F{id}%2F"));

    let cookie = login!(app, "testuser", "password");
    let req = test::TestRequest::get().uri(&uri).cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Test Title"));

    let req = test::TestRequest::get().uri("/blog/999/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn comments_are_added_to_a_realization() {
    let site = TestSite::new().await;
    let id = site.realization("Test Title", 0).await;
    site.user("testuser", "password", false).await;
    let app = site_app!(site);
    let cookie = login!(app, "testuser", "password");

    let uri = format!("/blog/{id}/");
    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(cookie.clone())
        .set_form([("content", "Świetna robota")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), uri);

    let comments = site.db().comments_for(id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author, "testuser");

    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(cookie)
        .set_form([("content", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(site.db().comments_for(id).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn appointment_page_shows_the_calendar() {
    let site = TestSite::new().await;
    let app = site_app!(site);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/wizyta/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains(r#"<table border="0" cellpadding="0" cellspacing="0" class="calendar">"#));
    assert!(body.contains(r#"<th class="mon">Pon</th>"#));
}

#[actix_web::test]
async fn booked_appointment_is_shown_redacted() {
    let site = TestSite::new().await;
    site.db()
        .create_appointment("Prywatny opis", Utc::now())
        .await
        .unwrap();
    let app = site_app!(site);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/wizyta/").to_request()).await;
    let body = body_text(resp).await;
    assert!(body.contains("<li>Termin zajęty</li>"));
    assert!(!body.contains("Prywatny opis"));
}

#[actix_web::test]
async fn appointment_post_sends_confirmation() {
    let site = TestSite::new().await;
    site.user("testuser", "12345", false).await;
    let app = site_app!(site);
    let cookie = login!(app, "testuser", "12345");
    assert!(site.mailer.outbox().is_empty());

    let req = test::TestRequest::post()
        .uri("/wizyta/")
        .cookie(cookie)
        .set_form([("description", "Testowa wizyta"), ("date", "2024-05-21T10:00:00Z")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/wizyta/");

    let outbox = site.mailer.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].subject, "Potwierdzenie wizyty");
    assert_eq!(outbox[0].to, ["testuser@example.com"]);
    assert!(outbox[0].body.contains("Testowa wizyta"));

    let stored = site.db().all_appointments().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].date, Utc.with_ymd_and_hms(2024, 5, 21, 10, 0, 0).unwrap());
}

#[actix_web::test]
async fn anonymous_appointment_post_goes_to_login() {
    let site = TestSite::new().await;
    let app = site_app!(site);

    let req = test::TestRequest::post()
        .uri("/wizyta/")
        .set_form([("description", "Testowa wizyta"), ("date", "2024-05-21T10:00:00Z")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/accounts/login/?next=%2Fwizyta%2F");
    assert!(site.mailer.outbox().is_empty());
    assert!(site.db().all_appointments().await.unwrap().is_empty());
}

#[actix_web::test]
async fn invalid_appointment_is_rerendered() {
    let site = TestSite::new().await;
    site.user("testuser", "12345", false).await;
    let app = site_app!(site);
    let cookie = login!(app, "testuser", "12345");

    let req = test::TestRequest::post()
        .uri("/wizyta/")
        .cookie(cookie)
        .set_form([("description", ""), ("date", "jutro")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Podaj poprawną datę i godzinę."));
    assert!(site.mailer.outbox().is_empty());
}

#[actix_web::test]
async fn contact_redirects_home_with_a_flash() {
    let site = TestSite::new().await;
    let app = site_app!(site);

    let req = test::TestRequest::post()
        .uri("/kontakt/")
        .set_form([
            ("first_name", "John"),
            ("last_name", "Doe"),
            ("email", "john.doe@example.com"),
            ("message", "Test message"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let cookie = session_cookie(&resp).unwrap();

    let outbox = site.mailer.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].subject, "Wiadomość kontaktowa od John Doe");
    assert_eq!(outbox[0].to, ["biuro@budowlanka.pl"]);

    let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Dziękujemy za wiadomość"));
}

#[actix_web::test]
async fn invalid_contact_form_shows_errors() {
    let site = TestSite::new().await;
    let app = site_app!(site);

    let req = test::TestRequest::post()
        .uri("/kontakt/")
        .set_form([("first_name", ""), ("last_name", ""), ("email", "invalid"), ("message", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Podaj poprawny adres email."));
    assert!(site.mailer.outbox().is_empty());
}

#[actix_web::test]
async fn register_logs_the_user_in() {
    let site = TestSite::new().await;
    let app = site_app!(site);

    let req = test::TestRequest::post()
        .uri("/accounts/register/")
        .set_form([
            ("username", "nowy"),
            ("email", "nowy@example.com"),
            ("password1", "mocnehaslo1"),
            ("password2", "mocnehaslo1"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let cookie = session_cookie(&resp).unwrap();

    let req = test::TestRequest::get().uri("/wiadomosc/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Rejestracja zakończona sukcesem."));
    assert!(body.contains("nowy"));
}

#[actix_web::test]
async fn duplicate_username_is_refused() {
    let site = TestSite::new().await;
    site.user("testuser", "12345", false).await;
    let app = site_app!(site);

    let req = test::TestRequest::post()
        .uri("/accounts/register/")
        .set_form([
            ("username", "testuser"),
            ("email", "x@example.com"),
            ("password1", "mocnehaslo1"),
            ("password2", "mocnehaslo1"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Użytkownik o tej nazwie już istnieje."));
}

#[actix_web::test]
async fn wrong_password_is_reported() {
    let site = TestSite::new().await;
    site.user("testuser", "12345", false).await;
    let app = site_app!(site);

    let req = test::TestRequest::post()
        .uri("/accounts/login/")
        .set_form([("username", "testuser"), ("password", "zle")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Nieprawidłowe dane logowania."));
}

#[actix_web::test]
async fn login_follows_next() {
    let site = TestSite::new().await;
    site.user("testuser", "12345", false).await;
    let app = site_app!(site);

    let req = test::TestRequest::post()
        .uri("/accounts/login/")
        .set_form([("username", "testuser"), ("password", "12345"), ("next", "/wiadomosc/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/wiadomosc/");
}

#[actix_web::test]
async fn login_does_not_follow_offsite_next() {
    let site = TestSite::new().await;
    site.user("testuser", "12345", false).await;
    let app = site_app!(site);

    let req = test::TestRequest::post()
        .uri("/accounts/login/")
        .set_form([("username", "testuser"), ("password", "12345"), ("next", "/\\evil.example")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn messages_are_saved() {
    let site = TestSite::new().await;
    let user = site.user("testuser", "12345", false).await;
    let app = site_app!(site);
    let cookie = login!(app, "testuser", "12345");

    let req = test::TestRequest::post()
        .uri("/wiadomosc/")
        .cookie(cookie)
        .set_form([("content", "Proszę o wycenę")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/wiadomosc/");

    let sent = site.db().messages_by_author(user.id).await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "Proszę o wycenę");
}

#[actix_web::test]
async fn admin_is_for_staff_only() {
    let site = TestSite::new().await;
    site.user("testuser", "12345", false).await;
    let app = site_app!(site);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/admin/realizations/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let cookie = login!(app, "testuser", "12345");
    let req = test::TestRequest::get().uri("/admin/realizations/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_exports_realizations_to_pdf() {
    let site = TestSite::new().await;
    site.user("admin", "admin-password", true).await;
    let first = site.realization("Dach", 0).await;
    let second = site.realization("Kuchnia", 1).await;
    let app = site_app!(site);
    let cookie = login!(app, "admin", "admin-password");

    for payload in [format!("action=export_pdf&selected={first}&selected={second}"), "action=export_pdf".to_owned()] {
        let req = test::TestRequest::post()
            .uri("/admin/realizations/")
            .cookie(cookie.clone())
            .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        assert!(resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains(r#"attachment; filename="database_report.pdf""#));
        assert!(test::read_body(resp).await.starts_with(b"%PDF"));
    }
}

#[actix_web::test]
async fn admin_searches_and_edits_realizations() {
    let site = TestSite::new().await;
    site.user("admin", "admin-password", true).await;
    let id = site.realization("Dach", 0).await;
    site.realization("Kuchnia", 1).await;
    let app = site_app!(site);
    let cookie = login!(app, "admin", "admin-password");

    let req = test::TestRequest::get()
        .uri("/admin/realizations/?q=dach&year=&month=")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Dach"));
    assert!(!body.contains("Kuchnia"));

    let req = test::TestRequest::post()
        .uri(&format!("/admin/realizations/{id}/"))
        .cookie(cookie.clone())
        .set_form([("title", "Nowy dach"), ("content", "Blachodachówka"), ("date", ""), ("image", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let updated = site.db().realization(id).await.unwrap().unwrap();
    assert_eq!(updated.title, "Nowy dach");

    let req = test::TestRequest::post()
        .uri(&format!("/admin/realizations/{id}/images/"))
        .cookie(cookie.clone())
        .set_form([("image", "realizations_images/dach.jpg")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(site.db().realization_images(id).await.unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/admin/realizations/{id}/delete/"))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(site.db().realization(id).await.unwrap().is_none());
}

#[actix_web::test]
async fn admin_exports_appointments_to_csv() {
    let site = TestSite::new().await;
    site.user("admin", "admin-password", true).await;
    site.db()
        .create_appointment("Pomiar", Utc.with_ymd_and_hms(2024, 5, 21, 10, 0, 0).unwrap())
        .await
        .unwrap();
    let app = site_app!(site);
    let cookie = login!(app, "admin", "admin-password");

    let req = test::TestRequest::get()
        .uri("/admin/appointments/export/")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("appointments.csv"));
    let body = body_text(resp).await;
    assert!(body.starts_with("id,date,description\n"));
    assert!(body.contains("Pomiar"));
}

#[actix_web::test]
async fn unknown_paths_are_404() {
    let site = TestSite::new().await;
    let app = site_app!(site);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/nie-ma/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_text(resp).await.contains("Nie znaleziono strony."));
}
