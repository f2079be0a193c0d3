//! Page templates, compiled into the binary and rendered with Tera.

use std::sync::OnceLock;

use tera::{Context, Tera};

use crate::auth::Flash;
use crate::db::User;

const TEMPLATES: [(&str, &str); 16] = [
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("blog.html", include_str!("../templates/blog.html")),
    ("detail.html", include_str!("../templates/detail.html")),
    ("appointment.html", include_str!("../templates/appointment.html")),
    ("message.html", include_str!("../templates/message.html")),
    ("contact.html", include_str!("../templates/contact.html")),
    ("error.html", include_str!("../templates/error.html")),
    ("403.html", include_str!("../templates/403.html")),
    ("404.html", include_str!("../templates/404.html")),
    ("accounts/login.html", include_str!("../templates/accounts/login.html")),
    ("accounts/register.html", include_str!("../templates/accounts/register.html")),
    ("admin/realizations.html", include_str!("../templates/admin/realizations.html")),
    ("admin/realization_form.html", include_str!("../templates/admin/realization_form.html")),
    ("admin/appointments.html", include_str!("../templates/admin/appointments.html")),
    ("admin/messages.html", include_str!("../templates/admin/messages.html")),
];

static ENGINE: OnceLock<Tera> = OnceLock::new();

fn engine() -> Result<&'static Tera, tera::Error> {
    if let Some(tera) = ENGINE.get() {
        return Ok(tera);
    }
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES)?;
    Ok(ENGINE.get_or_init(|| tera))
}

pub fn render(name: &str, context: &Context) -> Result<String, tera::Error> {
    engine()?.render(name, context)
}

/// Adds the values every page layout reads: the logged-in user and the
/// pending flash messages.
pub fn page_context(mut context: Context, user: Option<&User>, messages: &[Flash]) -> Context {
    context.insert("user", &user);
    context.insert("messages", messages);
    context
}

pub fn anonymous(context: Context) -> Context {
    page_context(context, None, &[])
}
