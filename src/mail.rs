//! Outgoing mail: the appointment confirmation and contact form messages,
//! and the transports that deliver them.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use thiserror::Error;

use crate::config::{EmailBackend, EmailSettings};
use crate::form::ContactForm;

pub const CONFIRMATION_SUBJECT: &str = "Potwierdzenie wizyty";
pub const STAFF_NOTICE_SUBJECT: &str = "Nowa wizyta";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A plain-text message, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Delivers through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &EmailSettings) -> Result<Self, MailError> {
        let builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };
        let mut builder = builder.port(settings.port);

        if let (Some(user), Some(password)) = (&settings.host_user, &settings.host_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let mut builder = lettre::Message::builder()
            .from(email.from.parse::<Mailbox>()?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &email.to {
            builder = builder.to(to.parse::<Mailbox>()?);
        }
        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(reply_to.parse::<Mailbox>()?);
        }

        self.transport.send(builder.body(email.body)?).await?;
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        log::info!(
            "Mail from {} to {}: {}\n{}",
            email.from,
            email.to.join(", "),
            email.subject,
            email.body
        );
        Ok(())
    }
}

/// Keeps every message in an outbox. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn outbox(&self) -> Vec<Email> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email);
        Ok(())
    }
}

/// Builds the transport selected by `EMAIL_BACKEND`.
pub fn from_settings(settings: &EmailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    Ok(match settings.backend {
        EmailBackend::Smtp => Arc::new(SmtpMailer::new(settings)?),
        EmailBackend::Console => Arc::new(ConsoleMailer),
        EmailBackend::Memory => Arc::new(MemoryMailer::default()),
    })
}

/// The confirmation for the user, plus a notice for staff when a staff
/// address is configured.
pub fn appointment_emails<Tz>(
    settings: &EmailSettings,
    recipient: &str,
    description: &str,
    date: DateTime<Utc>,
    tz: &Tz,
) -> Vec<Email>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let when = date.with_timezone(tz).format("%Y-%m-%d %H:%M");
    let mut emails = vec![Email {
        from: settings.default_from.clone(),
        to: vec![recipient.to_owned()],
        reply_to: None,
        subject: CONFIRMATION_SUBJECT.to_owned(),
        body: format!("Twoja wizyta została umówiona na {when}. Opis: {description}"),
    }];

    if let Some(staff) = &settings.staff_email {
        emails.push(Email {
            from: settings.default_from.clone(),
            to: vec![staff.clone()],
            reply_to: Some(recipient.to_owned()),
            subject: STAFF_NOTICE_SUBJECT.to_owned(),
            body: format!("Nowa wizyta na {when} ({recipient}). Opis: {description}"),
        });
    }
    emails
}

pub fn contact_email(settings: &EmailSettings, form: &ContactForm) -> Email {
    let to = settings
        .staff_email
        .clone()
        .unwrap_or_else(|| settings.default_from.clone());

    Email {
        from: settings.default_from.clone(),
        to: vec![to],
        reply_to: Some(form.email.trim().to_owned()),
        subject: format!("Wiadomość kontaktowa od {}", form.full_name()),
        body: format!("{}\n\n{} <{}>", form.message, form.full_name(), form.email.trim()),
    }
}
