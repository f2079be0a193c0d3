pub mod account;
pub mod appointment;
pub mod contact;
pub mod content;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use validator::{Validate, ValidationErrors};

pub use account::{LoginForm, RegistrationForm};
pub use appointment::{AppointmentForm, AppointmentRequest};
pub use contact::ContactForm;
pub use content::{CommentForm, MessageForm, RealizationForm};

pub(crate) const REQUIRED: &str = "To pole jest wymagane.";

/// Validation messages per field, rendered next to the inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = Self::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

/// Runs the derived validators of `form`.
pub fn validate<T: Validate>(form: &T) -> FormErrors {
    form.validate().err().map(FormErrors::from).unwrap_or_default()
}

/// Parses a submitted timestamp.
///
/// RFC 3339 values carry their own offset; naive values (as sent by
/// `datetime-local` inputs) are read as local time in `tz`.
pub fn parse_datetime<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.with_timezone(&Utc));
    }

    NAIVE_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(value, format).ok()?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use rstest::rstest;

    #[rstest]
    #[case("2024-05-21T10:00:00Z", "2024-05-21T10:00:00+00:00")]
    #[case("2024-05-21T12:00:00+02:00", "2024-05-21T10:00:00+00:00")]
    #[case("2024-05-21T12:00", "2024-05-21T10:00:00+00:00")]
    #[case("2024-05-21 12:00:30", "2024-05-21T10:00:30+00:00")]
    fn parses_submitted_dates(#[case] input: &str, #[case] expected: &str) {
        let warsaw_summer = FixedOffset::east_opt(2 * 3600).unwrap();
        let parsed = parse_datetime(input, &warsaw_summer).unwrap();
        assert_eq!(parsed.to_rfc3339(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("jutro")]
    #[case("2024-13-01T10:00")]
    fn rejects_garbage(#[case] input: &str) {
        assert!(parse_datetime(input, &Utc).is_none());
    }

    #[test]
    fn collects_messages_per_field() {
        let mut errors = FormErrors::default();
        assert!(errors.clone().into_result().is_ok());

        errors.add("email", "zły adres");
        errors.add("email", "za długi");
        assert_eq!(errors.get("email"), ["zły adres", "za długi"]);
        assert!(errors.get("message").is_empty());
        assert!(errors.into_result().is_err());
    }
}
