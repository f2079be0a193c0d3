use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use validator::Validate;

use super::{parse_datetime, validate, FormErrors};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AppointmentForm {
    #[validate(length(min = 1, max = 500, message = "Opis musi mieć od 1 do 500 znaków."))]
    pub description: String,
    /// Local date and time of the visit; empty means "now".
    pub date: String,
}

/// A validated appointment ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRequest {
    pub description: String,
    pub date: DateTime<Utc>,
}

impl AppointmentForm {
    pub fn clean<Tz: TimeZone>(&self, tz: &Tz, now: DateTime<Utc>) -> Result<AppointmentRequest, FormErrors> {
        let form = AppointmentForm {
            description: self.description.trim().to_owned(),
            date: self.date.trim().to_owned(),
        };
        let mut errors = validate(&form);

        let date = if form.date.is_empty() {
            Some(now)
        } else {
            parse_datetime(&form.date, tz)
        };
        if date.is_none() {
            errors.add("date", "Podaj poprawną datę i godzinę.");
        }

        match date {
            Some(date) if errors.is_empty() => Ok(AppointmentRequest {
                description: form.description,
                date,
            }),
            _ => Err(errors),
        }
    }
}
