use serde::Deserialize;
use validator::Validate;

use super::{validate, FormErrors};

/// Simple contact form for collecting visitor messages.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactForm {
    #[validate(length(min = 1, max = 100, message = "Podaj imię (maksymalnie 100 znaków)."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Podaj nazwisko (maksymalnie 100 znaków)."))]
    pub last_name: String,
    #[validate(email(message = "Podaj poprawny adres email."))]
    pub email: String,
    #[validate(length(min = 1, message = "To pole jest wymagane."))]
    pub message: String,
}

impl ContactForm {
    /// Validates the form with surrounding whitespace removed and returns
    /// that trimmed copy.
    pub fn clean(&self) -> Result<ContactForm, FormErrors> {
        let form = ContactForm {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            message: self.message.trim().to_owned(),
        };
        validate(&form).into_result()?;
        Ok(form)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}
