use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::{validate, FormErrors, REQUIRED};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "To pole jest wymagane."))]
    pub username: String,
    #[validate(length(min = 1, message = "To pole jest wymagane."))]
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        validate(self).into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegistrationForm {
    #[validate(
        length(min = 1, max = 150, message = "Nazwa użytkownika musi mieć od 1 do 150 znaków."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "Podaj poprawny adres email."))]
    pub email: String,
    #[validate(
        length(min = 8, message = "Hasło musi mieć co najmniej 8 znaków."),
        custom(function = "validate_password")
    )]
    pub password1: String,
    #[validate(must_match(other = "password1", message = "Hasła nie są identyczne."))]
    pub password2: String,
}

impl RegistrationForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = validate(self);
        if self.password2.is_empty() && !errors.has("password2") {
            errors.add("password2", REQUIRED);
        }
        errors.into_result()
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if username.chars().all(allowed) {
        Ok(())
    } else {
        Err(ValidationError::new("username")
            .with_message("Dozwolone są tylko litery, cyfry i znaki @/./+/-/_.".into()))
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        Err(ValidationError::new("numeric_password")
            .with_message("Hasło nie może składać się wyłącznie z cyfr.".into()))
    } else {
        Ok(())
    }
}
