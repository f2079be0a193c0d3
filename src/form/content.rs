use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use validator::Validate;

use super::{parse_datetime, validate, FormErrors};
use crate::db::{Realization, RealizationDraft};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[validate(length(min = 1, max = 1000, message = "Komentarz musi mieć od 1 do 1000 znaków."))]
    pub content: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<&str, FormErrors> {
        let content = self.content.trim();
        validate(&CommentForm {
            content: content.to_owned(),
        })
        .into_result()?;
        Ok(content)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct MessageForm {
    #[validate(length(min = 1, max = 2000, message = "Wiadomość musi mieć od 1 do 2000 znaków."))]
    pub content: String,
}

impl MessageForm {
    pub fn clean(&self) -> Result<&str, FormErrors> {
        let content = self.content.trim();
        validate(&MessageForm {
            content: content.to_owned(),
        })
        .into_result()?;
        Ok(content)
    }
}

/// Admin form for a portfolio entry. The image is a path under the media
/// directory.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RealizationForm {
    #[validate(length(min = 1, max = 100, message = "Tytuł musi mieć od 1 do 100 znaków."))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "Opis musi mieć od 1 do 1000 znaków."))]
    pub content: String,
    pub date: String,
    #[validate(length(max = 255, message = "Ścieżka obrazu może mieć najwyżej 255 znaków."))]
    pub image: String,
}

impl RealizationForm {
    pub fn clean<Tz: TimeZone>(&self, tz: &Tz, now: DateTime<Utc>) -> Result<RealizationDraft, FormErrors> {
        let form = RealizationForm {
            title: self.title.trim().to_owned(),
            content: self.content.trim().to_owned(),
            date: self.date.trim().to_owned(),
            image: self.image.trim().to_owned(),
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
            Some(date) if errors.is_empty() => Ok(RealizationDraft {
                title: form.title,
                content: form.content,
                date,
                image: Some(form.image).filter(|image| !image.is_empty()),
            }),
            _ => Err(errors),
        }
    }

    /// Pre-fills the form for editing, with the date in `tz` local time.
    pub fn from_realization<Tz: TimeZone>(realization: &Realization, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            title: realization.title.clone(),
            content: realization.content.clone(),
            date: realization
                .date
                .with_timezone(tz)
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
            image: realization.image.clone().unwrap_or_default(),
        }
    }
}
