use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::calendar::CalendarVisibility;

const MIN_SECRET_KEY_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{name}` has an invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("`SECRET_KEY` must be at least 64 bytes long")]
    SecretKeyTooShort,
    #[error("could not load .env: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

/// Which transport outgoing mail uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailBackend {
    Smtp,
    Console,
    Memory,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub backend: EmailBackend,
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub host_user: Option<String>,
    pub host_password: Option<String>,
    pub default_from: String,
    pub staff_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub address: SocketAddr,
    pub database_url: String,
    pub secret_key: Option<Vec<u8>>,
    pub email: EmailSettings,
    pub calendar_visibility: CalendarVisibility,
    pub page_size: u32,
    pub static_dir: PathBuf,
    pub media_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub log_file_max_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database_url: "sqlite://budowlanka.db".to_owned(),
            secret_key: None,
            email: EmailSettings {
                backend: EmailBackend::Console,
                host: "smtp.gmail.com".to_owned(),
                port: 587,
                use_tls: true,
                host_user: None,
                host_password: None,
                default_from: "webmaster@localhost".to_owned(),
                staff_email: None,
            },
            calendar_visibility: CalendarVisibility::Redacted,
            page_size: 10,
            static_dir: PathBuf::from("static"),
            media_dir: PathBuf::from("media"),
            log_file: None,
            log_file_max_bytes: 1024 * 1024,
        }
    }
}

impl Settings {
    /// Reads settings from the environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        env_file_loaded(dotenvy::dotenv())?;
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let secret_key = match var("SECRET_KEY") {
            Some(key) if key.len() < MIN_SECRET_KEY_LEN => return Err(ConfigError::SecretKeyTooShort),
            Some(key) => Some(key.into_bytes()),
            None => None,
        };

        let backend = match var("EMAIL_BACKEND").as_deref() {
            None => defaults.email.backend,
            Some("smtp") => EmailBackend::Smtp,
            Some("console") => EmailBackend::Console,
            Some("memory") => EmailBackend::Memory,
            Some(other) => {
                return Err(invalid("EMAIL_BACKEND", other, "expected smtp, console or memory"))
            }
        };

        let calendar_visibility = match parse_var(&var, "CALENDAR_SHOW_DETAILS", parse_bool)? {
            Some(true) => CalendarVisibility::Detailed,
            Some(false) => CalendarVisibility::Redacted,
            None => defaults.calendar_visibility,
        };

        let page_size = parse_var(&var, "PAGE_SIZE", |value| match value.parse::<u32>() {
            Ok(0) => Err("must be positive".to_owned()),
            Ok(size) => Ok(size),
            Err(err) => Err(err.to_string()),
        })?
        .unwrap_or(defaults.page_size);

        Ok(Self {
            address: parse_var(&var, "BUDOWLANKA_ADDR", parse_from_str)?
                .unwrap_or(defaults.address),
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            secret_key,
            email: EmailSettings {
                backend,
                host: var("EMAIL_HOST").unwrap_or(defaults.email.host),
                port: parse_var(&var, "EMAIL_PORT", parse_from_str)?
                    .unwrap_or(defaults.email.port),
                use_tls: parse_var(&var, "EMAIL_USE_TLS", parse_bool)?
                    .unwrap_or(defaults.email.use_tls),
                host_user: var("EMAIL_HOST_USER"),
                host_password: var("EMAIL_HOST_PASSWORD"),
                default_from: var("DEFAULT_FROM_EMAIL").unwrap_or(defaults.email.default_from),
                staff_email: var("STAFF_EMAIL"),
            },
            calendar_visibility,
            page_size,
            static_dir: var("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            media_dir: var("MEDIA_DIR").map_or(defaults.media_dir, PathBuf::from),
            log_file: var("LOG_FILE").map(PathBuf::from),
            log_file_max_bytes: parse_var(&var, "LOG_FILE_MAX_BYTES", parse_from_str)?
                .unwrap_or(defaults.log_file_max_bytes),
        })
    }
}

fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_owned(),
        reason: reason.into(),
    }
}

fn parse_var<T, V, P>(var: &V, name: &'static str, parse: P) -> Result<Option<T>, ConfigError>
where
    V: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, String>,
{
    var(name)
        .map(|value| parse(value.trim()).map_err(|reason| invalid(name, &value, reason)))
        .transpose()
}

fn parse_from_str<T>(value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err: T::Err| err.to_string())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected a boolean".to_owned()),
    }
}

/// A missing `.env` is fine, the real environment still applies. A file that
/// exists but cannot be read or parsed is an error.
fn env_file_loaded<T>(result: dotenvy::Result<T>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.address, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.email.backend, EmailBackend::Console);
        assert_eq!(settings.email.port, 587);
        assert_eq!(settings.calendar_visibility, CalendarVisibility::Redacted);
        assert!(settings.secret_key.is_none());
    }

    #[test]
    fn reads_overrides() {
        let settings = settings(&[
            ("BUDOWLANKA_ADDR", "0.0.0.0:9000"),
            ("EMAIL_BACKEND", "smtp"),
            ("EMAIL_HOST_USER", "biuro@example.com"),
            ("CALENDAR_SHOW_DETAILS", "yes"),
            ("PAGE_SIZE", "25"),
        ])
        .unwrap();

        assert_eq!(settings.address.port(), 9000);
        assert_eq!(settings.email.backend, EmailBackend::Smtp);
        assert_eq!(settings.email.host_user.as_deref(), Some("biuro@example.com"));
        assert_eq!(settings.calendar_visibility, CalendarVisibility::Detailed);
        assert_eq!(settings.page_size, 25);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let settings = settings(&[("EMAIL_HOST", "  "), ("PAGE_SIZE", "")]).unwrap();
        assert_eq!(settings.email.host, "smtp.gmail.com");
        assert_eq!(settings.page_size, 10);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            settings(&[("EMAIL_PORT", "many")]),
            Err(ConfigError::Invalid { name: "EMAIL_PORT", .. })
        ));
        assert!(matches!(
            settings(&[("PAGE_SIZE", "0")]),
            Err(ConfigError::Invalid { name: "PAGE_SIZE", .. })
        ));
        assert!(matches!(
            settings(&[("EMAIL_BACKEND", "pigeon")]),
            Err(ConfigError::Invalid { name: "EMAIL_BACKEND", .. })
        ));
    }

    #[test]
    fn short_secret_key_is_rejected() {
        assert!(matches!(
            settings(&[("SECRET_KEY", "django-insecure")]),
            Err(ConfigError::SecretKeyTooShort)
        ));
        let long = "k".repeat(64);
        assert_eq!(
            settings(&[("SECRET_KEY", &long)]).unwrap().secret_key.map(|k| k.len()),
            Some(64)
        );
    }

    #[test]
    fn missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(env_file_loaded(dotenvy::from_path(dir.path().join(".env"))).is_ok());
    }

    #[test]
    fn malformed_env_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "SECRET KEY=abc\n").unwrap();

        let err = env_file_loaded(dotenvy::from_path(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile(dotenvy::Error::LineParse(..))));
    }
}
