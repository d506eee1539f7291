use std::env;

use actix_web::cookie::Key;
use log::warn;

use crate::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

/// Minimum amount of key material `Key::derive_from` accepts.
const MIN_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub secret_key: Option<String>,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(5000);

        let sqlite_path = env::var("SQLITE_PATH").unwrap_or_else(|_| "warbler.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        let secret_key = env::var("SECRET_KEY").ok().filter(|v| !v.is_empty());

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|cost| (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(cost))
            .unwrap_or(bcrypt::DEFAULT_COST);

        Self {
            server_port,
            sqlite_path,
            database_url,
            secret_key,
            cookie_secure,
            bcrypt_cost,
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}", path)
    }

    /// Key used to sign and encrypt the session cookie.
    pub fn session_key(&self) -> Key {
        match self.secret_key.as_deref() {
            Some(secret) if secret.len() >= MIN_SECRET_LEN => Key::derive_from(secret.as_bytes()),
            Some(_) => {
                warn!("SECRET_KEY shorter than {} bytes, using a random session key", MIN_SECRET_LEN);
                Key::generate()
            }
            None => {
                warn!("SECRET_KEY not set, sessions will not survive a restart");
                Key::generate()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(sqlite_path: &str, database_url: Option<&str>) -> AppConfig {
        AppConfig {
            server_port: 5000,
            sqlite_path: sqlite_path.to_string(),
            database_url: database_url.map(str::to_string),
            secret_key: None,
            cookie_secure: false,
            bcrypt_cost: MIN_BCRYPT_COST,
        }
    }

    #[test]
    fn database_url_prefers_explicit_url() {
        let config = config_with("ignored.sqlite", Some("sqlite::memory:"));
        assert_eq!(config.database_url(), "sqlite::memory:");
    }

    #[test]
    fn database_url_wraps_plain_sqlite_path() {
        assert_eq!(config_with("data/warbler.sqlite", None).database_url(), "sqlite://data/warbler.sqlite");
        assert_eq!(config_with("sqlite:x.db", None).database_url(), "sqlite:x.db");
    }

    #[test]
    fn short_secret_falls_back_to_random_key() {
        let mut config = config_with("warbler.sqlite", None);
        config.secret_key = Some("too-short".to_string());
        let first = config.session_key();
        let second = config.session_key();
        assert_ne!(first.master(), second.master());

        config.secret_key = Some("a".repeat(MIN_SECRET_LEN));
        assert_eq!(config.session_key().master(), config.session_key().master());
    }
}
