use std::env;

use log::warn;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Environment-driven configuration, read once at startup and injected
/// through `AppState`. Defaults are meant for development only.
#[derive(Clone)]
pub struct Settings {
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub database_url: String,
    pub base_url: String,
    pub mailgun_api_key: String,
    pub mailgun_domain: String,
}

// 60 minutes * 24 hours * 8 days
const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 8;

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let secret_key = match env::var("SECRET_KEY") {
            Ok(value) if !value.is_empty() => value,
            _ => {
                warn!("SECRET_KEY not set; using a random per-process secret");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(32)
                    .map(char::from)
                    .collect()
            }
        };

        let access_token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_EXPIRE_MINUTES);

        Settings {
            secret_key,
            access_token_expire_minutes,
            database_url: env_or("DATABASE_URL", "sqlite:lab-inventory.db?mode=rwc"),
            base_url: env_or("BASE_URL", "http://localhost:8000"),
            mailgun_api_key: env_or("MAILGUN_API_KEY", "mailgun_api_key"),
            mailgun_domain: env_or("MAILGUN_DOMAIN", "labcomunica.com"),
        }
    }

    /// Fixed secret and in-memory database, for tests.
    pub fn for_tests() -> Self {
        Settings {
            secret_key: "segredo-de-teste".to_string(),
            access_token_expire_minutes: DEFAULT_TOKEN_EXPIRE_MINUTES,
            database_url: "sqlite::memory:".to_string(),
            base_url: "http://localhost:8000".to_string(),
            mailgun_api_key: "mailgun_api_key".to_string(),
            mailgun_domain: "labcomunica.com".to_string(),
        }
    }
}
