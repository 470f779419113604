use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use tracing::info;

pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub public_url: String,
    pub client_secret_path: String,
    pub session_inactivity_minutes: i64,
    pub secure_cookies: bool,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: try_load(&lookup, "DATABASE_URL", "sqlite://letmeask.db?mode=rwc")?,
            bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:8080")?,
            public_url: try_load::<String>(&lookup, "PUBLIC_URL", "http://localhost:8080")?
                .trim_end_matches('/')
                .to_owned(),
            client_secret_path: try_load(&lookup, "CLIENT_SECRET_PATH", "client_secret.json")?,
            session_inactivity_minutes: try_load(&lookup, "SESSION_INACTIVITY_MINUTES", "60")?,
            secure_cookies: try_load(&lookup, "SECURE_COOKIES", "false")?,
        })
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_owned()
        })
        .parse()
        .map_err(|e| anyhow!("invalid {key} value: {e}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.public_url, "http://localhost:8080");
        assert_eq!(config.session_inactivity_minutes, 60);
        assert!(!config.secure_cookies);
    }

    #[test]
    fn public_url_loses_trailing_slash() {
        let config = config(&[("PUBLIC_URL", "https://ask.example.com/")]).unwrap();
        assert_eq!(config.public_url, "https://ask.example.com");
    }

    #[test]
    fn bad_numbers_are_errors() {
        let err = config(&[("SESSION_INACTIVITY_MINUTES", "soon")]).err().unwrap();
        assert!(err.to_string().contains("SESSION_INACTIVITY_MINUTES"));
    }
}
