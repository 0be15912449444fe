use std::env;

use crate::constants::DEFAULT_PAGE_SIZE;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub host: String,
    pub port: u16,
    pub db_url: Option<String>,
    pub redis_url: Option<String>,
    pub media_root: String,
    pub media_url: String,
    pub page_size: i64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
            db_url: None,
            redis_url: None,
            media_root: String::from("media"),
            media_url: String::from("/media/"),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl EnvConfig {
    fn get_env(key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.trim().is_empty())
    }

    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self::from_lookup(Self::get_env)
    }

    /// Builds the config from any key lookup; unset or unparsable values
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let page_size = lookup("PAGE_SIZE")
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|size| *size >= 1)
            .unwrap_or(defaults.page_size);

        EnvConfig {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.port),
            db_url: lookup("DATABASE_URL"),
            redis_url: lookup("REDIS_URL"),
            media_root: lookup("MEDIA_ROOT").unwrap_or(defaults.media_root),
            media_url: lookup("MEDIA_URL").unwrap_or(defaults.media_url),
            page_size,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn missing_values_use_defaults() {
        let config = EnvConfig::from_lookup(|_| None);
        assert_eq!(config, EnvConfig::default());
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn values_are_read_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("PAGE_SIZE", "0"),
            ("MEDIA_URL", "https://cdn.example.com/"),
        ]);
        let config = EnvConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.port, 9000);
        assert_eq!(config.db_url.as_deref(), Some("postgres://localhost/foodgram"));
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.media_url, "https://cdn.example.com/");
    }
}
