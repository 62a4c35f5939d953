use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Secret keys that ship as defaults and MUST NOT be used in production.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-key", "change-me-to-a-random-string"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub secret_key: String,
    pub db_path: PathBuf,
    pub max_upload_bytes: usize,
    pub upload_dir: PathBuf,
    /// `*` means "mirror whatever origin asks".
    pub cors_origins: Vec<String>,
    pub session_lifetime: chrono::Duration,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Every setting has a
    /// development default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment = match get("BRAINBUDDY_ENV", "development").as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };

        let secret_key = get("BRAINBUDDY_SECRET_KEY", "dev-secret-key");
        if environment == Environment::Production
            && (secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()))
        {
            bail!("BRAINBUDDY_SECRET_KEY is unset or still a placeholder; refusing to start in production");
        }

        let db_path = parse_database_url(&get("DATABASE_URL", "sqlite://brainbuddy.db"));

        let max_mb: f64 = get("MAX_CONTENT_LENGTH_MB", "25")
            .parse()
            .context("MAX_CONTENT_LENGTH_MB must be a number")?;
        if max_mb.is_nan() || max_mb <= 0.0 {
            bail!("MAX_CONTENT_LENGTH_MB must be positive, got {}", max_mb);
        }
        let max_upload_bytes = (max_mb * 1024.0 * 1024.0) as usize;

        let cors_origins = get("CORS_ORIGINS", "*")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        let lifetime_days: i64 = get("SESSION_LIFETIME_DAYS", "7")
            .parse()
            .context("SESSION_LIFETIME_DAYS must be an integer")?;
        if lifetime_days <= 0 {
            bail!("SESSION_LIFETIME_DAYS must be positive, got {}", lifetime_days);
        }
        let session_lifetime = chrono::Duration::try_days(lifetime_days)
            .context("SESSION_LIFETIME_DAYS is out of range")?;

        let port: u16 = get("BRAINBUDDY_PORT", "5000")
            .parse()
            .context("BRAINBUDDY_PORT must be a port number")?;

        Ok(Self {
            environment,
            secret_key,
            db_path,
            max_upload_bytes,
            upload_dir: get("UPLOAD_FOLDER", "uploads").into(),
            cors_origins,
            session_lifetime,
            host: get("BRAINBUDDY_HOST", "0.0.0.0"),
            port,
        })
    }

    pub fn secure_cookies(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Accepts `sqlite:///relative.db`, `sqlite:////abs/path.db`,
/// `sqlite://relative.db` or a bare path.
fn parse_database_url(url: &str) -> PathBuf {
    let path = url
        .strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .unwrap_or(url);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_permissive_for_development() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.secret_key, "dev-secret-key");
        assert_eq!(cfg.db_path, PathBuf::from("brainbuddy.db"));
        assert_eq!(cfg.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
        assert_eq!(cfg.cors_origins, vec!["*".to_string()]);
        assert_eq!(cfg.session_lifetime, chrono::Duration::days(7));
        assert!(!cfg.secure_cookies());
    }

    #[test]
    fn production_refuses_placeholder_secret() {
        assert!(config_from(&[("BRAINBUDDY_ENV", "production")]).is_err());

        let cfg = config_from(&[
            ("BRAINBUDDY_ENV", "production"),
            ("BRAINBUDDY_SECRET_KEY", "9f1c0e7d-real-secret"),
        ])
        .unwrap();
        assert!(cfg.secure_cookies());
    }

    #[test]
    fn parses_overrides() {
        let cfg = config_from(&[
            ("MAX_CONTENT_LENGTH_MB", "0.5"),
            ("CORS_ORIGINS", "http://localhost:3000, https://app.example.com ,"),
            ("DATABASE_URL", "sqlite:////var/lib/brainbuddy/app.db"),
        ])
        .unwrap();
        assert_eq!(cfg.max_upload_bytes, 512 * 1024);
        assert_eq!(
            cfg.cors_origins,
            vec!["http://localhost:3000", "https://app.example.com"]
        );
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/brainbuddy/app.db"));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(config_from(&[("MAX_CONTENT_LENGTH_MB", "lots")]).is_err());
        assert!(config_from(&[("MAX_CONTENT_LENGTH_MB", "-1")]).is_err());
        assert!(config_from(&[("BRAINBUDDY_PORT", "99999")]).is_err());
    }

    #[test]
    fn session_lifetime_must_be_a_sane_number_of_days() {
        assert!(config_from(&[("SESSION_LIFETIME_DAYS", "0")]).is_err());
        assert!(config_from(&[("SESSION_LIFETIME_DAYS", "-3")]).is_err());
        assert!(config_from(&[("SESSION_LIFETIME_DAYS", "999999999999")]).is_err());

        let cfg = config_from(&[("SESSION_LIFETIME_DAYS", "30")]).unwrap();
        assert_eq!(cfg.session_lifetime, chrono::Duration::days(30));
    }

    #[test]
    fn database_url_forms() {
        assert_eq!(parse_database_url("sqlite:///brainbuddy.db"), PathBuf::from("brainbuddy.db"));
        assert_eq!(parse_database_url("sqlite://data.db"), PathBuf::from("data.db"));
        assert_eq!(parse_database_url("plain.db"), PathBuf::from("plain.db"));
    }
}
