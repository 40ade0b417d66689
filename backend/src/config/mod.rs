//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, session lifetime, cookie policy, CORS
//! allowlist and login throttling.

use anyhow::{Context, Result, bail};
use std::env;
use std::fmt;
use std::str::FromStr;

/// `SameSite` attribute applied to the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
        }
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            other => Err(format!("Invalid SameSite value: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub server_port: u16,
    pub session_expire_minutes: i64,
    /// Optional PKCS#8 Ed25519 key; an ephemeral key pair is generated when unset.
    pub jwt_private_key_file: Option<String>,
    pub cookie_secure: bool,
    pub cookie_samesite: SameSite,
    pub cors_origins: Vec<String>,
    pub rate_limit_enabled: bool,
    pub login_attempts_per_minute: u32,
    /// Read the client address from `X-Forwarded-For`; only safe behind a
    /// proxy that overwrites the header.
    pub trust_proxy_headers: bool,
    pub bcrypt_cost: u32,
    pub registration_enabled: bool,
    pub blacklist_cleanup_interval_minutes: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let session_expire_minutes = env::var("SESSION_EXPIRE_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<i64>()
            .context("SESSION_EXPIRE_MINUTES must be a valid number")?;
        if session_expire_minutes <= 0 {
            bail!("SESSION_EXPIRE_MINUTES must be positive");
        }

        let jwt_private_key_file = env::var("JWT_PRIVATE_KEY_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty());

        let cookie_secure = parse_bool("COOKIE_SECURE", false)?;

        // Secure deployments default to strict, plain HTTP to lax.
        let cookie_samesite = match env::var("COOKIE_SAMESITE") {
            Ok(value) => value
                .parse::<SameSite>()
                .map_err(anyhow::Error::msg)
                .context("COOKIE_SAMESITE must be 'strict' or 'lax'")?,
            Err(_) if cookie_secure => SameSite::Strict,
            Err(_) => SameSite::Lax,
        };

        let cors_origins = parse_cors_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string()),
        )?;

        let rate_limit_enabled = parse_bool("RATE_LIMIT_ENABLED", true)?;

        let login_attempts_per_minute = env::var("LOGIN_ATTEMPTS_PER_MINUTE")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("LOGIN_ATTEMPTS_PER_MINUTE must be a valid number")?;

        let trust_proxy_headers = parse_bool("TRUST_PROXY_HEADERS", false)?;

        let bcrypt_cost = env::var("BCRYPT_COST")
            .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
            .parse::<u32>()
            .context("BCRYPT_COST must be a valid number")?;

        let registration_enabled = parse_bool("REGISTRATION_ENABLED", true)?;

        let blacklist_cleanup_interval_minutes = env::var("BLACKLIST_CLEANUP_INTERVAL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .context("BLACKLIST_CLEANUP_INTERVAL_MINUTES must be a valid number")?;

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            server_port,
            session_expire_minutes,
            jwt_private_key_file,
            cookie_secure,
            cookie_samesite,
            cors_origins,
            rate_limit_enabled,
            login_attempts_per_minute,
            trust_proxy_headers,
            bcrypt_cost,
            registration_enabled,
            blacklist_cleanup_interval_minutes,
        })
    }

    /// Session lifetime in seconds, used for the cookie `Max-Age`.
    pub fn session_max_age_seconds(&self) -> i64 {
        self.session_expire_minutes * 60
    }
}

fn parse_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => bail!("{} must be a boolean, got '{}'", key, other),
        },
        Err(_) => Ok(default),
    }
}

/// Splits a comma separated origin list, rejecting anything that is not http(s).
pub fn parse_cors_origins(raw: &str) -> Result<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    for origin in &origins {
        if !origin.starts_with("http://") && !origin.starts_with("https://") {
            bail!("Invalid CORS origin: {}", origin);
        }
    }

    Ok(origins)
}

#[cfg(test)]
impl Config {
    /// Configuration for in-process tests: in-memory database, cheap hashing.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
            server_port: 0,
            session_expire_minutes: 30,
            jwt_private_key_file: None,
            cookie_secure: false,
            cookie_samesite: SameSite::Lax,
            cors_origins: vec!["http://localhost:5173".to_string()],
            rate_limit_enabled: false,
            login_attempts_per_minute: 10,
            trust_proxy_headers: false,
            bcrypt_cost: 4,
            registration_enabled: true,
            blacklist_cleanup_interval_minutes: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_origins_parsing() {
        let origins =
            parse_cors_origins("http://localhost:5173, https://stock.example.org").unwrap();
        assert_eq!(
            origins,
            vec!["http://localhost:5173", "https://stock.example.org"]
        );

        assert!(parse_cors_origins("localhost:5173").is_err());
        assert!(parse_cors_origins("").unwrap().is_empty());
    }

    #[test]
    fn test_samesite_from_str() {
        assert_eq!("strict".parse::<SameSite>(), Ok(SameSite::Strict));
        assert_eq!(" Lax ".parse::<SameSite>(), Ok(SameSite::Lax));
        assert!("none".parse::<SameSite>().is_err());
        assert_eq!(SameSite::Strict.to_string(), "Strict");
    }
}
