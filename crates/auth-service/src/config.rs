use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8083";
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACCESS_TTL_SECONDS: u64 = 900;
pub const DEFAULT_REFRESH_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;
pub const DEFAULT_JWT_LEEWAY_SECONDS: u64 = 0;
pub const MAX_JWT_LEEWAY_SECONDS: u64 = 300;
pub const DEFAULT_BCRYPT_COST: u32 = 10;
pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 14;
pub const MIN_JWT_SECRET_BYTES: usize = 32;
pub const DEFAULT_MAIL_FROM: &str = "no-reply@localhost";
pub const DEFAULT_MAIL_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_MAIL_WORKERS: usize = 2;
pub const DEFAULT_PROFILE_SERVICE_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: SecretString,
    pub database_max_connections: u32,
    pub bind_address: String,
    pub jwt_access_secret: SecretString,
    pub jwt_refresh_secret: SecretString,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Clock skew tolerated on `exp` and `nbf`; applies to both codecs.
    pub jwt_leeway_seconds: u64,
    pub bcrypt_cost: u32,
    pub activation_url: String,
    pub password_reset_url: String,
    /// `None` logs outgoing mail instead of sending it.
    pub smtp_url: Option<SecretString>,
    pub mail_from: String,
    pub mail_queue_capacity: usize,
    pub mail_workers: usize,
    pub profile_service_url: String,
    pub profile_service_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),

    #[error("Invalid bcrypt cost: {0} (must be 10-14)")]
    InvalidBcryptCost(u32),
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parsed_or<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn jwt_secret(vars: &HashMap<String, String>, name: &str) -> Result<SecretString, ConfigError> {
    let secret = required(vars, name)?;
    if secret.len() < MIN_JWT_SECRET_BYTES {
        return Err(ConfigError::InvalidJwtSecret(format!(
            "{} must be at least {} bytes, got {}",
            name,
            MIN_JWT_SECRET_BYTES,
            secret.len()
        )));
    }
    Ok(SecretString::from(secret))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = SecretString::from(required(vars, "DATABASE_URL")?);
        let database_max_connections = parsed_or(
            vars,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwt_access_secret = jwt_secret(vars, "JWT_ACCESS_SECRET")?;
        let jwt_refresh_secret = jwt_secret(vars, "JWT_REFRESH_SECRET")?;
        if jwt_access_secret.expose_secret() == jwt_refresh_secret.expose_secret() {
            return Err(ConfigError::InvalidJwtSecret(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
            ));
        }

        let access_ttl_seconds: u64 =
            parsed_or(vars, "JWT_ACCESS_TTL_SECONDS", DEFAULT_ACCESS_TTL_SECONDS)?;
        let refresh_ttl_seconds: u64 =
            parsed_or(vars, "JWT_REFRESH_TTL_SECONDS", DEFAULT_REFRESH_TTL_SECONDS)?;
        if access_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_TTL_SECONDS".to_string(),
                "must be positive".to_string(),
            ));
        }
        if refresh_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "JWT_REFRESH_TTL_SECONDS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let jwt_leeway_seconds: u64 =
            parsed_or(vars, "JWT_LEEWAY_SECONDS", DEFAULT_JWT_LEEWAY_SECONDS)?;
        if jwt_leeway_seconds > MAX_JWT_LEEWAY_SECONDS {
            return Err(ConfigError::InvalidValue(
                "JWT_LEEWAY_SECONDS".to_string(),
                format!("must be at most {}", MAX_JWT_LEEWAY_SECONDS),
            ));
        }

        let bcrypt_cost = parsed_or(vars, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(bcrypt_cost));
        }

        let activation_url = required(vars, "ACTIVATION_URL")?;
        let password_reset_url = required(vars, "PASSWORD_RESET_URL")?;

        let smtp_url = vars
            .get("SMTP_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|v| SecretString::from(v.clone()));
        let mail_from = vars
            .get("MAIL_FROM")
            .cloned()
            .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());
        let mail_queue_capacity =
            parsed_or(vars, "MAIL_QUEUE_CAPACITY", DEFAULT_MAIL_QUEUE_CAPACITY)?;
        let mail_workers = parsed_or(vars, "MAIL_WORKERS", DEFAULT_MAIL_WORKERS)?;

        let profile_service_url = required(vars, "PROFILE_SERVICE_URL")?;
        let profile_service_timeout_seconds = parsed_or(
            vars,
            "PROFILE_SERVICE_TIMEOUT_SECONDS",
            DEFAULT_PROFILE_SERVICE_TIMEOUT_SECONDS,
        )?;

        Ok(Config {
            database_url,
            database_max_connections,
            bind_address,
            jwt_access_secret,
            jwt_refresh_secret,
            access_ttl: Duration::from_secs(access_ttl_seconds),
            refresh_ttl: Duration::from_secs(refresh_ttl_seconds),
            jwt_leeway_seconds,
            bcrypt_cost,
            activation_url,
            password_reset_url,
            smtp_url,
            mail_from,
            mail_queue_capacity,
            mail_workers,
            profile_service_url,
            profile_service_timeout: Duration::from_secs(profile_service_timeout_seconds),
        })
    }
}
